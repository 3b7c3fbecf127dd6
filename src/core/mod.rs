// Domain-layer modules and shared errors/models
pub mod compliance {
    pub use crate::compliance::*;
}

pub mod ingestion {
    pub use crate::ingestion::*;
}

pub mod dashboard {
    pub use crate::dashboard::*;
}

pub mod csv_export {
    pub use crate::csv_export::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
