//! External service integrations.

pub mod extraction_client {
    pub use crate::extraction_client::*;
}

pub mod storage_client {
    pub use crate::storage_client::*;
}

pub mod services {
    pub use crate::services::*;
}

pub mod db_storage {
    pub use crate::db_storage::*;
}
