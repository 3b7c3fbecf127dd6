use sqlx::{postgres::PgPoolOptions, PgPool};

/// Owns the process-wide connection pool.
///
/// Opened once by the entry point and handed to whoever needs it; there is
/// no global handle.
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn open(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Waits for checked-out connections to return, then closes the pool.
    pub async fn close(self) {
        self.pool.close().await;
    }
}
