//! Writes the compliance report CSV straight from the database.
//!
//! Usage: `export_report [OUTPUT_PATH]` (defaults to `compliance_report.csv`).

use dotenvy::dotenv;
use invoice_intake::csv_export::{to_csv, REPORT_FILE_NAME};
use invoice_intake::db::Database;
use invoice_intake::db_storage::{InvoiceRepository, PgInvoiceRepository};
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "invoice_intake=info".into()),
        )
        .init();

    let database_url = env::var("DATABASE_URL")
        .or_else(|_| env::var("DB_URL"))
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
    let output = env::args()
        .nth(1)
        .unwrap_or_else(|| REPORT_FILE_NAME.to_string());

    let db = Database::open(&database_url).await?;
    let records = PgInvoiceRepository::new(db.pool.clone()).list().await?;
    db.close().await;

    if records.is_empty() {
        println!("No data to export!");
        return Ok(());
    }

    tokio::fs::write(&output, to_csv(&records)).await?;
    println!("Wrote {} invoices to {}", records.len(), output);

    Ok(())
}
