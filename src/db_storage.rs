use crate::errors::{AppError, ResultExt};
use crate::models::{InvoiceRecord, NewInvoice};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

/// Persistence boundary for invoices.
///
/// Records are only ever created and listed; nothing updates or deletes them.
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Inserts a new invoice and returns it with its assigned id.
    async fn create(&self, invoice: NewInvoice) -> Result<InvoiceRecord, AppError>;

    /// All invoices, newest (highest id) first.
    async fn list(&self) -> Result<Vec<InvoiceRecord>, AppError>;
}

/// PostgreSQL-backed invoice storage.
#[derive(Clone)]
pub struct PgInvoiceRepository {
    pool: PgPool,
}

impl PgInvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvoiceRepository for PgInvoiceRepository {
    async fn create(&self, invoice: NewInvoice) -> Result<InvoiceRecord, AppError> {
        let fields = &invoice.fields;

        let record = sqlx::query_as::<_, InvoiceRecord>(
            r#"
            INSERT INTO invoices (
                vendor_name, invoice_number, amount, date, gstin, tax_rate,
                status, risk_score, file_url
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, vendor_name, invoice_number, amount, date, gstin, tax_rate,
                      status, risk_score, file_url, created_at
            "#,
        )
        .bind(&fields.vendor_name)
        .bind(&fields.invoice_number)
        .bind(&fields.amount)
        .bind(fields.date)
        .bind(fields.gstin.as_deref())
        .bind(fields.tax_rate)
        .bind(invoice.status.as_str())
        .bind(invoice.risk_score.as_str())
        .bind(invoice.file_url.as_deref())
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert invoice")?;

        tracing::info!(
            "✓ Stored invoice {} (id={}, status={})",
            record.invoice_number,
            record.id,
            record.status
        );
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<InvoiceRecord>, AppError> {
        let records = sqlx::query_as::<_, InvoiceRecord>(
            r#"
            SELECT id, vendor_name, invoice_number, amount, date, gstin, tax_rate,
                   status, risk_score, file_url, created_at
            FROM invoices
            ORDER BY id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list invoices")?;

        tracing::debug!("Loaded {} invoices", records.len());
        Ok(records)
    }
}

/// In-memory invoice storage for tests and local development.
///
/// Ids come from an atomic counter starting at 1.
#[derive(Default)]
pub struct InMemoryInvoiceRepository {
    next_id: AtomicI64,
    records: RwLock<Vec<InvoiceRecord>>,
}

impl InMemoryInvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored invoices.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
    async fn create(&self, invoice: NewInvoice) -> Result<InvoiceRecord, AppError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let NewInvoice {
            fields,
            status,
            risk_score,
            file_url,
        } = invoice;

        let record = InvoiceRecord {
            id,
            vendor_name: fields.vendor_name,
            invoice_number: fields.invoice_number,
            amount: fields.amount,
            date: fields.date,
            gstin: fields.gstin,
            tax_rate: fields.tax_rate,
            status,
            risk_score,
            file_url,
            created_at: Utc::now(),
        };

        self.records
            .write()
            .map_err(|e| AppError::Internal(format!("Failed to acquire write lock: {}", e)))?
            .push(record.clone());

        Ok(record)
    }

    async fn list(&self) -> Result<Vec<InvoiceRecord>, AppError> {
        let mut records = self
            .records
            .read()
            .map_err(|e| AppError::Internal(format!("Failed to acquire read lock: {}", e)))?
            .clone();
        records.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(records)
    }
}
