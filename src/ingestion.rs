//! Invoice ingestion pipeline.
//!
//! Stages run strictly in order and any failure stops the request:
//! 1. fetch the image from its public URL
//! 2. extract fields with the vision model
//! 3. validate the payload and run the compliance rules
//! 4. persist the record
//!
//! Only stage 4 writes anything durable, so a failed request never leaves a
//! partial invoice behind. An image already uploaded to storage stays there.

use crate::compliance;
use crate::db_storage::InvoiceRepository;
use crate::errors::AppError;
use crate::extraction_client::Extractor;
use crate::models::{ExtractedFields, InvoiceRecord, NewInvoice};
use crate::services::ImageFetcher;
use serde_json::{json, Value};
use std::sync::Arc;

/// Prompt sent with every invoice image.
pub const EXTRACTION_INSTRUCTIONS: &str = "You are an expert financial compliance agent. \
Carefully analyze this invoice image and extract: vendorName (the company or person issuing \
the invoice), invoiceNumber (the unique invoice identifier), amount (the total final amount as \
a number), date (the invoice date in YYYY-MM-DD format), gstin (the GST identification number) \
and taxRate (the tax percentage as a number, e.g. 18 for 18%). If a field like GSTIN or Tax Rate \
is completely missing from the document, leave it out instead of guessing.";

/// Structured-output schema declaring the required and optional invoice fields.
pub fn invoice_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "vendorName": {
                "type": "STRING",
                "description": "The name of the company or person issuing the invoice"
            },
            "invoiceNumber": {
                "type": "STRING",
                "description": "The unique invoice identifier"
            },
            "amount": {
                "type": "NUMBER",
                "description": "The total final amount of the invoice"
            },
            "date": {
                "type": "STRING",
                "description": "The date of the invoice in YYYY-MM-DD format"
            },
            "gstin": {
                "type": "STRING",
                "description": "The GST identification number if present"
            },
            "taxRate": {
                "type": "NUMBER",
                "description": "The percentage of tax applied, e.g., 18 for 18%"
            }
        },
        "required": ["vendorName", "invoiceNumber", "amount", "date"]
    })
}

/// Runs fetch → extract → evaluate → persist for one invoice URL.
#[derive(Clone)]
pub struct IngestionPipeline {
    fetcher: Arc<dyn ImageFetcher>,
    extractor: Arc<dyn Extractor>,
    repository: Arc<dyn InvoiceRepository>,
}

impl IngestionPipeline {
    pub fn new(
        fetcher: Arc<dyn ImageFetcher>,
        extractor: Arc<dyn Extractor>,
        repository: Arc<dyn InvoiceRepository>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            repository,
        }
    }

    /// Ingests the invoice image at `file_url` and returns the stored record.
    ///
    /// # Errors
    ///
    /// * `AppError::Fetch` - the image could not be retrieved.
    /// * `AppError::Extraction` - the model call failed or its payload broke the field contract.
    /// * `AppError::Persistence` - the repository write failed. The production
    ///   repository wraps it in context, so match on [`AppError::root`].
    pub async fn ingest(&self, file_url: &str) -> Result<InvoiceRecord, AppError> {
        tracing::info!("📥 Ingesting invoice from {}", file_url);

        let image = self.fetcher.fetch(file_url).await?;

        let payload = self
            .extractor
            .extract(&image, EXTRACTION_INSTRUCTIONS, &invoice_schema())
            .await?;
        let fields = validate_extraction(&payload)?;
        tracing::info!(
            "✓ Extraction complete: vendor='{}', invoice='{}'",
            fields.vendor_name,
            fields.invoice_number
        );

        let new_invoice = assess(fields, Some(file_url.to_string()));
        tracing::info!(
            "🔍 Compliance: {} ({} risk)",
            new_invoice.status,
            new_invoice.risk_score
        );

        self.repository.create(new_invoice).await
    }
}

/// Rejects model output that does not satisfy the invoice field contract.
pub fn validate_extraction(payload: &Value) -> Result<ExtractedFields, AppError> {
    ExtractedFields::from_payload(payload).map_err(|e| {
        tracing::warn!("Extraction payload rejected: {} ({})", e, payload);
        AppError::Extraction(format!("Model output rejected: {}", e))
    })
}

/// Attaches the compliance verdict to validated fields.
pub fn assess(fields: ExtractedFields, file_url: Option<String>) -> NewInvoice {
    let (status, risk_score) = compliance::evaluate(&fields);
    NewInvoice {
        fields,
        status,
        risk_score,
        file_url,
    }
}
