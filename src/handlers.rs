use crate::config::Config;
use crate::csv_export::{self, REPORT_FILE_NAME};
use crate::dashboard::{self, Metrics};
use crate::db_storage::InvoiceRepository;
use crate::errors::AppError;
use crate::ingestion::{self, IngestionPipeline};
use crate::models::*;
use crate::storage_client::ObjectStorage;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

/// Largest accepted request body; invoice scans can be several megabytes.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Invoice persistence.
    pub repository: Arc<dyn InvoiceRepository>,
    /// Object store for uploaded images.
    pub storage: Arc<dyn ObjectStorage>,
    /// Fetch → extract → evaluate → persist pipeline.
    pub pipeline: IngestionPipeline,
}

/// Routes that read or write invoices. Callers add rate limiting on top.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/upload", post(upload_invoice))
        .route("/process", post(process_invoice))
        .route("/save", post(save_invoice))
        .route("/invoices", get(list_invoices))
        .route("/dashboard", get(dashboard_page))
        .route("/export", get(export_csv))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
}

/// Complete application without rate limiting or tracing layers.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(api_routes())
        .with_state(state)
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "invoice-intake",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /upload
///
/// Stores the multipart `file` field in object storage and returns its public URL.
pub async fn upload_invoice(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read uploaded file: {}", e)))?;

        if bytes.is_empty() {
            break;
        }

        tracing::info!(
            "POST /upload - {} ({}, {} bytes)",
            file_name.as_deref().unwrap_or("<unnamed>"),
            content_type,
            bytes.len()
        );

        let url = state
            .storage
            .upload(bytes.to_vec(), &content_type, file_name.as_deref())
            .await?;

        return Ok(Json(UploadResponse { success: true, url }));
    }

    Err(AppError::Validation("No file uploaded".to_string()))
}

/// POST /process
///
/// Runs the full ingestion pipeline for an uploaded image URL.
pub async fn process_invoice(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProcessRequest>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let file_url = request
        .file_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::Validation("No file URL provided".to_string()))?;

    match url::Url::parse(file_url) {
        Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => {}
        _ => {
            return Err(AppError::Validation(format!(
                "fileUrl must be an absolute http(s) URL: {}",
                file_url
            )))
        }
    }

    tracing::info!("POST /process - {}", file_url);
    let record = state.pipeline.ingest(file_url).await?;

    Ok(Json(InvoiceResponse {
        success: true,
        data: record,
    }))
}

/// POST /save
///
/// Persists explicitly supplied invoice fields. Status and risk are always
/// recomputed; any values sent by the client are ignored.
pub async fn save_invoice(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let fields = ExtractedFields::from_payload(&payload)
        .map_err(|e| AppError::Validation(format!("Invalid invoice: {}", e)))?;

    let file_url = payload
        .get("fileUrl")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string);

    tracing::info!("POST /save - invoice {}", fields.invoice_number);
    let record = state
        .repository
        .create(ingestion::assess(fields, file_url))
        .await?;

    Ok(Json(InvoiceResponse {
        success: true,
        data: record,
    }))
}

#[derive(Debug, Serialize)]
pub struct InvoiceListResponse {
    pub data: Vec<InvoiceRecord>,
    pub metrics: Metrics,
}

/// GET /invoices
pub async fn list_invoices(
    State(state): State<Arc<AppState>>,
) -> Result<Json<InvoiceListResponse>, AppError> {
    let data = state.repository.list().await?;
    let metrics = dashboard::summarize(&data);
    Ok(Json(InvoiceListResponse { data, metrics }))
}

/// GET /dashboard
pub async fn dashboard_page(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    let records = state.repository.list().await?;
    let metrics = dashboard::summarize(&records);
    Ok(Html(dashboard::render_dashboard(&records, &metrics)))
}

/// GET /export
///
/// Downloads every invoice as `compliance_report.csv`, newest first.
pub async fn export_csv(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let records = state.repository.list().await?;
    if records.is_empty() {
        return Err(AppError::Validation("No data to export!".to_string()));
    }

    tracing::info!("GET /export - {} invoices", records.len());
    let csv = csv_export::to_csv(&records);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", REPORT_FILE_NAME),
            ),
        ],
        csv,
    ))
}
