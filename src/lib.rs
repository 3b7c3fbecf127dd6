//! Invoice Intake Library
//!
//! Core functionality for the invoice intake service: image upload, field
//! extraction through a hosted vision model, compliance classification,
//! persistence, dashboard metrics and CSV export.
//!
//! # Modules
//!
//! - `api`: HTTP-facing components.
//! - `core`: Domain logic and shared models/errors.
//! - `integrations`: External service clients.
//! - `compliance`: GSTIN / tax-rate compliance rules.
//! - `config`: Configuration management.
//! - `csv_export`: Compliance report serialization.
//! - `dashboard`: Aggregate metrics and the dashboard page.
//! - `db`: Database connection and pool lifecycle.
//! - `db_storage`: Invoice repository implementations.
//! - `errors`: Error handling types.
//! - `extraction_client`: Gemini structured-output client.
//! - `handlers`: HTTP request handlers and routes.
//! - `ingestion`: Fetch → extract → evaluate → persist pipeline.
//! - `models`: Core data models and field validation.
//! - `services`: Invoice image fetching.
//! - `storage_client`: Supabase Storage client.

pub mod api;
pub mod core;
pub mod integrations;

pub mod compliance;
pub mod config;
pub mod csv_export;
pub mod dashboard;
pub mod db;
pub mod db_storage;
pub mod errors;
pub mod extraction_client;
pub mod handlers;
pub mod ingestion;
pub mod models;
pub mod services;
pub mod storage_client;
