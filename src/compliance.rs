//! Compliance rules applied to every extracted invoice.

use crate::models::{ComplianceStatus, ExtractedFields, RiskLevel};

/// Classifies an invoice from the presence of its GSTIN and tax rate.
///
/// First match wins:
/// 1. no GSTIN → `FLAG_INVALID_GST` / High
/// 2. no tax rate → `PENDING` / Medium
/// 3. otherwise → `VALID` / Low
///
/// Vendor, number, amount and date never affect the outcome.
pub fn evaluate(fields: &ExtractedFields) -> (ComplianceStatus, RiskLevel) {
    classify(fields.gstin.is_some(), fields.tax_rate.is_some())
}

pub fn classify(has_gstin: bool, has_tax_rate: bool) -> (ComplianceStatus, RiskLevel) {
    if !has_gstin {
        (ComplianceStatus::FlagInvalidGst, RiskLevel::High)
    } else if !has_tax_rate {
        (ComplianceStatus::Pending, RiskLevel::Medium)
    } else {
        (ComplianceStatus::Valid, RiskLevel::Low)
    }
}
