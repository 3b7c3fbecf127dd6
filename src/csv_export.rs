//! CSV compliance report.

use crate::models::{format_amount, InvoiceRecord};

/// Download name of the exported report.
pub const REPORT_FILE_NAME: &str = "compliance_report.csv";

pub const HEADERS: [&str; 7] = [
    "Database ID",
    "Vendor Name",
    "Invoice Number",
    "Amount",
    "GSTIN",
    "Compliance Status",
    "Risk Level",
];

/// Serializes `records` as CSV, header first, rows in input order.
///
/// Every field is double-quoted and embedded quotes are doubled. Lines are
/// joined with `\n` without a trailing newline. Callers should refuse to
/// export an empty list instead of producing a header-only file.
pub fn to_csv(records: &[InvoiceRecord]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(HEADERS.join(","));

    for record in records {
        let fields = [
            record.id.to_string(),
            non_blank(&record.vendor_name).unwrap_or("Unknown").to_string(),
            non_blank(&record.invoice_number).unwrap_or("N/A").to_string(),
            format_amount(&record.amount),
            record
                .gstin
                .as_deref()
                .and_then(non_blank)
                .unwrap_or("N/A")
                .to_string(),
            record.status.to_string(),
            record.risk_score.to_string(),
        ];
        let row: Vec<String> = fields.iter().map(|f| quote(f)).collect();
        lines.push(row.join(","));
    }

    lines.join("\n")
}

fn non_blank(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
