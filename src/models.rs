use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

// ============ Compliance Classification ============

/// Regulatory completeness of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceStatus {
    Valid,
    Pending,
    FlagInvalidGst,
}

impl ComplianceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceStatus::Valid => "VALID",
            ComplianceStatus::Pending => "PENDING",
            ComplianceStatus::FlagInvalidGst => "FLAG_INVALID_GST",
        }
    }
}

/// Severity label paired with a [`ComplianceStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored label that does not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

impl FromStr for ComplianceStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VALID" => Ok(ComplianceStatus::Valid),
            "PENDING" => Ok(ComplianceStatus::Pending),
            "FLAG_INVALID_GST" => Ok(ComplianceStatus::FlagInvalidGst),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl FromStr for RiskLevel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(RiskLevel::Low),
            "Medium" => Ok(RiskLevel::Medium),
            "High" => Ok(RiskLevel::High),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl TryFrom<String> for ComplianceStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<String> for RiskLevel {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ============ Database Models ============

/// A persisted invoice.
///
/// Created once after a successful extraction and never updated in place.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    /// Repository-assigned identifier.
    pub id: i64,
    pub vendor_name: String,
    pub invoice_number: String,
    /// Total invoice value, kept to two decimal places.
    #[serde(with = "amount_json")]
    pub amount: BigDecimal,
    /// Invoice issue date.
    pub date: NaiveDate,
    /// GST identification number, when printed on the invoice.
    pub gstin: Option<String>,
    /// Tax percentage, e.g. `18.0` for 18%.
    pub tax_rate: Option<f64>,
    #[sqlx(try_from = "String")]
    pub status: ComplianceStatus,
    #[sqlx(try_from = "String")]
    pub risk_score: RiskLevel,
    /// Public URL of the source image.
    pub file_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to insert an invoice; the repository assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInvoice {
    pub fields: ExtractedFields,
    pub status: ComplianceStatus,
    pub risk_score: RiskLevel,
    pub file_url: Option<String>,
}

// ============ Money ============

/// Decimal places stored for an amount, matching the `NUMERIC(14, 2)` column.
pub const AMOUNT_SCALE: i64 = 2;

pub fn round_amount(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(AMOUNT_SCALE, RoundingMode::HalfUp)
}

/// Two fixed decimals, e.g. `0.30`, for display next to a currency sign.
pub fn format_amount_fixed(value: &BigDecimal) -> String {
    round_amount(value).to_string()
}

/// Shortest plain rendering, e.g. `500`, `12.5` or `0.3`.
pub fn format_amount(value: &BigDecimal) -> String {
    let fixed = format_amount_fixed(value);
    if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        fixed
    }
}

/// Amounts travel as plain JSON numbers.
pub(crate) mod amount_json {
    use super::round_amount;
    use bigdecimal::{BigDecimal, ToPrimitive};
    use serde::{de, ser, Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error> {
        let number = round_amount(value)
            .to_f64()
            .ok_or_else(|| ser::Error::custom(format!("amount {} is out of range", value)))?;
        serializer.serialize_f64(number)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigDecimal, D::Error> {
        let number = f64::deserialize(deserializer)?;
        BigDecimal::from_str(&number.to_string())
            .map(|value| round_amount(&value))
            .map_err(de::Error::custom)
    }
}

// ============ Extraction Models ============

/// Invoice fields that passed validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFields {
    pub vendor_name: String,
    pub invoice_number: String,
    #[serde(with = "amount_json")]
    pub amount: BigDecimal,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gstin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<f64>,
}

/// Why a payload failed the invoice field contract.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldError {
    /// The payload is not a JSON object.
    NotAnObject,
    /// A required field is absent, null or blank.
    Missing(&'static str),
    /// A field is present but has the wrong type or an impossible value.
    Invalid { field: &'static str, reason: String },
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::NotAnObject => write!(f, "payload is not a JSON object"),
            FieldError::Missing(field) => write!(f, "missing required field '{}'", field),
            FieldError::Invalid { field, reason } => {
                write!(f, "invalid field '{}': {}", field, reason)
            }
        }
    }
}

impl std::error::Error for FieldError {}

impl ExtractedFields {
    /// Validates a raw JSON payload against the invoice field contract.
    ///
    /// Required: `vendorName`, `invoiceNumber` (non-blank strings), `amount`
    /// (non-negative number), `date` (`YYYY-MM-DD`, real calendar date).
    /// Optional: `gstin` (blank counts as absent), `taxRate` (non-negative number).
    pub fn from_payload(payload: &Value) -> Result<Self, FieldError> {
        let object = payload.as_object().ok_or(FieldError::NotAnObject)?;

        let vendor_name = required_string(object.get("vendorName"), "vendorName")?;
        let invoice_number = required_string(object.get("invoiceNumber"), "invoiceNumber")?;

        let amount = match object.get("amount") {
            None | Some(Value::Null) => return Err(FieldError::Missing("amount")),
            Some(v) => parse_amount(v)?,
        };

        let date_raw = required_string(object.get("date"), "date")?;
        let date = parse_date(&date_raw)?;

        let gstin = match object.get("gstin") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(s.trim().to_string()),
            Some(other) => {
                return Err(FieldError::Invalid {
                    field: "gstin",
                    reason: format!("expected a string, got {}", other),
                })
            }
        };

        let tax_rate = match object.get("taxRate") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(v) => Some(parse_tax_rate(v)?),
        };

        Ok(Self {
            vendor_name,
            invoice_number,
            amount,
            date,
            gstin,
            tax_rate,
        })
    }
}

fn required_string(value: Option<&Value>, field: &'static str) -> Result<String, FieldError> {
    match value {
        None | Some(Value::Null) => Err(FieldError::Missing(field)),
        Some(Value::String(s)) if s.trim().is_empty() => Err(FieldError::Missing(field)),
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(other) => Err(FieldError::Invalid {
            field,
            reason: format!("expected a string, got {}", other),
        }),
    }
}

/// Strict `YYYY-MM-DD`; chrono alone also takes `2024-3-5` and `+2024-03-05`.
fn parse_date(raw: &str) -> Result<NaiveDate, FieldError> {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    let shape = SHAPE.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern is valid")
    });

    let invalid = |detail: String| FieldError::Invalid {
        field: "date",
        reason: format!("'{}' is not a YYYY-MM-DD calendar date{}", raw, detail),
    };

    if !shape.is_match(raw) {
        return Err(invalid(String::new()));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| invalid(format!(" ({})", e)))
}

/// Text of a JSON number or a numeric string such as `"1,250.50"` or `"18%"`.
fn numeric_text(value: &Value, field: &'static str) -> Result<String, FieldError> {
    match value {
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s
            .trim()
            .trim_end_matches('%')
            .chars()
            .filter(|c| *c != ',' && !c.is_whitespace())
            .collect()),
        _ => Err(not_a_number(value, field)),
    }
}

fn not_a_number(value: &Value, field: &'static str) -> FieldError {
    FieldError::Invalid {
        field,
        reason: format!("expected a number, got {}", value),
    }
}

fn parse_amount(value: &Value) -> Result<BigDecimal, FieldError> {
    let amount = BigDecimal::from_str(&numeric_text(value, "amount")?)
        .map_err(|_| not_a_number(value, "amount"))?;

    if amount < BigDecimal::from(0) {
        return Err(FieldError::Invalid {
            field: "amount",
            reason: format!("must be a non-negative number, got {}", amount),
        });
    }
    Ok(round_amount(&amount))
}

fn parse_tax_rate(value: &Value) -> Result<f64, FieldError> {
    let rate = numeric_text(value, "taxRate")?
        .parse::<f64>()
        .map_err(|_| not_a_number(value, "taxRate"))?;

    if !rate.is_finite() || rate < 0.0 {
        return Err(FieldError::Invalid {
            field: "taxRate",
            reason: format!("must be a non-negative number, got {}", rate),
        });
    }
    Ok(rate)
}

// ============ API Request/Response Models ============

/// Body of `POST /process`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub file_url: Option<String>,
}

/// Response of `POST /upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub url: String,
}

/// Response wrapping a single invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceResponse {
    pub success: bool,
    pub data: InvoiceRecord,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_payload() -> Value {
        json!({
            "vendorName": "Acme Traders",
            "invoiceNumber": "INV-001",
            "amount": 1180.0,
            "date": "2024-03-15",
            "gstin": "29ABCDE1234F1Z5",
            "taxRate": 18
        })
    }

    #[test]
    fn test_from_payload_full() {
        let fields = ExtractedFields::from_payload(&full_payload()).unwrap();
        assert_eq!(fields.vendor_name, "Acme Traders");
        assert_eq!(fields.invoice_number, "INV-001");
        assert_eq!(fields.amount, BigDecimal::from(1180));
        assert_eq!(fields.date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(fields.gstin.as_deref(), Some("29ABCDE1234F1Z5"));
        assert_eq!(fields.tax_rate, Some(18.0));
    }

    #[test]
    fn test_from_payload_optional_fields_absent() {
        let mut payload = full_payload();
        let obj = payload.as_object_mut().unwrap();
        obj.remove("gstin");
        obj.insert("taxRate".into(), Value::Null);

        let fields = ExtractedFields::from_payload(&payload).unwrap();
        assert_eq!(fields.gstin, None);
        assert_eq!(fields.tax_rate, None);
    }

    #[test]
    fn test_blank_gstin_is_absent() {
        let mut payload = full_payload();
        payload["gstin"] = json!("   ");
        let fields = ExtractedFields::from_payload(&payload).unwrap();
        assert_eq!(fields.gstin, None);
    }

    #[test]
    fn test_missing_required_fields() {
        for field in ["vendorName", "invoiceNumber", "amount", "date"] {
            let mut payload = full_payload();
            payload.as_object_mut().unwrap().remove(field);
            assert_eq!(
                ExtractedFields::from_payload(&payload),
                Err(FieldError::Missing(field)),
                "field {}",
                field
            );
        }
    }

    #[test]
    fn test_wrong_types_rejected() {
        let mut payload = full_payload();
        payload["vendorName"] = json!(42);
        assert!(matches!(
            ExtractedFields::from_payload(&payload),
            Err(FieldError::Invalid { field: "vendorName", .. })
        ));

        let mut payload = full_payload();
        payload["amount"] = json!("twelve");
        assert!(matches!(
            ExtractedFields::from_payload(&payload),
            Err(FieldError::Invalid { field: "amount", .. })
        ));

        assert_eq!(
            ExtractedFields::from_payload(&json!(["not", "an", "object"])),
            Err(FieldError::NotAnObject)
        );
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let mut payload = full_payload();
        payload["amount"] = json!("1,250.50");
        payload["taxRate"] = json!("12%");
        let fields = ExtractedFields::from_payload(&payload).unwrap();
        assert_eq!(format_amount(&fields.amount), "1250.5");
        assert_eq!(fields.tax_rate, Some(12.0));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let mut payload = full_payload();
        payload["amount"] = json!(-5);
        assert!(matches!(
            ExtractedFields::from_payload(&payload),
            Err(FieldError::Invalid { field: "amount", .. })
        ));
    }

    #[test]
    fn test_impossible_dates_rejected() {
        for bad in [
            "2024-02-30",
            "2023-13-01",
            "15/03/2024",
            "2024-3-5x",
            "2024-3-5",
            "+2024-03-05",
        ] {
            let mut payload = full_payload();
            payload["date"] = json!(bad);
            assert!(
                matches!(
                    ExtractedFields::from_payload(&payload),
                    Err(FieldError::Invalid { field: "date", .. })
                ),
                "date {}",
                bad
            );
        }
    }

    #[test]
    fn test_amount_rounds_to_two_places() {
        let mut payload = full_payload();
        payload["amount"] = json!(0.125);
        let fields = ExtractedFields::from_payload(&payload).unwrap();
        assert_eq!(format_amount_fixed(&fields.amount), "0.13");

        payload["amount"] = json!("-0.001");
        assert!(matches!(
            ExtractedFields::from_payload(&payload),
            Err(FieldError::Invalid { field: "amount", .. })
        ));
    }

    #[test]
    fn test_amount_formatting() {
        let parse = |s: &str| BigDecimal::from_str(s).unwrap();
        assert_eq!(format_amount(&parse("500")), "500");
        assert_eq!(format_amount(&parse("12.50")), "12.5");
        assert_eq!(format_amount(&parse("0")), "0");
        assert_eq!(format_amount(&(parse("0.1") + parse("0.2"))), "0.3");
        assert_eq!(format_amount_fixed(&parse("3540.3")), "3540.30");
        assert_eq!(format_amount_fixed(&parse("0")), "0.00");
    }

    #[test]
    fn test_amount_serializes_as_json_number() {
        let fields = ExtractedFields::from_payload(&json!({
            "vendorName": "Acme",
            "invoiceNumber": "INV-1",
            "amount": "1,200.50",
            "date": "2024-01-01"
        }))
        .unwrap();

        let value = serde_json::to_value(&fields).unwrap();
        assert_eq!(value["amount"], json!(1200.5));

        let back: ExtractedFields = serde_json::from_value(value).unwrap();
        assert_eq!(back, fields);
    }

    #[test]
    fn test_status_and_risk_labels_round_trip() {
        assert_eq!(
            serde_json::to_value(ComplianceStatus::FlagInvalidGst).unwrap(),
            json!("FLAG_INVALID_GST")
        );
        assert_eq!(serde_json::to_value(RiskLevel::Medium).unwrap(), json!("Medium"));
        assert_eq!("PENDING".parse::<ComplianceStatus>(), Ok(ComplianceStatus::Pending));
        assert!("valid".parse::<ComplianceStatus>().is_err());
        assert!(RiskLevel::try_from("Severe".to_string()).is_err());
    }
}
