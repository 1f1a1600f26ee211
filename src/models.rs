/// Data models for AppPricing API types.
///
/// All models use serde for JSON serialization/deserialization. Server
/// responses are parsed leniently: missing fields become `None`, and ids or
/// coordinates may arrive as either JSON numbers or strings.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Deserialize an optional value that may be a JSON number or a string, storing as String.
fn deserialize_optional_string_or_number<'de, D>(
    deserializer: D,
) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    match value {
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(serde_json::Value::Null) | None => Ok(None),
        Some(v) => Ok(Some(v.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------

/// Device registration payload for POST /device-data.
///
/// Built once per `initialize()` call and discarded after sending.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceData {
    pub device_id: String,
    pub hash: String,
    pub country: String,
    pub region: String,
    pub city: String,
    pub timezone: String,
    pub first_seen: String,
    pub last_seen: String,
    pub engagement_time: u64,
    pub session_count: u64,
    pub language: String,
    pub brand: String,
    pub model: String,
    pub os: String,
    pub os_version: String,
    pub screen_height: i64,
    pub screen_width: i64,
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// Response from the IP geolocation service. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LocationData {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub region_code: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string_or_number")]
    pub longitude: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string_or_number")]
    pub latitude: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

/// A pricing plan, passed through from the server as-is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    #[serde(default, deserialize_with = "deserialize_optional_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Any fields the server adds beyond the documented ones.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Response from GET /device-data/{deviceId}/plans.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlansResponse {
    #[serde(default)]
    pub plans: Option<Vec<Plan>>,
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// A point in time supplied by the host, normalized to ISO-8601 before sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timestamp {
    At(chrono::DateTime<chrono::Utc>),
    /// RFC 3339, naive `YYYY-MM-DDTHH:MM:SS` (UTC) or `YYYY-MM-DD`.
    Text(String),
    /// Milliseconds since the Unix epoch.
    Millis(i64),
}

impl Timestamp {
    /// The `YYYY-MM-DDTHH:MM:SS.mmmZ` form, or an error if the input is not a time.
    pub fn to_iso8601(&self) -> Result<String, crate::errors::AppPricingError> {
        let at = match self {
            Timestamp::At(at) => *at,
            Timestamp::Text(text) => crate::payments::parse_timestamp(text)?,
            Timestamp::Millis(millis) => crate::payments::timestamp_from_millis(*millis)?,
        };
        Ok(crate::payments::iso8601(at))
    }
}

impl From<chrono::DateTime<chrono::Utc>> for Timestamp {
    fn from(at: chrono::DateTime<chrono::Utc>) -> Self {
        Timestamp::At(at)
    }
}

impl From<&str> for Timestamp {
    fn from(text: &str) -> Self {
        Timestamp::Text(text.to_string())
    }
}

impl From<String> for Timestamp {
    fn from(text: String) -> Self {
        Timestamp::Text(text)
    }
}

// ---------------------------------------------------------------------------
// Page views
// ---------------------------------------------------------------------------

/// Request body for POST /pages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageViewPayload {
    pub device_id: String,
    pub page_name: String,
    pub visited_at: String,
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

/// Kind of payment event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Trial,
    NewSub,
    Renewal,
    Upgrade,
    Downgrade,
    Resubscribe,
    Refund,
    Offer,
    Promo,
}

impl PaymentType {
    /// Every recognized payment type.
    pub const ALL: [PaymentType; 9] = [
        PaymentType::Trial,
        PaymentType::NewSub,
        PaymentType::Renewal,
        PaymentType::Upgrade,
        PaymentType::Downgrade,
        PaymentType::Resubscribe,
        PaymentType::Refund,
        PaymentType::Offer,
        PaymentType::Promo,
    ];

    /// The wire name, e.g. `"new_sub"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Trial => "trial",
            PaymentType::NewSub => "new_sub",
            PaymentType::Renewal => "renewal",
            PaymentType::Upgrade => "upgrade",
            PaymentType::Downgrade => "downgrade",
            PaymentType::Resubscribe => "resubscribe",
            PaymentType::Refund => "refund",
            PaymentType::Offer => "offer",
            PaymentType::Promo => "promo",
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown payment type: {s}"))
    }
}

/// A payment event reported by the host app.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentInfo {
    pub payment_type: Option<PaymentType>,
    pub amount: f64,
    pub product_id: Option<String>,
    pub paid_at: Option<chrono::DateTime<chrono::Utc>>,
    pub currency: Option<String>,
    pub details: Option<String>,
}

impl PaymentInfo {
    /// A payment of `amount` with every optional field unset.
    pub fn new(amount: f64) -> Self {
        Self {
            payment_type: None,
            amount,
            product_id: None,
            paid_at: None,
            currency: None,
            details: None,
        }
    }

    pub fn with_type(mut self, payment_type: PaymentType) -> Self {
        self.payment_type = Some(payment_type);
        self
    }

    pub fn with_product_id(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    pub fn with_paid_at(mut self, paid_at: chrono::DateTime<chrono::Utc>) -> Self {
        self.paid_at = Some(paid_at);
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// A payment as sent on the wire: `paid_at` normalized to ISO-8601 or `null`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentRecord {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<PaymentType>,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    pub paid_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Request body for POST /payments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentPayload {
    pub device_id: String,
    pub payments: Vec<PaymentRecord>,
}
