/// Payment validation and timestamp normalization.
///
/// Every payment in a batch is checked before anything is sent; the first
/// invalid record rejects the whole batch.
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

use crate::config::PaymentPolicy;
use crate::errors::{AppPricingError, Outcome};
use crate::models::{PaymentInfo, PaymentRecord, PaymentType};

/// ISO-8601 in UTC with millisecond precision, e.g. `2024-03-01T12:00:00.000Z`.
pub fn iso8601(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a host-supplied timestamp.
///
/// Accepts RFC 3339 (any offset), a naive `YYYY-MM-DDTHH:MM:SS[.fff]` taken
/// as UTC, or a bare `YYYY-MM-DD` date at midnight UTC.
pub fn parse_timestamp(input: &str) -> Outcome<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Ok(at.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    if let Some(midnight) = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(Utc.from_utc_datetime(&midnight));
    }
    Err(AppPricingError::InvalidTimestamp(input.to_string()))
}

/// Milliseconds since the Unix epoch.
pub fn timestamp_from_millis(millis: i64) -> Outcome<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| AppPricingError::InvalidTimestamp(millis.to_string()))
}

fn check_policy(index: usize, payment: &PaymentInfo, policy: &PaymentPolicy) -> Outcome<()> {
    if !payment.amount.is_finite() {
        return Err(AppPricingError::InvalidPayment(format!(
            "payment {index}: invalid or missing amount: {}",
            payment.amount
        )));
    }
    if let PaymentPolicy::Restricted(allowed) = policy {
        match payment.payment_type {
            Some(t) if allowed.contains(&t) => {}
            Some(t) => {
                return Err(AppPricingError::InvalidPayment(format!(
                    "payment {index}: payment type {t} is not accepted"
                )))
            }
            None => {
                return Err(AppPricingError::InvalidPayment(format!(
                    "payment {index}: payment type is required"
                )))
            }
        }
    }
    Ok(())
}

/// Validate a batch and convert it to wire records.
pub fn validate_payments(
    payments: &[PaymentInfo],
    policy: &PaymentPolicy,
) -> Outcome<Vec<PaymentRecord>> {
    if payments.is_empty() {
        return Err(AppPricingError::InvalidPayment(
            "Payments array must be provided and cannot be empty".into(),
        ));
    }
    for (index, payment) in payments.iter().enumerate() {
        check_policy(index, payment, policy)?;
    }
    Ok(payments
        .iter()
        .map(|p| PaymentRecord {
            payment_type: p.payment_type,
            amount: p.amount,
            product_id: p.product_id.clone(),
            paid_at: p.paid_at.map(iso8601),
            currency: p.currency.clone(),
            details: p.details.clone(),
        })
        .collect())
}

fn optional_string(index: usize, record: &Value, field: &str) -> Outcome<Option<String>> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(AppPricingError::InvalidPayment(format!(
            "payment {index}: invalid {field}: expected a string but received {other}"
        ))),
    }
}

/// Convert an untyped JSON payment record, checking each field's type.
///
/// `amount` must be a JSON number; `product_id`, `currency` and `details`
/// must be strings when present; `type` must name a [`PaymentType`];
/// `paid_at` may be a timestamp string or epoch milliseconds.
pub fn payment_from_value(index: usize, record: &Value) -> Outcome<PaymentInfo> {
    if !record.is_object() {
        return Err(AppPricingError::InvalidPayment(format!(
            "payment {index}: expected an object"
        )));
    }

    let amount = match record.get("amount") {
        Some(Value::Number(n)) => n.as_f64(),
        _ => None,
    }
    .ok_or_else(|| {
        AppPricingError::InvalidPayment(format!(
            "payment {index}: invalid or missing amount: {}",
            record.get("amount").unwrap_or(&Value::Null)
        ))
    })?;

    let payment_type = match record.get("type") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.parse::<PaymentType>().map_err(|_| {
            AppPricingError::InvalidPayment(format!(
                "payment {index}: invalid payment type provided: {s}"
            ))
        })?),
        Some(other) => {
            return Err(AppPricingError::InvalidPayment(format!(
                "payment {index}: invalid payment type provided: {other}"
            )))
        }
    };

    let paid_at = match record.get("paid_at") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(parse_timestamp(s)?),
        Some(Value::Number(n)) => {
            let millis = n.as_i64().ok_or_else(|| {
                AppPricingError::InvalidTimestamp(format!("payment {index}: paid_at {n}"))
            })?;
            Some(timestamp_from_millis(millis)?)
        }
        Some(other) => {
            return Err(AppPricingError::InvalidTimestamp(format!(
                "payment {index}: paid_at {other}"
            )))
        }
    };

    Ok(PaymentInfo {
        payment_type,
        amount,
        product_id: optional_string(index, record, "product_id")?,
        paid_at,
        currency: optional_string(index, record, "currency")?,
        details: optional_string(index, record, "details")?,
    })
}

/// Convert every untyped record, stopping at the first invalid one.
pub fn payments_from_values(records: &[Value]) -> Outcome<Vec<PaymentInfo>> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| payment_from_value(index, record))
        .collect()
}
