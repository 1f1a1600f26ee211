/// Error types for the AppPricing SDK.
///
/// Every transport and validation failure inside the SDK is a value of
/// [`AppPricingError`]. The public [`AppPricing`](crate::AppPricing) facade
/// never hands these to callers; it folds them into `bool` / empty results.
use thiserror::Error;

/// The primary error type for the AppPricing SDK.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppPricingError {
    // Preconditions
    #[error("API key is required")]
    MissingApiKey,

    #[error("SDK not initialized. Call initialize() first")]
    NotInitialized,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid payment: {0}")]
    InvalidPayment(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    // Host platform
    #[error("Device info unavailable: {0}")]
    DeviceInfo(String),

    // Transport
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("JSON error: {0}")]
    JsonError(String),
}

/// Result of a single SDK-internal operation.
pub type Outcome<T> = Result<T, AppPricingError>;

impl AppPricingError {
    /// Returns the HTTP status code if the server answered with a non-2xx status.
    pub fn status(&self) -> Option<u16> {
        match self {
            AppPricingError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true for failures detected locally, before any network call.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            AppPricingError::MissingApiKey
                | AppPricingError::NotInitialized
                | AppPricingError::InvalidConfig(_)
                | AppPricingError::InvalidPayment(_)
                | AppPricingError::InvalidTimestamp(_)
        )
    }
}

impl From<reqwest::Error> for AppPricingError {
    fn from(err: reqwest::Error) -> Self {
        AppPricingError::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for AppPricingError {
    fn from(err: serde_json::Error) -> Self {
        AppPricingError::JsonError(err.to_string())
    }
}

impl From<url::ParseError> for AppPricingError {
    fn from(err: url::ParseError) -> Self {
        AppPricingError::InvalidConfig(format!("URL parse error: {err}"))
    }
}
