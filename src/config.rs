/// Configuration for the AppPricing SDK.
use url::Url;

use crate::errors::AppPricingError;
use crate::models::PaymentType;

/// Default AppPricing service endpoint.
pub const DEFAULT_BASE_URL: &str = "https://dash.apppricing.com/api";

/// Default IP geolocation endpoint used to enrich device data.
pub const DEFAULT_LOCATION_URL: &str = "https://ifconfig.apppricing.com/json";

/// How payment records are validated before they are sent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PaymentPolicy {
    /// `type` is optional; when present it must be one of the [`PaymentType`] catalog.
    #[default]
    Catalog,
    /// `type` is required and must be one of the listed values.
    ///
    /// Deprecated: kept for hosts migrating from the two-value payment API.
    /// New integrations should use [`PaymentPolicy::Catalog`].
    Restricted(Vec<PaymentType>),
}

/// Where the device language tag comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LanguagePolicy {
    /// Derive `<lang>-<COUNTRY>` from the geolocated country code.
    #[default]
    CountryMapping,
    /// Use the geolocation service's `language` field when it has one,
    /// otherwise fall back to [`LanguagePolicy::CountryMapping`].
    PreferServer,
}

/// Options accepted by [`AppPricing::initialize`](crate::AppPricing::initialize).
///
/// Every field has a default; set only what you need.
#[derive(Debug, Clone, PartialEq)]
pub struct SdkOptions {
    /// Device id to use until device collection provides one.
    pub device_id: Option<String>,
    pub base_url: String,
    pub location_url: String,
    /// Accepted for compatibility. The initialized latch is owned by the lifecycle.
    pub initialized: Option<bool>,
    pub enable_logging: bool,
    pub payment_policy: PaymentPolicy,
    pub language_policy: LanguagePolicy,
}

impl Default for SdkOptions {
    fn default() -> Self {
        Self {
            device_id: None,
            base_url: DEFAULT_BASE_URL.into(),
            location_url: DEFAULT_LOCATION_URL.into(),
            initialized: None,
            enable_logging: true,
            payment_policy: PaymentPolicy::default(),
            language_policy: LanguagePolicy::default(),
        }
    }
}

impl SdkOptions {
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_location_url(mut self, location_url: impl Into<String>) -> Self {
        self.location_url = location_url.into();
        self
    }

    pub fn with_initialized(mut self, initialized: bool) -> Self {
        self.initialized = Some(initialized);
        self
    }

    pub fn with_logging(mut self, enable_logging: bool) -> Self {
        self.enable_logging = enable_logging;
        self
    }

    pub fn with_payment_policy(mut self, policy: PaymentPolicy) -> Self {
        self.payment_policy = policy;
        self
    }

    pub fn with_language_policy(mut self, policy: LanguagePolicy) -> Self {
        self.language_policy = policy;
        self
    }

    /// Check the options and normalize URLs.
    ///
    /// Both URLs must be absolute `http`/`https` URLs. A trailing `/` on
    /// `base_url` is dropped so endpoint paths can be appended directly.
    pub fn validate(mut self) -> Result<Self, AppPricingError> {
        check_http_url("base_url", &self.base_url)?;
        check_http_url("location_url", &self.location_url)?;
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        if let PaymentPolicy::Restricted(types) = &self.payment_policy {
            if types.is_empty() {
                return Err(AppPricingError::InvalidConfig(
                    "restricted payment policy needs at least one payment type".into(),
                ));
            }
        }
        if self.device_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            self.device_id = None;
        }
        Ok(self)
    }
}

fn check_http_url(field: &str, value: &str) -> Result<(), AppPricingError> {
    let parsed = Url::parse(value)?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AppPricingError::InvalidConfig(format!(
            "{field} must use http or https, got {other}"
        ))),
    }
}
