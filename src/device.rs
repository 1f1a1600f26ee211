/// Device attributes supplied by the host platform.
///
/// The SDK never probes hardware itself. Hosts implement
/// [`DeviceInfoProvider`] (or use [`StaticDeviceInfo`]) and the SDK turns the
/// result into a [`DeviceData`] registration.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::errors::{AppPricingError, Outcome};
use crate::location::Enrichment;
use crate::models::DeviceData;
use crate::payments::iso8601;

/// Raw device attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    /// Install-specific unique id.
    pub unique_id: String,
    /// Stable fingerprint distinct from `unique_id`. Derived from the
    /// hardware attributes when the platform has none.
    pub fingerprint: Option<String>,
    pub brand: String,
    pub model: String,
    pub os: String,
    pub os_version: String,
    pub screen_width: f64,
    pub screen_height: f64,
    pub first_install_time: DateTime<Utc>,
}

impl DeviceInfo {
    /// The platform fingerprint, or a SHA-256 over the hardware attributes.
    pub fn fingerprint(&self) -> String {
        match self.fingerprint.as_deref().filter(|f| !f.is_empty()) {
            Some(fingerprint) => fingerprint.to_string(),
            None => derive_fingerprint(self),
        }
    }
}

fn derive_fingerprint(info: &DeviceInfo) -> String {
    let mut hasher = Sha256::new();
    for part in [
        info.brand.as_str(),
        info.model.as_str(),
        info.os.as_str(),
        info.os_version.as_str(),
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hasher.update(format!("{}x{}", info.screen_width.round(), info.screen_height.round()));
    hex::encode(hasher.finalize())
}

/// Source of device attributes, implemented by the host platform.
#[async_trait]
pub trait DeviceInfoProvider: Send + Sync {
    /// Read the current device's attributes. An error aborts initialization.
    async fn device_info(&self) -> Outcome<DeviceInfo>;
}

/// Provider returning a fixed [`DeviceInfo`].
#[derive(Debug, Clone)]
pub struct StaticDeviceInfo(pub DeviceInfo);

#[async_trait]
impl DeviceInfoProvider for StaticDeviceInfo {
    async fn device_info(&self) -> Outcome<DeviceInfo> {
        if self.0.unique_id.trim().is_empty() {
            return Err(AppPricingError::DeviceInfo("unique id is empty".into()));
        }
        Ok(self.0.clone())
    }
}

/// Assemble the registration payload for one `initialize()` call.
pub fn build_device_data(info: &DeviceInfo, enrichment: Enrichment, now: DateTime<Utc>) -> DeviceData {
    DeviceData {
        device_id: info.unique_id.clone(),
        hash: info.fingerprint(),
        country: enrichment.country,
        region: enrichment.region,
        city: enrichment.city,
        timezone: enrichment.timezone,
        first_seen: iso8601(info.first_install_time),
        last_seen: iso8601(now),
        engagement_time: 0,
        session_count: 1,
        language: enrichment.language,
        brand: info.brand.clone(),
        model: info.model.clone(),
        os: info.os.clone(),
        os_version: info.os_version.clone(),
        screen_height: info.screen_height.round() as i64,
        screen_width: info.screen_width.round() as i64,
    }
}
