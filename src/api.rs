/// REST API client for the AppPricing service.
///
/// Typed wrappers for every endpoint the SDK talks to. Each call goes
/// through [`HttpClient`], so failures come back as values.
use log::debug;

use crate::errors::Outcome;
use crate::http::{HttpClient, RequestOptions};
use crate::models::*;

/// Base URL and API key for authenticated calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub base_url: String,
    pub api_key: String,
}

/// Low-level REST API client for AppPricing.
#[derive(Debug, Clone)]
pub struct AppPricingApi {
    http: HttpClient,
    credentials: Credentials,
}

impl AppPricingApi {
    pub fn new(http: HttpClient, credentials: Credentials) -> Self {
        Self { http, credentials }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.credentials.base_url, path)
    }

    fn authed(&self, options: RequestOptions) -> RequestOptions {
        options
            .header("Content-Type", "application/json")
            .header("X-API-KEY", self.credentials.api_key.as_str())
    }

    // -----------------------------------------------------------------------
    // Device
    // -----------------------------------------------------------------------

    /// POST /device-data - Register or refresh the device.
    pub async fn send_device_data(&self, device: &DeviceData) -> Outcome<serde_json::Value> {
        debug!("api.send_device_data device_id={}", device.device_id);
        let options = self.authed(RequestOptions::post()).json(device)?;
        self.http.request(&self.url("/device-data"), options).await
    }

    /// POST /device-data/{deviceId}/increment-session - Count a new session.
    pub async fn increment_session(&self, device_id: &str) -> Outcome<serde_json::Value> {
        debug!("api.increment_session device_id={}", device_id);
        let url = self.url(&format!("/device-data/{device_id}/increment-session"));
        self.http
            .request(&url, self.authed(RequestOptions::post()))
            .await
    }

    // -----------------------------------------------------------------------
    // Plans
    // -----------------------------------------------------------------------

    /// GET /device-data/{deviceId}/plans - Plans offered to this device.
    pub async fn get_plans(&self, device_id: &str) -> Outcome<Vec<Plan>> {
        debug!("api.get_plans device_id={}", device_id);
        let url = self.url(&format!("/device-data/{device_id}/plans"));
        let resp: PlansResponse = self
            .http
            .request(&url, self.authed(RequestOptions::get()))
            .await?;
        Ok(resp.plans.unwrap_or_default())
    }

    // -----------------------------------------------------------------------
    // Tracking
    // -----------------------------------------------------------------------

    /// POST /pages - Record a page view.
    pub async fn track_page_view(&self, payload: &PageViewPayload) -> Outcome<serde_json::Value> {
        debug!(
            "api.track_page_view device_id={} page_name={}",
            payload.device_id, payload.page_name
        );
        let options = self.authed(RequestOptions::post()).json(payload)?;
        self.http.request(&self.url("/pages"), options).await
    }

    /// POST /payments - Record one or more payments.
    pub async fn send_payments(&self, payload: &PaymentPayload) -> Outcome<serde_json::Value> {
        debug!(
            "api.send_payments device_id={} count={}",
            payload.device_id,
            payload.payments.len()
        );
        let options = self.authed(RequestOptions::post()).json(payload)?;
        self.http.request(&self.url("/payments"), options).await
    }
}
