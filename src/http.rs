/// Generic HTTP wrapper with uniform error classification and logging.
///
/// [`HttpClient::request`] issues exactly one call and returns an
/// [`Outcome`]: transport failures, non-2xx statuses and undecodable bodies
/// all come back as [`AppPricingError`] values, never as panics.
use std::any::type_name;

use log::debug;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::{AppPricingError, Outcome};
use crate::logger::{Logger, RequestContext};

/// Method, headers and body of a single request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Defaults to `GET` when unset.
    pub method: Option<Method>,
    pub headers: Vec<(String, String)>,
    /// Sent on the wire exactly as given.
    pub body: Option<String>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self {
            method: Some(Method::GET),
            ..Self::default()
        }
    }

    pub fn post() -> Self {
        Self {
            method: Some(Method::POST),
            ..Self::default()
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `body` as the JSON request body.
    pub fn json<B: Serialize + ?Sized>(self, body: &B) -> Outcome<Self> {
        Ok(self.body(serde_json::to_string(body)?))
    }

    pub fn method(&self) -> Method {
        self.method.clone().unwrap_or(Method::GET)
    }
}

/// Decode a request body for logging only, falling back to the raw text.
fn payload_for_log(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or_else(|_| serde_json::Value::String(body.to_string()))
}

/// HTTP client shared by every SDK endpoint.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    logger: Logger,
}

impl HttpClient {
    pub fn new(logger: Logger) -> Self {
        Self::with_client(Client::new(), logger)
    }

    /// Use a preconfigured reqwest client (proxies, timeouts, TLS roots).
    pub fn with_client(client: Client, logger: Logger) -> Self {
        Self { client, logger }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Perform one request and decode a JSON response of type `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Outcome<T> {
        let method = options.method();
        let payload = options.body.as_deref().map(payload_for_log);
        let target_type = type_name::<T>();
        debug!(
            "http.request method={} url={} has_body={} target_type={}",
            method,
            url,
            options.body.is_some(),
            target_type
        );

        let mut builder = self.client.request(method.clone(), url);
        for (name, value) in &options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = options.body {
            builder = builder.body(body);
        }

        let context = RequestContext::new(method.as_str(), url);
        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let err = AppPricingError::from(e);
                self.logger
                    .log("Fetch error", Some(&err), Some(&context.with_payload(payload)));
                return Err(err);
            }
        };

        let status = response.status();
        if !status.is_success() {
            // The body is diagnostic only; a failed read falls back to the reason phrase.
            let text = response
                .text()
                .await
                .ok()
                .filter(|t| !t.trim().is_empty());
            debug!(
                "http.request non_success status={} body_len={:?}",
                status,
                text.as_ref().map(String::len)
            );
            let message = text.clone().unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown status")
                    .to_string()
            });
            let err = AppPricingError::Api {
                status: status.as_u16(),
                message,
            };
            let mut context = context.with_status(status.as_u16()).with_payload(payload);
            if let Some(text) = text {
                context = context.with_response_text(text);
            }
            self.logger.log("API request failed", Some(&err), Some(&context));
            return Err(err);
        }

        // Success entries never carry the request payload.
        self.logger.log(
            "API request successful",
            None,
            Some(&context.clone().with_status(status.as_u16())),
        );

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                let err = AppPricingError::from(e);
                self.logger.log(
                    "Failed to read response body",
                    Some(&err),
                    Some(&context.with_status(status.as_u16())),
                );
                return Err(err);
            }
        };

        match serde_json::from_str(&text) {
            Ok(parsed) => {
                debug!("http.request decode_ok target_type={}", target_type);
                Ok(parsed)
            }
            Err(e) => {
                let err = AppPricingError::JsonError(format!(
                    "Failed to parse response: {e}\nBody: {}",
                    text.chars().take(500).collect::<String>()
                ));
                self.logger.log(
                    "Failed to decode response",
                    Some(&err),
                    Some(&context.with_status(status.as_u16())),
                );
                Err(err)
            }
        }
    }
}
