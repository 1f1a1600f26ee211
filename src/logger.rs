/// Toggleable diagnostic sink for the SDK.
///
/// Messages go out through the [`log`] facade under the `apppricing` target,
/// so the host decides where they end up. The enabled flag is shared with the
/// SDK state and read on every call.
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{error, info};

/// `log` target used for every SDK diagnostic.
pub const LOG_TARGET: &str = "apppricing";

/// Request details attached to a log entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    pub method: Option<String>,
    pub url: Option<String>,
    pub status_code: Option<u16>,
    pub response_text: Option<String>,
    pub payload: Option<serde_json::Value>,
}

impl RequestContext {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: Some(method.into()),
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_response_text(mut self, text: impl Into<String>) -> Self {
        self.response_text = Some(text.into());
        self
    }

    pub fn with_payload(mut self, payload: Option<serde_json::Value>) -> Self {
        self.payload = payload;
        self
    }

    /// `[METHOD URL STATUS]`, or `None` when the context carries none of them.
    pub fn annotation(&self) -> Option<String> {
        if self.method.is_none() && self.url.is_none() && self.status_code.is_none() {
            return None;
        }
        let mut parts = vec![self.method.clone().unwrap_or_else(|| "GET".into())];
        if let Some(url) = self.url.as_deref().filter(|u| !u.is_empty()) {
            parts.push(url.to_string());
        }
        if let Some(status) = self.status_code {
            parts.push(status.to_string());
        }
        Some(format!("[{}]", parts.join(" ")))
    }
}

/// Process-wide diagnostic sink, cheap to clone.
#[derive(Debug, Clone)]
pub struct Logger {
    enabled: Arc<AtomicBool>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Logger {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Log `message`, at error level when `err` is present, otherwise info.
    ///
    /// The request payload, if any, is written as its own entry.
    pub fn log(
        &self,
        message: &str,
        err: Option<&dyn fmt::Display>,
        context: Option<&RequestContext>,
    ) {
        if !self.is_enabled() {
            return;
        }
        let line = format_line(message, context);
        let payload = context.and_then(|c| c.payload.as_ref());
        match err {
            Some(err) => {
                error!(target: LOG_TARGET, "{line} error={err}");
                if let Some(payload) = payload {
                    error!(target: LOG_TARGET, "Request payload: {payload}");
                }
            }
            None => {
                info!(target: LOG_TARGET, "{line}");
                if let Some(payload) = payload {
                    info!(target: LOG_TARGET, "Request payload: {payload}");
                }
            }
        }
    }

    pub fn info(&self, message: &str) {
        self.log(message, None, None);
    }
}

/// Render the main line of an entry, without the payload.
pub fn format_line(message: &str, context: Option<&RequestContext>) -> String {
    let mut line = format!("AppPricing: {message}");
    if let Some(context) = context {
        if let Some(annotation) = context.annotation() {
            line.push(' ');
            line.push_str(&annotation);
        }
        if let Some(text) = context.response_text.as_deref().filter(|t| !t.is_empty()) {
            line.push_str(" response=");
            line.push_str(text);
        }
    }
    line
}
