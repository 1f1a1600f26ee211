//! AppPricing SDK for Rust.
//!
//! A client for the AppPricing analytics and pricing service: registers the
//! device, counts sessions, tracks page views and payments, and fetches the
//! pricing plans offered to the device.
//!
//! # What This SDK Provides
//!
//! - High-level client with an initialization lifecycle: [`AppPricing`]
//! - Typed REST API access: [`api::AppPricingApi`]
//! - A host-implemented seam for device attributes: [`DeviceInfoProvider`]
//! - Best-effort geolocation and language inference: [`location`]
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use apppricing_sdk::{AppPricing, DeviceInfo, PaymentInfo, PaymentType, StaticDeviceInfo};
//!
//! #[tokio::main]
//! async fn main() {
//!     let device = DeviceInfo {
//!         unique_id: "4f1c2a9e".into(),
//!         fingerprint: None,
//!         brand: "Apple".into(),
//!         model: "MacBookPro18,3".into(),
//!         os: "macOS".into(),
//!         os_version: "14.5".into(),
//!         screen_width: 1512.0,
//!         screen_height: 982.0,
//!         first_install_time: chrono::Utc::now(),
//!     };
//!     let sdk = AppPricing::new(StaticDeviceInfo(device));
//!
//!     if !sdk.initialize("your-api-key", None).await {
//!         return;
//!     }
//!
//!     let plans = sdk.get_available_plans().await;
//!     println!("{} plans available", plans.len());
//!
//!     sdk.track_page_view("paywall", None).await;
//!     sdk.track_payment(&[PaymentInfo::new(9.99).with_type(PaymentType::NewSub)])
//!         .await;
//! }
//! ```
//!
//! # Lifecycle
//!
//! 1. Create an [`AppPricing`] with a [`DeviceInfoProvider`] (or use
//!    [`AppPricing::shared`] for a process-wide instance).
//! 2. Call [`AppPricing::initialize`] once with your API key. Registration and
//!    session counting are best-effort: a flaky backend does not block it.
//! 3. Use [`AppPricing::get_available_plans`], [`AppPricing::track_page_view`]
//!    and [`AppPricing::track_payment`]. Before initialization they return
//!    an empty list / `false` without any network call.
//!
//! # Logging
//!
//! Diagnostics go through the [`log`](https://docs.rs/log/) facade under the
//! `apppricing` target: info for normal flow, error for failures. They can
//! be silenced with [`SdkOptions::with_logging`] or
//! [`AppPricing::set_logging_enabled`]. Internal request flow is emitted at
//! debug level; set `RUST_LOG=debug` to inspect it.
//!
//! # Errors
//!
//! The public client never returns errors. Internally every failure is an
//! [`AppPricingError`]; use [`api::AppPricingApi`] directly if you need them.
pub mod api;
pub mod client;
pub mod config;
pub mod device;
pub mod errors;
pub mod http;
pub mod location;
pub mod logger;
pub mod models;
pub mod payments;
pub mod state;

// Re-export primary types for convenience.
pub use client::AppPricing;
pub use config::{LanguagePolicy, PaymentPolicy, SdkOptions, DEFAULT_BASE_URL, DEFAULT_LOCATION_URL};
pub use device::{DeviceInfo, DeviceInfoProvider, StaticDeviceInfo};
pub use errors::{AppPricingError, Outcome};
pub use logger::{Logger, RequestContext};
pub use models::*;
pub use state::Lifecycle;
