/// High-level AppPricing client.
///
/// This is the primary entry point for SDK users. It owns the SDK state,
/// runs the initialization sequence (device collection, geolocation,
/// registration, session count) and guards every tracking call behind it.
///
/// No method here returns an error: failures are logged and reported as
/// `false` or an empty list.
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{
    Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use chrono::Utc;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use log::debug;

use crate::api::AppPricingApi;
use crate::config::{LanguagePolicy, PaymentPolicy, SdkOptions};
use crate::device::{build_device_data, DeviceInfoProvider};
use crate::errors::{AppPricingError, Outcome};
use crate::http::HttpClient;
use crate::location::LocationEnricher;
use crate::logger::Logger;
use crate::models::*;
use crate::payments::{iso8601, payments_from_values, validate_payments};
use crate::state::{Lifecycle, SdkState};

type InitFlight = Shared<BoxFuture<'static, bool>>;

/// A running initialization and the state generation it belongs to.
#[derive(Clone)]
struct Flight {
    generation: u64,
    future: InitFlight,
}

struct Inner {
    state: RwLock<SdkState>,
    in_flight: Mutex<Option<Flight>>,
    provider: Arc<dyn DeviceInfoProvider>,
    http: HttpClient,
    logger: Logger,
}

/// What a tracking call needs from an initialized state.
struct Ready {
    api: AppPricingApi,
    device_id: String,
    payment_policy: PaymentPolicy,
}

static SHARED: OnceLock<AppPricing> = OnceLock::new();

/// The AppPricing SDK handle. Clones share the same state.
#[derive(Clone)]
pub struct AppPricing {
    inner: Arc<Inner>,
}

impl fmt::Debug for AppPricing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.read_state();
        f.debug_struct("AppPricing")
            .field("lifecycle", &state.lifecycle())
            .field("base_url", &state.base_url)
            .field("device_id", &state.device_id)
            .finish()
    }
}

impl AppPricing {
    /// Create a new SDK instance reading device attributes from `provider`.
    pub fn new(provider: impl DeviceInfoProvider + 'static) -> Self {
        Self::with_http_client(Arc::new(provider), reqwest::Client::new())
    }

    /// Create a new SDK instance with a preconfigured reqwest client.
    pub fn with_http_client(
        provider: Arc<dyn DeviceInfoProvider>,
        client: reqwest::Client,
    ) -> Self {
        let logger = Logger::default();
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(SdkState::new(logger.clone())),
                in_flight: Mutex::new(None),
                provider,
                http: HttpClient::with_client(client, logger.clone()),
                logger,
            }),
        }
    }

    /// The process-wide default instance.
    ///
    /// The first call creates it with `provider`; later calls return the same
    /// instance and drop their provider.
    pub fn shared<P: DeviceInfoProvider + 'static>(provider: P) -> &'static AppPricing {
        SHARED.get_or_init(|| AppPricing::new(provider))
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Initialize the SDK with your API key and optional configuration.
    ///
    /// Returns `true` once the SDK is ready. Calling it again after success
    /// returns `true` without touching the network. Concurrent calls share a
    /// single run and all receive its outcome.
    pub async fn initialize(&self, api_key: &str, options: Option<SdkOptions>) -> bool {
        let flight = {
            let mut slot = self.inner.lock_in_flight();
            if self.inner.read_state().is_initialized() {
                return true;
            }
            match slot.clone() {
                Some(flight) => {
                    debug!(
                        "client.initialize joining in-flight initialization generation={}",
                        flight.generation
                    );
                    flight.future
                }
                None => {
                    if api_key.trim().is_empty() {
                        self.inner
                            .logger
                            .log(&AppPricingError::MissingApiKey.to_string(), None, None);
                        return false;
                    }
                    let options = match options.unwrap_or_default().validate() {
                        Ok(options) => options,
                        Err(e) => {
                            self.inner
                                .logger
                                .log("Invalid configuration", Some(&e), None);
                            return false;
                        }
                    };
                    if options.initialized.is_some() {
                        debug!("client.initialize ignoring initialized option");
                    }
                    let generation = self.inner.write_state().begin_initializing();

                    let inner = Arc::clone(&self.inner);
                    let api_key = api_key.to_string();
                    let future = async move {
                        let run =
                            AssertUnwindSafe(inner.run_initialize(&api_key, options, generation));
                        let succeeded = match run.catch_unwind().await {
                            Ok(succeeded) => succeeded,
                            Err(_) => {
                                inner.logger.log(
                                    "Initialization failed",
                                    Some(&"panic during initialization"),
                                    None,
                                );
                                false
                            }
                        };
                        inner.finish_flight(generation, succeeded)
                    }
                    .boxed()
                    .shared();
                    *slot = Some(Flight {
                        generation,
                        future: future.clone(),
                    });
                    future
                }
            }
        };
        flight.await
    }

    /// Restore the default, uninitialized state.
    ///
    /// An initialization still running when this is called reports `false`
    /// and leaves the reset state untouched.
    pub fn reset(&self) {
        let mut slot = self.inner.lock_in_flight();
        slot.take();
        self.inner.write_state().reset();
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.read_state().is_initialized()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.read_state().lifecycle()
    }

    /// The registered device id, once device collection has run.
    pub fn device_id(&self) -> Option<String> {
        let state = self.inner.read_state();
        (!state.device_id.is_empty()).then(|| state.device_id.clone())
    }

    pub fn logging_enabled(&self) -> bool {
        self.inner.logger.is_enabled()
    }

    pub fn set_logging_enabled(&self, enabled: bool) {
        self.inner.logger.set_enabled(enabled);
    }

    // -----------------------------------------------------------------------
    // Plans
    // -----------------------------------------------------------------------

    /// Plans available to this device. Empty when not initialized or on failure.
    pub async fn get_available_plans(&self) -> Vec<Plan> {
        let Some(ready) = self.ready() else {
            return Vec::new();
        };
        ready
            .api
            .get_plans(&ready.device_id)
            .await
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Tracking
    // -----------------------------------------------------------------------

    /// Record a page view. `visited_at` defaults to now.
    pub async fn track_page_view(&self, page_name: &str, visited_at: Option<Timestamp>) -> bool {
        let Some(ready) = self.ready() else {
            return false;
        };
        let visited_at = match visited_at.map(|at| at.to_iso8601()).transpose() {
            Ok(at) => at.unwrap_or_else(|| iso8601(Utc::now())),
            Err(e) => {
                self.inner
                    .logger
                    .log("Invalid page view timestamp", Some(&e), None);
                return false;
            }
        };
        let payload = PageViewPayload {
            device_id: ready.device_id,
            page_name: page_name.to_string(),
            visited_at,
        };
        ready.api.track_page_view(&payload).await.is_ok()
    }

    /// Record one or more payments. Every payment is validated before sending.
    pub async fn track_payment(&self, payments: &[PaymentInfo]) -> bool {
        let Some(ready) = self.ready() else {
            return false;
        };
        self.send_payments(ready, payments).await
    }

    /// Like [`AppPricing::track_payment`], for untyped JSON payment records.
    pub async fn track_payment_records(&self, records: &[serde_json::Value]) -> bool {
        let Some(ready) = self.ready() else {
            return false;
        };
        match payments_from_values(records) {
            Ok(payments) => self.send_payments(ready, &payments).await,
            Err(e) => {
                self.inner.logger.log("Invalid payment data", Some(&e), None);
                false
            }
        }
    }

    async fn send_payments(&self, ready: Ready, payments: &[PaymentInfo]) -> bool {
        let records = match validate_payments(payments, &ready.payment_policy) {
            Ok(records) => records,
            Err(e) => {
                self.inner.logger.log("Invalid payment data", Some(&e), None);
                return false;
            }
        };
        let payload = PaymentPayload {
            device_id: ready.device_id,
            payments: records,
        };
        ready.api.send_payments(&payload).await.is_ok()
    }

    /// Snapshot what tracking calls need, or log and return `None`.
    fn ready(&self) -> Option<Ready> {
        let ready = {
            let state = self.inner.read_state();
            state.is_ready().then(|| Ready {
                api: AppPricingApi::new(self.inner.http.clone(), state.credentials()),
                device_id: state.device_id.clone(),
                payment_policy: state.payment_policy.clone(),
            })
        };
        if ready.is_none() {
            self.inner
                .logger
                .log("SDK not initialized or deviceId missing", None, None);
        }
        ready
    }
}

impl Inner {
    fn read_state(&self) -> RwLockReadGuard<'_, SdkState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SdkState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<Flight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access, only while no reset has happened since `generation`.
    fn write_current(&self, generation: u64) -> Option<RwLockWriteGuard<'_, SdkState>> {
        let state = self.write_state();
        (state.generation() == generation).then_some(state)
    }

    /// Settle a finished run. Stale runs neither latch nor touch a newer slot.
    fn finish_flight(&self, generation: u64, succeeded: bool) -> bool {
        let mut slot = self.lock_in_flight();
        let Some(mut state) = self.write_current(generation) else {
            debug!("client.finish_flight stale generation={}", generation);
            return false;
        };
        state.finish_initializing(succeeded);
        if succeeded {
            self.logger.log("Successfully initialized", None, None);
        }
        if slot.as_ref().is_some_and(|f| f.generation == generation) {
            slot.take();
        }
        succeeded
    }

    async fn run_initialize(&self, api_key: &str, options: SdkOptions, generation: u64) -> bool {
        let (credentials, location_url, language_policy) = {
            let Some(mut state) = self.write_current(generation) else {
                return false;
            };
            state.apply(options, api_key);
            (
                state.credentials(),
                state.location_url.clone(),
                state.language_policy,
            )
        };
        debug!(
            "client.run_initialize base_url={} location_url={}",
            credentials.base_url, location_url
        );

        let device = match self.collect_device_data(&location_url, language_policy).await {
            Ok(device) => device,
            Err(e) => {
                self.logger
                    .log("Error during initialization", Some(&e), None);
                return false;
            }
        };
        match self.write_current(generation) {
            Some(mut state) => state.device_id = device.device_id.clone(),
            None => return false,
        }

        let api = AppPricingApi::new(self.http.clone(), credentials);
        if let Err(e) = api.send_device_data(&device).await {
            self.logger.log(
                "Failed to send device data, but continuing initialization",
                Some(&e),
                None,
            );
        }
        if let Err(e) = api.increment_session(&device.device_id).await {
            self.logger.log(
                "Failed to increment session, but continuing initialization",
                Some(&e),
                None,
            );
        }

        true
    }

    async fn collect_device_data(
        &self,
        location_url: &str,
        language_policy: LanguagePolicy,
    ) -> Outcome<DeviceData> {
        let info = self.provider.device_info().await?;
        if info.unique_id.trim().is_empty() {
            return Err(AppPricingError::DeviceInfo("unique id is empty".into()));
        }
        let enrichment = LocationEnricher::new(self.http.clone(), location_url, language_policy)
            .enrich()
            .await;
        Ok(build_device_data(&info, enrichment, Utc::now()))
    }
}
