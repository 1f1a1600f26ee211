/// Tests for the AppPricing client lifecycle against an in-process mock backend.
///
/// The mock server plays both the AppPricing API and the geolocation service.
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use apppricing_sdk::*;

const API_KEY: &str = "test-key";
const DEVICE_ID: &str = "device-abc";

fn device() -> DeviceInfo {
    DeviceInfo {
        unique_id: DEVICE_ID.into(),
        fingerprint: Some("fp-123".into()),
        brand: "Google".into(),
        model: "Pixel 8".into(),
        os: "Android".into(),
        os_version: "14".into(),
        screen_width: 411.4,
        screen_height: 914.6,
        first_install_time: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
    }
}

fn sdk() -> AppPricing {
    let sdk = AppPricing::new(StaticDeviceInfo(device()));
    sdk.set_logging_enabled(false);
    sdk
}

fn options(server: &MockServer) -> SdkOptions {
    SdkOptions::default()
        .with_base_url(server.uri())
        .with_location_url(format!("{}/geo", server.uri()))
        .with_logging(false)
}

async fn mount_geo(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path("/geo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_registration(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path("/device-data"))
        .and(header("X-API-KEY", API_KEY))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({})))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/device-data/{DEVICE_ID}/increment-session")))
        .and(header("X-API-KEY", API_KEY))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({})))
        .mount(server)
        .await;
}

/// Initialize against a healthy backend located in France.
async fn initialized(server: &MockServer) -> AppPricing {
    mount_geo(server, json!({"country_code": "FR", "country": "France"})).await;
    mount_registration(server, 200).await;
    let sdk = sdk();
    assert!(sdk.initialize(API_KEY, Some(options(server))).await);
    sdk
}

async fn requests_to(server: &MockServer, p: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == p)
        .collect()
}

async fn registered_device(server: &MockServer) -> Value {
    let requests = requests_to(server, "/device-data").await;
    assert_eq!(requests.len(), 1);
    requests[0].body_json().unwrap()
}

struct FailingProvider;

#[async_trait]
impl DeviceInfoProvider for FailingProvider {
    async fn device_info(&self) -> Outcome<DeviceInfo> {
        Err(AppPricingError::DeviceInfo("permission denied".into()))
    }
}

/// A host provider that skips the id check `StaticDeviceInfo` performs.
struct EmptyIdProvider;

#[async_trait]
impl DeviceInfoProvider for EmptyIdProvider {
    async fn device_info(&self) -> Outcome<DeviceInfo> {
        Ok(DeviceInfo {
            unique_id: "  ".into(),
            ..device()
        })
    }
}

struct PanickingProvider;

#[async_trait]
impl DeviceInfoProvider for PanickingProvider {
    async fn device_info(&self) -> Outcome<DeviceInfo> {
        panic!("platform bridge crashed")
    }
}

// ---------------------------------------------------------------------------
// Initialization
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_initialize_registers_device_and_session() {
    let server = MockServer::start().await;
    let sdk = initialized(&server).await;

    assert!(sdk.is_initialized());
    assert_eq!(sdk.lifecycle(), Lifecycle::Initialized);
    assert_eq!(sdk.device_id().as_deref(), Some(DEVICE_ID));

    let body = registered_device(&server).await;
    assert_eq!(body["device_id"], DEVICE_ID);
    assert_eq!(body["hash"], "fp-123");
    assert_eq!(body["country"], "France");
    assert_eq!(body["region"], "unknown");
    assert_eq!(body["language"], "fr-FR");
    assert_eq!(body["first_seen"], "2024-01-02T03:04:05.000Z");
    assert_eq!(body["engagement_time"], 0);
    assert_eq!(body["session_count"], 1);
    assert_eq!(body["screen_width"], 411);
    assert_eq!(body["screen_height"], 915);

    let sessions =
        requests_to(&server, &format!("/device-data/{DEVICE_ID}/increment-session")).await;
    assert_eq!(sessions.len(), 1);
    assert!(sessions[0].body.is_empty());
}

#[tokio::test]
async fn test_initialize_with_empty_key_makes_no_calls() {
    let server = MockServer::start().await;
    let sdk = sdk();

    assert!(!sdk.initialize("", Some(options(&server))).await);
    assert!(!sdk.is_initialized());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_initialize_with_invalid_options_makes_no_calls() {
    let server = MockServer::start().await;
    let sdk = sdk();

    let bad = options(&server).with_base_url("not a url");
    assert!(!sdk.initialize(API_KEY, Some(bad)).await);
    assert_eq!(sdk.lifecycle(), Lifecycle::Uninitialized);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_second_initialize_short_circuits() {
    let server = MockServer::start().await;
    let sdk = initialized(&server).await;
    let before = server.received_requests().await.unwrap().len();

    assert!(sdk.initialize(API_KEY, Some(options(&server))).await);
    assert!(sdk.initialize("", None).await);
    assert_eq!(server.received_requests().await.unwrap().len(), before);
}

#[tokio::test]
async fn test_concurrent_initialize_runs_once() {
    let server = MockServer::start().await;
    mount_geo(&server, json!({"country_code": "US"})).await;
    Mock::given(method("POST"))
        .and(path("/device-data"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/device-data/{DEVICE_ID}/increment-session")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let sdk = sdk();
    let other = sdk.clone();
    let (a, b) = tokio::join!(
        sdk.initialize(API_KEY, Some(options(&server))),
        other.initialize(API_KEY, Some(options(&server))),
    );
    assert!(a && b);
    assert!(sdk.is_initialized());
    assert_eq!(requests_to(&server, "/geo").await.len(), 1);
}

#[tokio::test]
async fn test_location_failure_uses_defaults() {
    let server = MockServer::start().await;
    mount_registration(&server, 200).await;

    let sdk = sdk();
    // Nothing listens on port 1, so the geolocation call fails at the transport.
    let opts = options(&server).with_location_url("http://127.0.0.1:1/geo");
    assert!(sdk.initialize(API_KEY, Some(opts)).await);

    let body = registered_device(&server).await;
    assert_eq!(body["country"], "unknown");
    assert_eq!(body["region"], "unknown");
    assert_eq!(body["city"], "unknown");
    assert_eq!(body["timezone"], "UTC");
    assert_eq!(body["language"], "en-US");
}

#[tokio::test]
async fn test_location_error_status_uses_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geo"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_registration(&server, 200).await;

    let sdk = sdk();
    assert!(sdk.initialize(API_KEY, Some(options(&server))).await);
    let body = registered_device(&server).await;
    assert_eq!(body["language"], "en-US");
    assert_eq!(body["timezone"], "UTC");
}

#[tokio::test]
async fn test_unmapped_country_defaults_to_english() {
    let server = MockServer::start().await;
    mount_geo(&server, json!({"country_code": "ZZ", "timezone": "Etc/GMT+3"})).await;
    mount_registration(&server, 200).await;

    let sdk = sdk();
    assert!(sdk.initialize(API_KEY, Some(options(&server))).await);
    let body = registered_device(&server).await;
    assert_eq!(body["language"], "en-ZZ");
    assert_eq!(body["timezone"], "Etc/GMT+3");
}

#[tokio::test]
async fn test_prefer_server_language_policy() {
    let server = MockServer::start().await;
    mount_geo(&server, json!({"country_code": "CH", "language": "fr-CH"})).await;
    mount_registration(&server, 200).await;

    let sdk = sdk();
    let opts = options(&server).with_language_policy(LanguagePolicy::PreferServer);
    assert!(sdk.initialize(API_KEY, Some(opts)).await);
    assert_eq!(registered_device(&server).await["language"], "fr-CH");
}

#[tokio::test]
async fn test_registration_failures_are_not_fatal() {
    let server = MockServer::start().await;
    mount_geo(&server, json!({})).await;
    mount_registration(&server, 500).await;

    let sdk = sdk();
    assert!(sdk.initialize(API_KEY, Some(options(&server))).await);
    assert!(sdk.is_initialized());
}

#[tokio::test]
async fn test_device_info_failure_aborts_initialize() {
    let server = MockServer::start().await;
    let sdk = AppPricing::new(FailingProvider);
    sdk.set_logging_enabled(false);

    assert!(!sdk.initialize(API_KEY, Some(options(&server))).await);
    assert!(!sdk.is_initialized());
    assert_eq!(sdk.lifecycle(), Lifecycle::Uninitialized);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_provider_panic_is_contained() {
    let server = MockServer::start().await;
    let sdk = AppPricing::new(PanickingProvider);

    assert!(!sdk.initialize(API_KEY, Some(options(&server))).await);
    assert!(!sdk.is_initialized());
}

#[tokio::test]
async fn test_rejected_options_allow_retry() {
    let server = MockServer::start().await;
    mount_geo(&server, json!({})).await;
    mount_registration(&server, 200).await;

    let sdk = sdk();
    let bad = options(&server).with_location_url("file:///etc/hosts");
    assert!(!sdk.initialize(API_KEY, Some(bad)).await);
    assert!(sdk.initialize(API_KEY, Some(options(&server))).await);
}

#[tokio::test]
async fn test_reset_returns_to_uninitialized() {
    let server = MockServer::start().await;
    let sdk = initialized(&server).await;

    sdk.reset();
    assert!(!sdk.is_initialized());
    assert_eq!(sdk.device_id(), None);
    assert!(sdk.logging_enabled());
    assert!(!sdk.track_page_view("home", None).await);
}

async fn mount_slow_registration(server: &MockServer, delay: Duration) {
    Mock::given(method("POST"))
        .and(path("/device-data"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(delay),
        )
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/device-data/{DEVICE_ID}/increment-session")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_reset_during_initialize_discards_the_run() {
    let server = MockServer::start().await;
    mount_geo(&server, json!({"country_code": "FR"})).await;
    mount_slow_registration(&server, Duration::from_millis(300)).await;

    let sdk = sdk();
    let running = sdk.clone();
    let opts = options(&server);
    let handle = tokio::spawn(async move { running.initialize(API_KEY, Some(opts)).await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(sdk.lifecycle(), Lifecycle::Initializing);
    sdk.reset();

    assert!(!handle.await.unwrap());
    assert!(!sdk.is_initialized());
    assert_eq!(sdk.lifecycle(), Lifecycle::Uninitialized);
    assert_eq!(sdk.device_id(), None);
}

#[tokio::test]
async fn test_stale_run_leaves_newer_initialize_in_flight() {
    let server = MockServer::start().await;
    mount_geo(&server, json!({})).await;
    mount_slow_registration(&server, Duration::from_millis(300)).await;

    let sdk = sdk();
    let first = sdk.clone();
    let opts = options(&server);
    let stale = tokio::spawn(async move { first.initialize(API_KEY, Some(opts)).await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    sdk.reset();
    sdk.set_logging_enabled(false);

    let second = sdk.clone();
    let opts = options(&server);
    let fresh = tokio::spawn(async move { second.initialize(API_KEY, Some(opts)).await });

    // The stale run ends while the newer one is still registering.
    assert!(!stale.await.unwrap());
    assert_eq!(sdk.lifecycle(), Lifecycle::Initializing);

    // Joining must reuse the newer run rather than start a third one.
    assert!(sdk.initialize(API_KEY, Some(options(&server))).await);
    assert!(fresh.await.unwrap());
    assert!(sdk.is_initialized());
    assert_eq!(sdk.device_id().as_deref(), Some(DEVICE_ID));
    assert_eq!(requests_to(&server, "/device-data").await.len(), 2);
}

#[tokio::test]
async fn test_blank_device_id_aborts_initialize() {
    let server = MockServer::start().await;
    mount_geo(&server, json!({})).await;
    let sdk = AppPricing::new(EmptyIdProvider);
    sdk.set_logging_enabled(false);

    assert!(!sdk.initialize(API_KEY, Some(options(&server))).await);
    assert!(!sdk.is_initialized());
    assert_eq!(sdk.device_id(), None);

    assert!(sdk.get_available_plans().await.is_empty());
    assert!(!sdk.track_page_view("home", None).await);
    assert!(server.received_requests().await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Guarded operations before initialization
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_operations_before_initialize_make_no_calls() {
    let server = MockServer::start().await;
    let sdk = sdk();

    assert!(sdk.get_available_plans().await.is_empty());
    assert!(!sdk.track_page_view("home", None).await);
    assert!(!sdk.track_payment(&[PaymentInfo::new(9.99)]).await);
    assert!(!sdk.track_payment_records(&[json!({"amount": 9.99})]).await);
    assert!(server.received_requests().await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_get_available_plans() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/device-data/{DEVICE_ID}/plans")))
        .and(header("X-API-KEY", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "plans": [
                {"id": 1, "name": "Monthly", "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-02T00:00:00Z"},
                {"id": 2, "name": "Yearly", "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-02T00:00:00Z"}
            ]
        })))
        .mount(&server)
        .await;
    let sdk = initialized(&server).await;

    let plans = sdk.get_available_plans().await;
    assert_eq!(plans.len(), 2);
    assert_eq!(plans[0].id.as_deref(), Some("1"));
    assert_eq!(plans[1].name.as_deref(), Some("Yearly"));
}

#[tokio::test]
async fn test_plans_missing_field_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/device-data/{DEVICE_ID}/plans")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    let sdk = initialized(&server).await;
    assert!(sdk.get_available_plans().await.is_empty());
}

#[tokio::test]
async fn test_plans_failure_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/device-data/{DEVICE_ID}/plans")))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    let sdk = initialized(&server).await;
    assert!(sdk.get_available_plans().await.is_empty());
}

// ---------------------------------------------------------------------------
// Page views
// ---------------------------------------------------------------------------

async fn mount_ok(server: &MockServer, p: &str) {
    Mock::given(method("POST"))
        .and(path(p))
        .and(header("X-API-KEY", API_KEY))
        .and(header("Content-Type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_track_page_view_normalizes_timestamp() {
    let server = MockServer::start().await;
    mount_ok(&server, "/pages").await;
    let sdk = initialized(&server).await;

    let at = Timestamp::from("2024-05-06T09:08:09+02:00");
    assert!(sdk.track_page_view("paywall", Some(at)).await);

    let pages = requests_to(&server, "/pages").await;
    let body: Value = pages[0].body_json().unwrap();
    assert_eq!(
        body,
        json!({
            "device_id": DEVICE_ID,
            "page_name": "paywall",
            "visited_at": "2024-05-06T07:08:09.000Z"
        })
    );
}

#[tokio::test]
async fn test_track_page_view_defaults_to_now() {
    let server = MockServer::start().await;
    mount_ok(&server, "/pages").await;
    let sdk = initialized(&server).await;

    let before = Utc::now();
    assert!(sdk.track_page_view("home", None).await);
    let body: Value = requests_to(&server, "/pages").await[0].body_json().unwrap();
    let visited_at = chrono::DateTime::parse_from_rfc3339(body["visited_at"].as_str().unwrap())
        .unwrap()
        .with_timezone(&Utc);
    assert!(visited_at >= before - chrono::Duration::seconds(1));
}

#[tokio::test]
async fn test_track_page_view_rejects_bad_timestamp() {
    let server = MockServer::start().await;
    let sdk = initialized(&server).await;

    assert!(!sdk.track_page_view("home", Some("last tuesday".into())).await);
    assert!(requests_to(&server, "/pages").await.is_empty());
}

#[tokio::test]
async fn test_track_page_view_reports_server_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pages"))
        .respond_with(ResponseTemplate::new(422))
        .mount(&server)
        .await;
    let sdk = initialized(&server).await;
    assert!(!sdk.track_page_view("home", None).await);
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_track_payment_sends_normalized_records() {
    let server = MockServer::start().await;
    mount_ok(&server, "/payments").await;
    let sdk = initialized(&server).await;

    let paid_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let payments = [
        PaymentInfo::new(9.99)
            .with_type(PaymentType::NewSub)
            .with_product_id("pro_monthly")
            .with_currency("USD")
            .with_paid_at(paid_at),
        PaymentInfo::new(0.0).with_type(PaymentType::Trial),
    ];
    assert!(sdk.track_payment(&payments).await);

    let body: Value = requests_to(&server, "/payments").await[0].body_json().unwrap();
    assert_eq!(body["device_id"], DEVICE_ID);
    assert_eq!(body["payments"][0]["type"], "new_sub");
    assert_eq!(body["payments"][0]["amount"], 9.99);
    assert_eq!(body["payments"][0]["product_id"], "pro_monthly");
    assert_eq!(body["payments"][0]["paid_at"], "2024-03-01T12:00:00.000Z");
    assert_eq!(body["payments"][1]["type"], "trial");
    assert!(body["payments"][1]["paid_at"].is_null());
}

#[tokio::test]
async fn test_track_payment_rejects_empty_batch() {
    let server = MockServer::start().await;
    let sdk = initialized(&server).await;
    assert!(!sdk.track_payment(&[]).await);
    assert!(!sdk.track_payment_records(&[]).await);
    assert!(requests_to(&server, "/payments").await.is_empty());
}

#[tokio::test]
async fn test_track_payment_records_rejects_string_amount() {
    let server = MockServer::start().await;
    let sdk = initialized(&server).await;

    assert!(!sdk.track_payment_records(&[json!({"amount": "10"})]).await);
    assert!(requests_to(&server, "/payments").await.is_empty());
}

#[tokio::test]
async fn test_track_payment_records_rejects_unknown_type() {
    let server = MockServer::start().await;
    let sdk = initialized(&server).await;

    let records = [
        json!({"amount": 1.0, "type": "renewal"}),
        json!({"amount": 9.99, "type": "bogus"}),
    ];
    assert!(!sdk.track_payment_records(&records).await);
    assert!(requests_to(&server, "/payments").await.is_empty());
}

#[tokio::test]
async fn test_track_payment_records_accepts_valid_records() {
    let server = MockServer::start().await;
    mount_ok(&server, "/payments").await;
    let sdk = initialized(&server).await;

    let records = [json!({"amount": 19, "type": "upgrade", "paid_at": "2024-03-01"})];
    assert!(sdk.track_payment_records(&records).await);
    let body: Value = requests_to(&server, "/payments").await[0].body_json().unwrap();
    assert_eq!(body["payments"][0]["paid_at"], "2024-03-01T00:00:00.000Z");
    assert_eq!(body["payments"][0]["amount"], 19.0);
}

#[tokio::test]
async fn test_restricted_payment_policy() {
    let server = MockServer::start().await;
    mount_geo(&server, json!({})).await;
    mount_registration(&server, 200).await;
    mount_ok(&server, "/payments").await;

    let sdk = sdk();
    let policy = PaymentPolicy::Restricted(vec![PaymentType::NewSub, PaymentType::Renewal]);
    let opts = options(&server).with_payment_policy(policy);
    assert!(sdk.initialize(API_KEY, Some(opts)).await);

    assert!(!sdk.track_payment(&[PaymentInfo::new(5.0)]).await);
    assert!(
        !sdk
            .track_payment(&[PaymentInfo::new(5.0).with_type(PaymentType::Promo)])
            .await
    );
    assert!(requests_to(&server, "/payments").await.is_empty());

    assert!(
        sdk.track_payment(&[PaymentInfo::new(5.0).with_type(PaymentType::Renewal)])
            .await
    );
}
