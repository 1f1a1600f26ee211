/// Quickstart example: minimal end-to-end AppPricing flow.
///
/// Demonstrates: describe the device, initialize, fetch plans, track a page
/// view, track a payment.
///
/// Run with: APPPRICING_API_KEY=... cargo run --example quickstart
use apppricing_sdk::{
    AppPricing, DeviceInfo, PaymentInfo, PaymentType, SdkOptions, StaticDeviceInfo,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let api_key = std::env::var("APPPRICING_API_KEY")?;

    // 1. Describe the device (a real host reads these from the platform)
    let device = DeviceInfo {
        unique_id: "quickstart-device-0001".into(),
        fingerprint: None,
        brand: "Framework".into(),
        model: "Laptop 13".into(),
        os: std::env::consts::OS.into(),
        os_version: "unknown".into(),
        screen_width: 2256.0,
        screen_height: 1504.0,
        first_install_time: chrono::Utc::now(),
    };
    let sdk = AppPricing::new(StaticDeviceInfo(device));

    // 2. Initialize (registers the device and counts a session)
    println!("Initializing...");
    let options = SdkOptions::default().with_logging(true);
    if !sdk.initialize(&api_key, Some(options)).await {
        println!("Initialization failed.");
        return Ok(());
    }
    println!("Device id: {}", sdk.device_id().unwrap_or_default());

    // 3. Fetch plans
    let plans = sdk.get_available_plans().await;
    println!("Available plans:");
    for plan in &plans {
        println!(
            "  {} ({})",
            plan.name.as_deref().unwrap_or("?"),
            plan.id.as_deref().unwrap_or("?")
        );
    }

    // 4. Track a page view
    let tracked = sdk.track_page_view("quickstart", None).await;
    println!("\nPage view tracked: {tracked}");

    // 5. Track a payment
    let payment = PaymentInfo::new(4.99)
        .with_type(PaymentType::Trial)
        .with_product_id("pro_monthly")
        .with_currency("USD")
        .with_paid_at(chrono::Utc::now());
    let tracked = sdk.track_payment(&[payment]).await;
    println!("Payment tracked: {tracked}");

    println!("\nQuickstart complete!");
    Ok(())
}
