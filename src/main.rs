use anyhow::Result;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kite_autologin::browser::BrowserSession;
use kite_autologin::config::Config;
use kite_autologin::flow::run_session;
use kite_autologin::otp::OtpClient;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Config::from_env()?;
    debug!(
        result_webhook = %config.result_webhook,
        "Result webhook configured (not called by the flow)"
    );

    let otp = OtpClient::new(
        config.otp_webhook.clone(),
        config.timing.otp_fetch_timeout,
        config.timing.otp_retry_delay,
    )?;

    let session = BrowserSession::launch(config.headless).await?;
    let page = session.driver();

    let outcome = run_session(&page, &otp, &config).await;

    info!(
        final_location = %outcome.final_location,
        success = outcome.success,
        "Done; closing browser"
    );
    session.shutdown();

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "info,chromiumoxide=warn,chromiumoxide::conn=off,chromiumoxide::handler=off",
            )
        }))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .init();
}
