//! Process configuration, read once from the environment at startup.
//!
//! Every knob the flow needs is collected into an explicit [`Config`] that is
//! passed by reference; nothing reads the environment after startup. A `.env`
//! file in the working directory is honored when present (loaded in `main`
//! before this module runs).

use std::time::Duration;

use anyhow::{Context, Result};
use secrecy::SecretString;

use crate::duration::parse_duration;

const DEFAULT_LOGIN_URL: &str =
    "https://kite.zerodha.com/connect/login?v=3&api_key=tut3e5y01sw5fi4f";
const DEFAULT_OTP_WEBHOOK: &str = "https://n8n.sallytion.qzz.io/webhook/get-totp";
const DEFAULT_RESULT_WEBHOOK: &str = "https://n8n.sallytion.qzz.io/webhook-test/kite-auth";
const DEFAULT_REDIRECT_PREFIX: &str = "https://n8n.sallytion.qzz.io";

/// Named delays and bounds used by the flow.
///
/// The post-submit delay is a deliberate fixed pause: the OTP step has no
/// deterministic ready-signal, so the flow buffers rendering with a tunable
/// wait instead of a magic constant.
#[derive(Debug, Clone)]
pub struct TimingConfig {
    /// Bound on each individual OTP webhook request.
    pub otp_fetch_timeout: Duration,

    /// Pause before the single OTP retry attempt.
    pub otp_retry_delay: Duration,

    /// Render buffer between submitting credentials and requesting the OTP.
    pub post_submit_delay: Duration,

    /// Upper bound on waiting for the post-login redirect.
    pub redirect_timeout: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            otp_fetch_timeout: Duration::from_secs(15),
            otp_retry_delay: Duration::from_secs(2),
            post_submit_delay: Duration::from_millis(1500),
            redirect_timeout: Duration::from_secs(60),
        }
    }
}

/// Application configuration.
#[derive(Debug)]
pub struct Config {
    /// Login page the flow starts from.
    pub login_url: String,

    /// Endpoint that delivers the one-time password.
    pub otp_webhook: String,

    /// Result-posting endpoint. Declared by the deployment but not called
    /// anywhere in the flow.
    pub result_webhook: String,

    /// Expected leading portion of the post-login location.
    pub redirect_prefix: String,

    /// User identifier typed into the login form.
    pub user_id: String,

    /// Password typed into the login form. Never logged; the wrapper type
    /// redacts itself in Debug output.
    pub password: SecretString,

    /// Run the browser without a window. Enabled on CI.
    pub headless: bool,

    pub timing: TimingConfig,
}

impl Config {
    /// Read configuration from the process environment.
    ///
    /// Missing or empty `KITE_USER`/`KITE_PASSWORD` is a fatal startup
    /// condition; every other variable has a default.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but with an injectable variable lookup,
    /// so tests don't have to mutate process-global state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let user_id = non_empty(lookup("KITE_USER")).or_else(|| non_empty(lookup("KITE_USER_ID")));
        let password = non_empty(lookup("KITE_PASSWORD"));

        let (user_id, password) = match (user_id, password) {
            (Some(user_id), Some(password)) => (user_id, password),
            _ => anyhow::bail!(
                "Missing credentials: set KITE_USER and KITE_PASSWORD in the environment or .env"
            ),
        };

        let defaults = TimingConfig::default();
        let timing = TimingConfig {
            otp_fetch_timeout: duration_var(&lookup, "KITE_OTP_TIMEOUT", defaults.otp_fetch_timeout)?,
            otp_retry_delay: duration_var(
                &lookup,
                "KITE_OTP_RETRY_DELAY",
                defaults.otp_retry_delay,
            )?,
            post_submit_delay: duration_var(
                &lookup,
                "KITE_POST_SUBMIT_DELAY",
                defaults.post_submit_delay,
            )?,
            redirect_timeout: duration_var(
                &lookup,
                "KITE_REDIRECT_TIMEOUT",
                defaults.redirect_timeout,
            )?,
        };

        Ok(Self {
            login_url: lookup("KITE_LOGIN_URL").unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string()),
            otp_webhook: lookup("GET_OTP_WEBHOOK")
                .unwrap_or_else(|| DEFAULT_OTP_WEBHOOK.to_string()),
            result_webhook: lookup("POST_FINAL_WEBHOOK")
                .unwrap_or_else(|| DEFAULT_RESULT_WEBHOOK.to_string()),
            redirect_prefix: lookup("KITE_REDIRECT_PREFIX")
                .unwrap_or_else(|| DEFAULT_REDIRECT_PREFIX.to_string()),
            user_id,
            password: SecretString::from(password),
            headless: is_truthy(&lookup, "CI") || is_truthy(&lookup, "GITHUB_ACTIONS"),
            timing,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn is_truthy(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> bool {
    lookup(key).as_deref() == Some("true")
}

fn duration_var(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Result<Duration> {
    match lookup(key) {
        Some(raw) => {
            parse_duration(&raw).with_context(|| format!("Invalid duration in {key}: {raw:?}"))
        }
        None => Ok(default),
    }
}
