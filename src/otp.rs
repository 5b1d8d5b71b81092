//! One-time password retrieval from the delivery webhook.
//!
//! The webhook responds with JSON carrying the token under one of several
//! field names. Transport failures are logged and swallowed; the caller only
//! ever sees `Some(token)` or `None`.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

/// Accepted webhook response shapes.
///
/// Precedence is `token`, `otp`, then the upper-case variants as fallbacks.
#[derive(Debug, Default, Deserialize)]
pub struct OtpResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    otp: Option<String>,
    #[serde(default, rename = "TOKEN")]
    token_upper: Option<String>,
    #[serde(default, rename = "OTP")]
    otp_upper: Option<String>,
}

impl OtpResponse {
    /// First non-empty accepted field, in precedence order.
    fn into_token(self) -> Option<String> {
        [self.token, self.otp, self.token_upper, self.otp_upper]
            .into_iter()
            .flatten()
            .find(|token| !token.is_empty())
    }
}

/// Client for the OTP delivery webhook.
pub struct OtpClient {
    client: reqwest::Client,
    endpoint: String,
    retry_delay: Duration,
}

impl OtpClient {
    /// Build a client whose requests are bounded by `timeout`.
    pub fn new(endpoint: impl Into<String>, timeout: Duration, retry_delay: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            retry_delay,
        })
    }

    /// Issue a single request for a token.
    ///
    /// Network failures, non-success statuses, and bodies without a usable
    /// field all yield `None`.
    pub async fn fetch_token(&self) -> Option<String> {
        match self.request().await {
            Ok(Some(token)) => Some(token),
            Ok(None) => {
                warn!("OTP webhook responded without a usable token field");
                None
            }
            Err(err) => {
                warn!(error = %err, "Failed to fetch OTP from webhook");
                None
            }
        }
    }

    /// The fixed two-attempt policy: one request, and on a miss exactly one
    /// retry after a short pause. Never more.
    pub async fn fetch_with_retry(&self) -> Option<String> {
        if let Some(token) = self.fetch_token().await {
            return Some(token);
        }

        info!(
            delay_ms = self.retry_delay.as_millis() as u64,
            "No token received yet; retrying once after short wait"
        );
        tokio::time::sleep(self.retry_delay).await;
        self.fetch_token().await
    }

    async fn request(&self) -> Result<Option<String>> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .context("OTP webhook request failed")?
            .error_for_status()
            .context("OTP webhook returned an error status")?;

        let body: OtpResponse = response
            .json()
            .await
            .context("Failed to decode OTP webhook response")?;

        Ok(body.into_token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> OtpResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn token_takes_precedence_over_otp() {
        let body = response(r#"{"token":"111111","otp":"222222"}"#);
        assert_eq!(body.into_token().as_deref(), Some("111111"));
    }

    #[test]
    fn lower_case_fields_win_over_upper_case() {
        let body = response(r#"{"OTP":"999999","otp":"888888"}"#);
        assert_eq!(body.into_token().as_deref(), Some("888888"));

        let body = response(r#"{"TOKEN":"333333","OTP":"444444"}"#);
        assert_eq!(body.into_token().as_deref(), Some("333333"));
    }

    #[test]
    fn empty_fields_are_skipped() {
        let body = response(r#"{"token":"","otp":"654321"}"#);
        assert_eq!(body.into_token().as_deref(), Some("654321"));
    }

    #[test]
    fn empty_body_yields_nothing() {
        assert_eq!(response("{}").into_token(), None);
    }
}
