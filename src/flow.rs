//! The login flow orchestrator.
//!
//! A linear state machine over a [`PageDriver`]: fill credentials, submit,
//! fetch the OTP, fill and submit it, then wait for the redirect to the
//! expected destination. Any failure drops into the absorbing `Failed`
//! state; the page is released unconditionally afterwards.

use std::time::Duration;

use secrecy::ExposeSecret;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::otp::OtpClient;
use crate::page::PageDriver;
use crate::resolver::{
    resolve_and_act, FieldAction, LOGIN_SUBMIT_LOCATORS, OTP_FIELD_LOCATORS, OTP_SUBMIT_LOCATORS,
    PASSWORD_LOCATORS, USER_ID_LOCATORS,
};

const LOCATION_POLL: Duration = Duration::from_millis(250);

/// Stages of the login flow, in order. `Failed` absorbs from any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Init,
    NavigatedToLogin,
    CredentialsFilled,
    LoginSubmitted,
    AwaitingOtp,
    OtpFetched,
    OtpFilled,
    OtpSubmitted,
    Completed,
    Failed,
}

/// Why a run ended in `Failed`.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("failed to open login page: {0}")]
    Navigation(anyhow::Error),
    #[error("OTP token not retrieved from webhook after two attempts")]
    OtpUnavailable,
    #[error("OTP token received but no OTP field matched on the page")]
    OtpFieldMissing,
    #[error("timed out waiting for redirect to {prefix}")]
    RedirectTimeout { prefix: String },
    #[error(transparent)]
    Page(#[from] anyhow::Error),
}

/// Terminal result of a run.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub final_location: String,
    pub success: bool,
}

/// Drives one login attempt from start to a terminal state.
pub struct LoginFlow<'a> {
    page: &'a dyn PageDriver,
    otp: &'a OtpClient,
    config: &'a Config,
    state: FlowState,
}

impl<'a> LoginFlow<'a> {
    pub fn new(page: &'a dyn PageDriver, otp: &'a OtpClient, config: &'a Config) -> Self {
        Self {
            page,
            otp,
            config,
            state: FlowState::Init,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Run the flow to `Completed` or `Failed`. Never returns an error;
    /// failures are logged with the stage that was reached.
    pub async fn run(&mut self) -> SessionOutcome {
        match self.drive().await {
            Ok(final_location) => {
                self.state = FlowState::Completed;
                info!(%final_location, "Login completed successfully");
                SessionOutcome {
                    final_location,
                    success: true,
                }
            }
            Err(err) => {
                let stage = self.state;
                self.state = FlowState::Failed;
                error!(?stage, error = %err, "Login flow failed");
                let final_location = self.page.current_location().await.unwrap_or_default();
                SessionOutcome {
                    final_location,
                    success: false,
                }
            }
        }
    }

    async fn drive(&mut self) -> Result<String, FlowError> {
        info!(url = %self.config.login_url, "Navigating to login page");
        self.page
            .navigate(&self.config.login_url)
            .await
            .map_err(FlowError::Navigation)?;
        self.enter(FlowState::NavigatedToLogin);

        let filled_user = resolve_and_act(
            self.page,
            USER_ID_LOCATORS,
            FieldAction::SetValue(&self.config.user_id),
        )
        .await;
        if !filled_user {
            warn!("Could not find user-id field; continuing (it may be pre-filled)");
        }

        let filled_password = resolve_and_act(
            self.page,
            PASSWORD_LOCATORS,
            FieldAction::SetValue(self.config.password.expose_secret()),
        )
        .await;
        if !filled_password {
            warn!("Could not find password field; continuing (it may be pre-filled)");
        }
        self.enter(FlowState::CredentialsFilled);

        self.submit(LOGIN_SUBMIT_LOCATORS).await?;
        self.enter(FlowState::LoginSubmitted);

        // The OTP step has no ready-signal; buffer its rendering.
        tokio::time::sleep(self.config.timing.post_submit_delay).await;
        self.enter(FlowState::AwaitingOtp);

        info!(webhook = %self.config.otp_webhook, "Requesting OTP from webhook");
        let token = self
            .otp
            .fetch_with_retry()
            .await
            .ok_or(FlowError::OtpUnavailable)?;
        self.enter(FlowState::OtpFetched);

        let filled_otp =
            resolve_and_act(self.page, OTP_FIELD_LOCATORS, FieldAction::SetValue(&token)).await;
        if !filled_otp {
            return Err(FlowError::OtpFieldMissing);
        }
        self.enter(FlowState::OtpFilled);

        self.submit(OTP_SUBMIT_LOCATORS).await?;
        self.enter(FlowState::OtpSubmitted);

        info!(prefix = %self.config.redirect_prefix, "Waiting for redirect to destination");
        let final_location = wait_for_destination(
            self.page,
            &self.config.redirect_prefix,
            self.config.timing.redirect_timeout,
        )
        .await?;

        Ok(final_location)
    }

    /// Click the first matching submit control, falling back to an Enter
    /// press in the current focus context. Submission is never skipped.
    async fn submit(&self, locators: &[&str]) -> Result<(), FlowError> {
        if !resolve_and_act(self.page, locators, FieldAction::Click).await {
            debug!("No submit button matched; pressing Enter");
            self.page.press_key("Enter").await?;
        }
        Ok(())
    }

    fn enter(&mut self, next: FlowState) {
        debug!(from = ?self.state, to = ?next, "Flow state transition");
        self.state = next;
    }
}

/// Poll the page location until it starts with `prefix`, then wait for the
/// destination page to finish loading. Elapsing `timeout` without a match is
/// fatal for the run.
pub async fn wait_for_destination(
    page: &dyn PageDriver,
    prefix: &str,
    timeout: Duration,
) -> Result<String, FlowError> {
    let start = Instant::now();

    loop {
        let location = page.current_location().await?;
        if location.starts_with(prefix) {
            page.wait_for_network_idle().await?;
            return Ok(location);
        }

        if start.elapsed() >= timeout {
            return Err(FlowError::RedirectTimeout {
                prefix: prefix.to_string(),
            });
        }

        tokio::time::sleep(LOCATION_POLL).await;
    }
}

/// Run a complete session: the flow, then the unconditional page release.
///
/// The release happens exactly once on every exit path, whether the flow
/// completed or failed.
pub async fn run_session(
    page: &dyn PageDriver,
    otp: &OtpClient,
    config: &Config,
) -> SessionOutcome {
    let mut flow = LoginFlow::new(page, otp, config);
    let outcome = flow.run().await;

    if let Err(err) = page.close().await {
        warn!(error = %err, "Failed to release page cleanly");
    }

    outcome
}
