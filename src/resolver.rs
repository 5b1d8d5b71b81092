//! Field resolution: probe an ordered locator list until one candidate acts.
//!
//! Each field role has its own priority-ordered selector list, most specific
//! first. Resolution is best-effort by design: a candidate that errors is
//! logged and skipped, and an exhausted list is a signal (`false`), not a
//! failure. Callers decide per field whether absence is tolerable.

use tracing::debug;

use crate::page::PageDriver;

/// Candidate selectors for the user-id field.
pub const USER_ID_LOCATORS: &[&str] = &[
    "#userid",
    "input#userid",
    "input[name='user_id']",
    "input[name='username']",
    "input[placeholder*='User']",
    "input[type='text']",
];

/// Candidate selectors for the password field.
pub const PASSWORD_LOCATORS: &[&str] = &[
    "#password",
    "input[type='password']",
    "input[name='password']",
    "input[placeholder*='Password']",
];

/// Candidate selectors for the login submit button.
pub const LOGIN_SUBMIT_LOCATORS: &[&str] =
    &["button[type='submit']", "input[type='submit']", "form button"];

/// Candidate selectors for the OTP field, ending in a generic fallback.
pub const OTP_FIELD_LOCATORS: &[&str] = &[
    "input[name='otp']",
    "input[autocomplete='one-time-code']",
    "input[type='tel']",
    "input[placeholder*='PIN']",
    "input[placeholder*='OTP']",
    "input",
];

/// Candidate selectors for the OTP submit button.
pub const OTP_SUBMIT_LOCATORS: &[&str] =
    &["button[type='submit']", "input[type='submit']", "form button"];

/// What to do with the first locator that resolves.
#[derive(Debug, Clone, Copy)]
pub enum FieldAction<'a> {
    SetValue(&'a str),
    Click,
}

/// Probe `locators` in priority order and apply `action` to the first match.
///
/// Returns `true` as soon as one candidate acts; later candidates are never
/// probed. A candidate that errors (stale, not interactable, bad selector)
/// counts as a non-match. Returns `false` when the list is exhausted.
pub async fn resolve_and_act(
    page: &dyn PageDriver,
    locators: &[&str],
    action: FieldAction<'_>,
) -> bool {
    for locator in locators {
        let outcome = match action {
            FieldAction::SetValue(value) => page.fill(locator, value).await,
            FieldAction::Click => page.click(locator).await,
        };
        match outcome {
            Ok(true) => return true,
            Ok(false) => {}
            Err(err) => {
                debug!(locator, error = %err, "locator probe failed; trying next candidate");
            }
        }
    }
    false
}
