//! The browser page surface the flow drives.
//!
//! The orchestrator never touches the CDP connection directly; it consumes
//! the [`PageDriver`] trait so tests can substitute a scripted page. The
//! production implementation wraps a `chromiumoxide` page.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::Page;
use tracing::debug;

const IDLE_POLL: Duration = Duration::from_millis(250);
const IDLE_QUIET: Duration = Duration::from_millis(1000);
const IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimal surface of a browser page.
///
/// Probe methods (`fill`, `click`) report element absence as `Ok(false)`
/// rather than an error; an `Err` means the candidate was found or queried
/// but the interaction itself failed. Callers treat both as a non-match.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to `url` and wait for the page to settle.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Set the value of the first element matching `selector`.
    async fn fill(&self, selector: &str, value: &str) -> Result<bool>;

    /// Click the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<bool>;

    /// Synthesize a key press in the current focus context.
    async fn press_key(&self, key: &str) -> Result<()>;

    /// Current location of the page, empty when not yet known.
    async fn current_location(&self) -> Result<String>;

    /// Wait until no network activity has been observed for a short window.
    ///
    /// Bounded internally; a page that never settles is tolerated.
    async fn wait_for_network_idle(&self) -> Result<()>;

    /// Release the page. Called exactly once at the end of a run.
    async fn close(&self) -> Result<()>;
}

/// [`PageDriver`] backed by a Chrome DevTools Protocol page.
pub struct CdpPage {
    page: Page,
}

impl CdpPage {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    async fn resource_count(&self) -> u64 {
        self.page
            .evaluate("performance.getEntriesByType('resource').length")
            .await
            .ok()
            .and_then(|v| v.into_value::<serde_json::Value>().ok())
            .and_then(|j| j.as_u64())
            .unwrap_or(0)
    }

    async fn document_complete(&self) -> bool {
        self.page
            .evaluate("document.readyState")
            .await
            .ok()
            .and_then(|v| v.into_value::<serde_json::Value>().ok())
            .and_then(|j| j.as_str().map(|s| s == "complete"))
            .unwrap_or(false)
    }
}

#[async_trait]
impl PageDriver for CdpPage {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .with_context(|| format!("Failed to navigate to {url}"))?;
        self.page
            .wait_for_navigation()
            .await
            .context("Navigation did not complete")?;
        self.wait_for_network_idle().await
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<bool> {
        let element = match self.page.find_element(selector).await {
            Ok(element) => element,
            Err(_) => return Ok(false),
        };
        element
            .click()
            .await
            .with_context(|| format!("Failed to focus element {selector}"))?;
        element
            .type_str(value)
            .await
            .with_context(|| format!("Failed to type into element {selector}"))?;
        Ok(true)
    }

    async fn click(&self, selector: &str) -> Result<bool> {
        let element = match self.page.find_element(selector).await {
            Ok(element) => element,
            Err(_) => return Ok(false),
        };
        element
            .click()
            .await
            .with_context(|| format!("Failed to click element {selector}"))?;
        Ok(true)
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        let mut down = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyDown)
            .key(key.to_string());
        if key == "Enter" {
            // Without the carriage return Chrome will not submit forms.
            down = down.text("\r".to_string());
        }
        let down = down
            .build()
            .map_err(|e| anyhow::anyhow!("Invalid key event: {e}"))?;
        self.page.execute(down).await?;

        let up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .key(key.to_string())
            .build()
            .map_err(|e| anyhow::anyhow!("Invalid key event: {e}"))?;
        self.page.execute(up).await?;
        Ok(())
    }

    async fn current_location(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn wait_for_network_idle(&self) -> Result<()> {
        let start = Instant::now();
        let mut last_count = self.resource_count().await;
        let mut quiet_since = Instant::now();

        loop {
            if start.elapsed() >= IDLE_TIMEOUT {
                debug!("network idle wait timed out; continuing");
                return Ok(());
            }

            tokio::time::sleep(IDLE_POLL).await;

            let count = self.resource_count().await;
            if !self.document_complete().await || count != last_count {
                last_count = count;
                quiet_since = Instant::now();
            } else if quiet_since.elapsed() >= IDLE_QUIET {
                return Ok(());
            }
        }
    }

    async fn close(&self) -> Result<()> {
        self.page
            .clone()
            .close()
            .await
            .context("Failed to close page")?;
        Ok(())
    }
}
