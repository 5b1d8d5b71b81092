//! Browser process lifecycle.
//!
//! Launches a local Chrome/Chromium over the DevTools protocol, pumps its
//! event stream on a background task, and tears everything down when the
//! session ends.

use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::page::CdpPage;

/// A running browser with one page, held for the duration of a session.
pub struct BrowserSession {
    browser: Browser,
    page: chromiumoxide::Page,
    handler_task: JoinHandle<()>,
}

impl BrowserSession {
    /// Launch the browser and open a blank page.
    pub async fn launch(headless: bool) -> Result<Self> {
        let chrome_path = find_chrome().context(
            "Chrome/Chromium not found. Install Chrome or Chromium to run the login flow.",
        )?;
        debug!(%chrome_path, headless, "Launching browser");

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .viewport(None)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--no-first-run")
            .arg("--no-default-browser-check");
        if !headless {
            builder = builder.with_head();
        }
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to configure browser: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("Failed to launch browser")?;

        let handler_task = tokio::spawn(async move { while (handler.next().await).is_some() {} });

        let page = browser
            .new_page("about:blank")
            .await
            .context("Failed to open a page")?;

        Ok(Self {
            browser,
            page,
            handler_task,
        })
    }

    /// Driver for the session's page.
    pub fn driver(&self) -> CdpPage {
        CdpPage::new(self.page.clone())
    }

    /// Tear down the browser process and its event pump.
    pub fn shutdown(self) {
        drop(self.browser);
        self.handler_task.abort();
    }
}

/// Find a Chrome/Chromium executable via `which` or well-known paths.
fn find_chrome() -> Option<String> {
    for name in ["google-chrome", "chromium"] {
        if let Ok(output) = Command::new("which").arg(name).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Some(path);
                }
            }
        }
    }

    let candidates = [
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // NixOS
        "/run/current-system/sw/bin/google-chrome",
        "/run/current-system/sw/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];

    candidates
        .iter()
        .find(|candidate| Path::new(candidate).exists())
        .map(|candidate| candidate.to_string())
}
