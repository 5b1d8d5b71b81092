//! A scripted in-memory page for exercising the flow without a browser.
#![allow(dead_code)]

use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use kite_autologin::page::PageDriver;

/// Shape and behavior of the fake page.
#[derive(Default)]
pub struct PageScript {
    /// Selectors that resolve to a fillable field.
    pub fillable: Vec<&'static str>,
    /// Selectors that resolve to a clickable control.
    pub clickable: Vec<&'static str>,
    /// Selectors whose probe errors out (stale element, bad selector).
    pub failing: Vec<&'static str>,
    /// Successive answers to `current_location`; the last one repeats.
    pub locations: Vec<&'static str>,
    /// Make `navigate` fail.
    pub fail_navigation: bool,
}

/// One recorded interaction with the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Navigate(String),
    Probe(String),
    Fill(String, String),
    Click(String),
    PressKey(String),
    NetworkIdle,
    Close,
}

pub struct ScriptedPage {
    script: PageScript,
    calls: Mutex<Vec<Call>>,
    location_cursor: Mutex<usize>,
}

impl ScriptedPage {
    pub fn new(script: PageScript) -> Self {
        Self {
            script,
            calls: Mutex::new(Vec::new()),
            location_cursor: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Selectors probed, in order, across fill and click attempts.
    pub fn probes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Probe(selector) => Some(selector),
                _ => None,
            })
            .collect()
    }

    /// Fields actually written, as (selector, value) pairs.
    pub fn fills(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Fill(selector, value) => Some((selector, value)),
                _ => None,
            })
            .collect()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Click(selector) => Some(selector),
                _ => None,
            })
            .collect()
    }

    pub fn key_presses(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::PressKey(key) => Some(key),
                _ => None,
            })
            .collect()
    }

    pub fn close_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Close))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PageDriver for ScriptedPage {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.record(Call::Navigate(url.to_string()));
        if self.script.fail_navigation {
            anyhow::bail!("net::ERR_CONNECTION_REFUSED");
        }
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<bool> {
        self.record(Call::Probe(selector.to_string()));
        if self.script.failing.contains(&selector) {
            return Err(anyhow!("stale element reference: {selector}"));
        }
        if self.script.fillable.contains(&selector) {
            self.record(Call::Fill(selector.to_string(), value.to_string()));
            return Ok(true);
        }
        Ok(false)
    }

    async fn click(&self, selector: &str) -> Result<bool> {
        self.record(Call::Probe(selector.to_string()));
        if self.script.failing.contains(&selector) {
            return Err(anyhow!("element not interactable: {selector}"));
        }
        if self.script.clickable.contains(&selector) {
            self.record(Call::Click(selector.to_string()));
            return Ok(true);
        }
        Ok(false)
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.record(Call::PressKey(key.to_string()));
        Ok(())
    }

    async fn current_location(&self) -> Result<String> {
        let locations = &self.script.locations;
        if locations.is_empty() {
            return Ok(String::new());
        }
        let mut cursor = self.location_cursor.lock().unwrap();
        let index = (*cursor).min(locations.len() - 1);
        *cursor += 1;
        Ok(locations[index].to_string())
    }

    async fn wait_for_network_idle(&self) -> Result<()> {
        self.record(Call::NetworkIdle);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.record(Call::Close);
        Ok(())
    }
}
