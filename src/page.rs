//! Browser page abstraction for the merge workflow.
//!
//! The driver only talks to the CRM through the [`CrmPage`] trait, so the
//! workflow state machine can be exercised in tests with a scripted fake
//! instead of a real Chrome tab. Locators starting with `//` are treated
//! as XPath; everything else is CSS. XPath is needed where the workflow
//! must match on visible text (dropdown entries, dialog buttons and the
//! completion marker).

use std::sync::Arc;
use std::time::Duration;

use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Element, Tab};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum PageError {
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("element '{locator}' did not become visible within {waited:?}: {reason}")]
    NotFound {
        locator: String,
        waited: Duration,
        reason: String,
    },

    #[error("action on '{locator}' failed: {reason}")]
    Action { locator: String, reason: String },

    #[error("browser backend error: {reason}")]
    Backend { reason: String },
}

/// The slice of browser behaviour the merge workflow needs.
///
/// All waits are blocking with a bounded timeout; there is no cancellation.
pub trait CrmPage {
    /// Navigate to a URL and wait for the navigation to complete.
    fn goto(&self, url: &str) -> Result<(), PageError>;

    /// Poll until the element is present and visible, bounded by `timeout`.
    fn wait_visible(&self, locator: &str, timeout: Duration) -> Result<(), PageError>;

    /// Wait for the element (bounded by `timeout`), then click it.
    fn click(&self, locator: &str, timeout: Duration) -> Result<(), PageError>;

    /// Wait for the element (bounded by `timeout`), click it and type text into it.
    fn type_text(&self, locator: &str, text: &str, timeout: Duration) -> Result<(), PageError>;

    /// Press a key (e.g. "Enter", "Backspace") on the focused element.
    fn press_key(&self, key: &str) -> Result<(), PageError>;

    /// Capture a full-page PNG screenshot.
    fn screenshot(&self) -> Result<Vec<u8>, PageError>;
}

/// Production [`CrmPage`] backed by a headless Chrome tab.
pub struct ChromeTab {
    tab: Arc<Tab>,
}

impl ChromeTab {
    pub fn new(tab: Arc<Tab>) -> Self {
        Self { tab }
    }

    /// Resolve a locator to an element, polling until visible or timeout.
    fn element(&self, locator: &str, timeout: Duration) -> Result<Element<'_>, PageError> {
        let result = if locator.starts_with("//") {
            self.tab.wait_for_xpath_with_custom_timeout(locator, timeout)
        } else {
            self.tab.wait_for_element_with_custom_timeout(locator, timeout)
        };
        result.map_err(|e| PageError::NotFound {
            locator: locator.to_string(),
            waited: timeout,
            reason: e.to_string(),
        })
    }
}

impl CrmPage for ChromeTab {
    fn goto(&self, url: &str) -> Result<(), PageError> {
        debug!("navigating to {}", url);
        self.tab
            .navigate_to(url)
            .map_err(|e| PageError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| PageError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    fn wait_visible(&self, locator: &str, timeout: Duration) -> Result<(), PageError> {
        self.element(locator, timeout).map(|_| ())
    }

    fn click(&self, locator: &str, timeout: Duration) -> Result<(), PageError> {
        let element = self.element(locator, timeout)?;
        element.click().map_err(|e| PageError::Action {
            locator: locator.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    fn type_text(&self, locator: &str, text: &str, timeout: Duration) -> Result<(), PageError> {
        let element = self.element(locator, timeout)?;
        element
            .click()
            .and_then(|el| el.type_into(text))
            .map_err(|e| PageError::Action {
                locator: locator.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    fn press_key(&self, key: &str) -> Result<(), PageError> {
        self.tab.press_key(key).map_err(|e| PageError::Backend {
            reason: format!("press '{}' failed: {}", key, e),
        })?;
        Ok(())
    }

    fn screenshot(&self) -> Result<Vec<u8>, PageError> {
        self.tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| PageError::Backend {
                reason: format!("screenshot capture failed: {}", e),
            })
    }
}
