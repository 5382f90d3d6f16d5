//! Merge workflow driver.
//!
//! Owns the authenticated browser session and runs the per-company merge
//! sequence: navigate to contacts, filter by company name, select all
//! matching rows, merge through the bulk-actions menu, confirm, and wait
//! for the completion marker. Each company is best-effort: a failure is
//! logged, a diagnostic screenshot is captured, and the run continues with
//! the next company. Only a login failure aborts the run.
//!
//! Every wait is a bounded condition poll. The timeout values come from
//! configuration and are failure thresholds, not cosmetic delays.

use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use crate::config::{AppConfig, Credentials};
use crate::logger::RunLogger;
use crate::page::{CrmPage, PageError};

/// How many characters of the company name key a failure screenshot.
const SCREENSHOT_KEY_LEN: usize = 10;

/// Workflow position, carried in errors for diagnostics.
///
/// `Idle → LoggedIn → {Searching → Selecting → MenuOpen → ConfirmingMerge
/// → Merged → Reset} → next company`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStep {
    Navigate,
    Search,
    Filter,
    SelectAll,
    OpenMenu,
    ChooseMerge,
    Confirm,
    AwaitCompletion,
    Dismiss,
    ClearFilter,
}

#[derive(Error, Debug)]
pub enum MergeError {
    /// Login failed. Fatal: no merge may run after this.
    #[error("login failed: {0}")]
    Auth(String),

    #[error("[{step:?}] element not found: {source}")]
    ElementNotFound {
        step: MergeStep,
        #[source]
        source: PageError,
    },

    #[error("[{step:?}] action timed out: {source}")]
    ActionTimeout {
        step: MergeStep,
        #[source]
        source: PageError,
    },

    #[error("[{step:?}] unexpected failure: {source}")]
    Unknown {
        step: MergeStep,
        #[source]
        source: PageError,
    },
}

impl MergeError {
    fn at(step: MergeStep) -> impl Fn(PageError) -> MergeError {
        move |source| match source {
            PageError::NotFound { .. } => MergeError::ElementNotFound { step, source },
            PageError::Action { .. } => MergeError::ActionTimeout { step, source },
            _ => MergeError::Unknown { step, source },
        }
    }
}

/// Per-company result.
#[derive(Debug)]
pub enum MergeOutcome {
    Merged,
    Failed(MergeError),
}

/// Outcome of a whole run, one entry per attempted company.
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<(String, MergeOutcome)>,
}

impl RunReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn merged(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, MergeOutcome::Merged))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.merged()
    }
}

/// Destination for failure screenshots. Injectable so tests can assert
/// capture without a rendering surface.
pub trait DiagnosticSink {
    fn capture(&mut self, name: &str, png: &[u8]) -> anyhow::Result<PathBuf>;
}

/// Writes `error_{name}.png` files into a directory.
pub struct ScreenshotSink {
    dir: PathBuf,
}

impl ScreenshotSink {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl DiagnosticSink for ScreenshotSink {
    fn capture(&mut self, name: &str, png: &[u8]) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("error_{}.png", name));
        std::fs::write(&path, png)?;
        Ok(path)
    }
}

pub struct MergeDriver<'a, P: CrmPage> {
    page: P,
    config: &'a AppConfig,
    logger: RunLogger,
    sink: Box<dyn DiagnosticSink>,
    logged_in: bool,
}

impl<'a, P: CrmPage> MergeDriver<'a, P> {
    pub fn new(
        page: P,
        config: &'a AppConfig,
        logger: RunLogger,
        sink: Box<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            page,
            config,
            logger,
            sink,
            logged_in: false,
        }
    }

    /// Authenticate the session. Must succeed before any merge attempt;
    /// failure is fatal for the whole run.
    pub fn login(&mut self, credentials: &Credentials) -> Result<(), MergeError> {
        let sel = &self.config.selectors;
        let timeouts = &self.config.timeouts;

        self.page
            .goto(&self.config.crm.login_url())
            .map_err(|e| MergeError::Auth(format!("could not open login page: {}", e)))?;

        self.page
            .type_text(&sel.login_input, &credentials.identifier, timeouts.element())
            .and_then(|_| {
                self.page
                    .type_text(&sel.password_input, &credentials.secret, timeouts.element())
            })
            .and_then(|_| self.page.click(&sel.login_submit, timeouts.element()))
            .map_err(|e| MergeError::Auth(format!("could not submit login form: {}", e)))?;

        // The dashboard marker is the only trusted signal that the session
        // is authenticated; poll for it instead of sleeping.
        self.page
            .wait_visible(&sel.dashboard_marker, timeouts.login_marker())
            .map_err(|e| MergeError::Auth(format!("dashboard marker never appeared: {}", e)))?;

        self.logged_in = true;
        self.logger.info("✅ Login succeeded");
        Ok(())
    }

    /// Merge duplicates for a single company. Steps run in strict order;
    /// the first bounded wait to expire fails the whole attempt.
    pub fn merge_company(
        &mut self,
        name: &str,
        index: usize,
        total: usize,
    ) -> Result<(), MergeError> {
        if !self.logged_in {
            return Err(MergeError::Auth(
                "merge attempted before successful login".to_string(),
            ));
        }

        let sel = &self.config.selectors;
        let timeouts = &self.config.timeouts;

        self.logger
            .info(&format!("🔍 [{}/{}] Processing: {}", index + 1, total, name));

        self.page
            .goto(&self.config.crm.contacts_url())
            .map_err(MergeError::at(MergeStep::Navigate))?;

        self.page
            .wait_visible(&sel.search_input, timeouts.element())
            .map_err(MergeError::at(MergeStep::Search))?;

        self.page
            .type_text(&sel.search_input, name, timeouts.element())
            .and_then(|_| self.page.press_key("Enter"))
            .map_err(MergeError::at(MergeStep::Filter))?;

        // Result settle: the legacy automation slept here; poll the list
        // container for the same bounded duration instead.
        self.page
            .wait_visible(&sel.result_list, timeouts.settle())
            .map_err(MergeError::at(MergeStep::Filter))?;

        // Selection cardinality is NOT verified: whatever the filter
        // matched is what gets merged (inherited behaviour, see DESIGN.md).
        self.page
            .click(&sel.select_all, timeouts.settle())
            .map_err(MergeError::at(MergeStep::SelectAll))?;

        self.page
            .click(&sel.actions_menu, timeouts.element())
            .map_err(MergeError::at(MergeStep::OpenMenu))?;

        self.page
            .click(&sel.merge_item, timeouts.menu_item())
            .map_err(MergeError::at(MergeStep::ChooseMerge))?;

        self.page
            .click(&sel.merge_confirm, timeouts.confirm())
            .map_err(MergeError::at(MergeStep::Confirm))?;

        // Success condition: the CRM reports there is nothing left to merge.
        self.page
            .wait_visible(&sel.done_marker, timeouts.done_marker())
            .map_err(MergeError::at(MergeStep::AwaitCompletion))?;

        self.page
            .click(&sel.dismiss, timeouts.dismiss())
            .map_err(MergeError::at(MergeStep::Dismiss))?;

        self.clear_filter()
            .map_err(MergeError::at(MergeStep::ClearFilter))?;

        Ok(())
    }

    /// Remove the active search facet so the next company starts clean.
    fn clear_filter(&mut self) -> Result<(), PageError> {
        let sel = &self.config.selectors;
        let timeouts = &self.config.timeouts;

        self.page.click(&sel.search_input, timeouts.dismiss())?;
        self.page.press_key("Backspace")?;
        self.page
            .wait_visible(&sel.result_list, timeouts.clear_settle())
    }

    /// Process every company in order. Login failure aborts before any
    /// attempt; per-company failures never stop the loop.
    pub fn run(
        &mut self,
        credentials: &Credentials,
        companies: &[String],
    ) -> Result<RunReport, MergeError> {
        self.login(credentials)?;

        let total = companies.len();
        self.logger.start_progress(total as u64);

        let mut report = RunReport::default();

        for (index, name) in companies.iter().enumerate() {
            self.logger.update_progress(name);

            let outcome = match self.merge_company(name, index, total) {
                Ok(()) => {
                    self.logger.record_merged();
                    let percent = ((index + 1) * 100) / total;
                    self.logger
                        .info(&format!("✅ Done: {} — progress: {}%", name, percent));
                    MergeOutcome::Merged
                }
                Err(error) => {
                    self.logger.record_failed();
                    self.logger
                        .error(&format!("❌ Failed to process {}: {}", name, error));
                    self.capture_failure(name);
                    // Best-effort reset so the next company starts from a
                    // clean filter; its own navigation also resets state.
                    if let Err(reset_error) = self.clear_filter() {
                        debug!("filter reset after failure also failed: {}", reset_error);
                    }
                    MergeOutcome::Failed(error)
                }
            };

            report.outcomes.push((name.clone(), outcome));
            self.logger.advance_progress();
        }

        self.logger
            .finish_progress("🏁 Finished processing all companies");
        Ok(report)
    }

    /// Capture a diagnostic screenshot keyed by the truncated company name.
    fn capture_failure(&mut self, name: &str) {
        let key: String = name.chars().take(SCREENSHOT_KEY_LEN).collect();
        match self.page.screenshot() {
            Ok(png) => match self.sink.capture(&key, &png) {
                Ok(path) => {
                    self.logger.record_screenshot();
                    self.logger
                        .debug(&format!("screenshot saved: {}", path.display()));
                }
                Err(e) => self.logger.warn(&format!("could not save screenshot: {}", e)),
            },
            Err(e) => self.logger.warn(&format!("could not capture screenshot: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screenshot_key_truncates_multibyte_names() {
        // Truncation is by character, never mid-codepoint
        let name = "Açúcar União Distribuidora";
        let key: String = name.chars().take(SCREENSHOT_KEY_LEN).collect();
        assert_eq!(key, "Açúcar Uni");
    }

    #[test]
    fn test_run_report_counts() {
        let mut report = RunReport::default();
        report.outcomes.push(("A".into(), MergeOutcome::Merged));
        report.outcomes.push((
            "B".into(),
            MergeOutcome::Failed(MergeError::Auth("x".into())),
        ));
        assert_eq!(report.attempted(), 2);
        assert_eq!(report.merged(), 1);
        assert_eq!(report.failed(), 1);
    }

    #[test]
    fn test_error_classification() {
        let not_found = PageError::NotFound {
            locator: ".x".into(),
            waited: std::time::Duration::from_secs(1),
            reason: "gone".into(),
        };
        let classified = MergeError::at(MergeStep::OpenMenu)(not_found);
        assert!(matches!(
            classified,
            MergeError::ElementNotFound {
                step: MergeStep::OpenMenu,
                ..
            }
        ));

        let action = PageError::Action {
            locator: ".x".into(),
            reason: "stale".into(),
        };
        let classified = MergeError::at(MergeStep::Confirm)(action);
        assert!(matches!(
            classified,
            MergeError::ActionTimeout {
                step: MergeStep::Confirm,
                ..
            }
        ));

        let backend = PageError::Backend {
            reason: "tab crashed".into(),
        };
        let classified = MergeError::at(MergeStep::Navigate)(backend);
        assert!(matches!(
            classified,
            MergeError::Unknown {
                step: MergeStep::Navigate,
                ..
            }
        ));
    }
}
