//! Headless Chrome launcher.
//!
//! The merge workflow owns exactly one browser session for the whole run,
//! so there is no pooling here. Sandbox is disabled automatically when
//! running inside a container (detected via /.dockerenv or the
//! CONTACTMERGE_CONTAINER env var).

use anyhow::{anyhow, Result};

/// Create the headless Chrome instance for the run.
/// The Chrome binary can be overridden with the CHROME_PATH env var.
pub fn create_browser() -> Result<headless_chrome::Browser> {
    let is_container = std::env::var("CONTACTMERGE_CONTAINER").is_ok()
        || std::path::Path::new("/.dockerenv").exists();

    let chrome_path: Option<std::path::PathBuf> =
        std::env::var("CHROME_PATH").ok().map(std::path::PathBuf::from);

    let mut builder = headless_chrome::LaunchOptions::default_builder();
    if is_container {
        builder.sandbox(false);
    }
    if let Some(path) = chrome_path {
        builder.path(Some(path));
    }

    let options = builder
        .build()
        .map_err(|e| anyhow!("Failed to build Chrome launch options: {}", e))?;
    headless_chrome::Browser::new(options)
        .map_err(|e| anyhow!("Failed to launch headless Chrome: {}", e))
}
