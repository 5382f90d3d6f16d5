//! Configuration management for contactmerge
//!
//! All configuration is loaded from `./config/contactmerge.toml`.
//! No hardcoded defaults exist in source code - all defaults are in the config template.

use serde::Deserialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration file path relative to working directory
pub const CONFIG_PATH: &str = "./config/contactmerge.toml";

/// Default configuration file content - this is the ONLY place defaults exist
pub const DEFAULT_CONFIG: &str = include_str!("../config/contactmerge.toml");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid URL in '{field}': {url}")]
    InvalidUrl { field: String, url: String },

    #[error("Configuration field '{field}' cannot be empty")]
    EmptyRequired { field: String },

    #[error("Timeout '{field}' must be greater than zero")]
    ZeroTimeout { field: String },

    #[error("Environment variable '{var}' is not set (required for CRM credentials)")]
    MissingCredential { var: String },
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub crm: CrmConfig,
    pub credentials: CredentialsConfig,
    pub selectors: SelectorsConfig,
    pub timeouts: TimeoutsConfig,
    pub input: InputConfig,
    pub dedupe: DedupeConfig,
}

/// CRM endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrmConfig {
    pub base_url: String,
    pub login_path: String,
    pub contacts_path: String,
}

impl CrmConfig {
    pub fn login_url(&self) -> String {
        format!("{}{}", self.base_url, self.login_path)
    }

    pub fn contacts_url(&self) -> String {
        format!("{}{}", self.base_url, self.contacts_path)
    }
}

/// Names of the environment variables carrying the login secrets
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsConfig {
    pub user_var: String,
    pub secret_var: String,
}

/// Login credentials resolved from the environment.
///
/// The secret is excluded from Debug output so it cannot leak through
/// error messages or logs.
#[derive(Clone)]
pub struct Credentials {
    pub identifier: String,
    pub secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Resolve credentials from the environment variables named in config.
    pub fn from_env(config: &CredentialsConfig) -> Result<Self, ConfigError> {
        let identifier =
            std::env::var(&config.user_var).map_err(|_| ConfigError::MissingCredential {
                var: config.user_var.clone(),
            })?;
        let secret =
            std::env::var(&config.secret_var).map_err(|_| ConfigError::MissingCredential {
                var: config.secret_var.clone(),
            })?;
        Ok(Self { identifier, secret })
    }
}

/// Every selector the merge workflow touches. Entries starting with `//`
/// are treated as XPath by the page layer.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorsConfig {
    pub login_input: String,
    pub password_input: String,
    pub login_submit: String,
    pub dashboard_marker: String,
    pub search_input: String,
    pub result_list: String,
    pub select_all: String,
    pub actions_menu: String,
    pub merge_item: String,
    pub merge_confirm: String,
    pub done_marker: String,
    pub dismiss: String,
}

/// Bounded-wait budgets per merge step.
///
/// These are correctness-relevant failure thresholds inherited from the
/// legacy automation, not cosmetic delays.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutsConfig {
    pub login_marker_secs: u64,
    pub element_secs: u64,
    pub menu_item_secs: u64,
    pub confirm_secs: u64,
    pub done_marker_secs: u64,
    pub dismiss_secs: u64,
    pub settle_ms: u64,
    pub clear_settle_ms: u64,
}

impl TimeoutsConfig {
    pub fn login_marker(&self) -> Duration {
        Duration::from_secs(self.login_marker_secs)
    }

    pub fn element(&self) -> Duration {
        Duration::from_secs(self.element_secs)
    }

    pub fn menu_item(&self) -> Duration {
        Duration::from_secs(self.menu_item_secs)
    }

    pub fn confirm(&self) -> Duration {
        Duration::from_secs(self.confirm_secs)
    }

    pub fn done_marker(&self) -> Duration {
        Duration::from_secs(self.done_marker_secs)
    }

    pub fn dismiss(&self) -> Duration {
        Duration::from_secs(self.dismiss_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn clear_settle(&self) -> Duration {
        Duration::from_millis(self.clear_settle_ms)
    }
}

/// Driver input configuration
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    pub company_column: String,
    pub screenshot_dir: String,
}

/// Resolver (dedupe subcommand) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DedupeConfig {
    pub column1_index: usize,
    pub column2_index: usize,
    pub column_name: String,
    pub frequency_limit: usize,
    pub output_suffix: String,
}

impl AppConfig {
    /// Load configuration from the default path
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(Path::new(CONFIG_PATH))
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.crm.base_url.starts_with("http://") && !self.crm.base_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidUrl {
                field: "crm.base_url".to_string(),
                url: self.crm.base_url.clone(),
            });
        }

        for (field, value) in [
            ("crm.login_path", &self.crm.login_path),
            ("crm.contacts_path", &self.crm.contacts_path),
            ("credentials.user_var", &self.credentials.user_var),
            ("credentials.secret_var", &self.credentials.secret_var),
            ("selectors.login_input", &self.selectors.login_input),
            ("selectors.password_input", &self.selectors.password_input),
            ("selectors.login_submit", &self.selectors.login_submit),
            ("selectors.dashboard_marker", &self.selectors.dashboard_marker),
            ("selectors.search_input", &self.selectors.search_input),
            ("selectors.result_list", &self.selectors.result_list),
            ("selectors.select_all", &self.selectors.select_all),
            ("selectors.actions_menu", &self.selectors.actions_menu),
            ("selectors.merge_item", &self.selectors.merge_item),
            ("selectors.merge_confirm", &self.selectors.merge_confirm),
            ("selectors.done_marker", &self.selectors.done_marker),
            ("selectors.dismiss", &self.selectors.dismiss),
            ("input.company_column", &self.input.company_column),
            ("dedupe.column_name", &self.dedupe.column_name),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyRequired {
                    field: field.to_string(),
                });
            }
        }

        for (field, value) in [
            ("timeouts.login_marker_secs", self.timeouts.login_marker_secs),
            ("timeouts.element_secs", self.timeouts.element_secs),
            ("timeouts.menu_item_secs", self.timeouts.menu_item_secs),
            ("timeouts.confirm_secs", self.timeouts.confirm_secs),
            ("timeouts.done_marker_secs", self.timeouts.done_marker_secs),
            ("timeouts.dismiss_secs", self.timeouts.dismiss_secs),
            ("timeouts.settle_ms", self.timeouts.settle_ms),
            ("timeouts.clear_settle_ms", self.timeouts.clear_settle_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroTimeout {
                    field: field.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Create default configuration file at the standard location
    pub fn create_default_config() -> Result<PathBuf, ConfigError> {
        let path = Path::new(CONFIG_PATH);

        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write default config
        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_CONFIG.as_bytes())?;

        Ok(path.to_path_buf())
    }

    /// Check if stdin is a TTY (interactive terminal)
    pub fn is_interactive() -> bool {
        atty::is(atty::Stream::Stdin)
    }

    /// Prompt user to create default config (only in interactive mode)
    pub fn prompt_create_config() -> Result<Option<PathBuf>, ConfigError> {
        if !Self::is_interactive() {
            return Ok(None);
        }

        print!("Configuration file not found. Create default config? [Y/n] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim().to_lowercase();

        if input.is_empty() || input == "y" || input == "yes" {
            let path = Self::create_default_config()?;
            Ok(Some(path))
        } else {
            Ok(None)
        }
    }
}
