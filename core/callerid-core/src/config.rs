//! Runtime configuration loaded from `config.toml` under the storage root.
//!
//! A missing file yields defaults. Directory credentials can be supplied (or
//! overridden) through `CALLERID_DIRECTORY_URL` / `CALLERID_DIRECTORY_KEY`.

use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::error::{CallerIdError, Result};
use crate::permissions::Permission;

pub const DIRECTORY_URL_ENV: &str = "CALLERID_DIRECTORY_URL";
pub const DIRECTORY_KEY_ENV: &str = "CALLERID_DIRECTORY_KEY";

const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DIRECTORY_TABLE: &str = "clients";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CallerIdConfig {
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub permissions: PermissionsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LookupConfig {
    #[serde(default = "default_lookup_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_lookup_timeout_secs(),
        }
    }
}

impl LookupConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_directory_table")]
    pub table: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            table: default_directory_table(),
        }
    }
}

impl DirectoryConfig {
    pub fn is_configured(&self) -> bool {
        self.url
            .as_deref()
            .map(|url| !url.trim().is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct NotificationConfig {
    /// Ask for a call note after an answered call with a known caller ends.
    #[serde(default)]
    pub post_call_prompt: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PermissionsConfig {
    /// Permissions the host platform has granted to the daemon.
    #[serde(default = "default_granted_permissions")]
    pub granted: Vec<Permission>,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            granted: default_granted_permissions(),
        }
    }
}

fn default_lookup_timeout_secs() -> u64 {
    DEFAULT_LOOKUP_TIMEOUT_SECS
}

fn default_directory_table() -> String {
    DEFAULT_DIRECTORY_TABLE.to_string()
}

fn default_granted_permissions() -> Vec<Permission> {
    Permission::REQUIRED.to_vec()
}

/// Loads the config at `path`, returning defaults when the file is absent,
/// then applies environment overrides.
pub fn load_config(path: &Path) -> Result<CallerIdConfig> {
    let mut config = if path.exists() {
        let content = fs_err::read_to_string(path)
            .map_err(|err| CallerIdError::io(format!("read {}", path.display()), err))?;
        toml::from_str::<CallerIdConfig>(&content).map_err(|err| {
            CallerIdError::ConfigMalformed {
                path: path.to_path_buf(),
                details: err.to_string(),
            }
        })?
    } else {
        CallerIdConfig::default()
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

fn apply_env_overrides(config: &mut CallerIdConfig) {
    if let Ok(url) = env::var(DIRECTORY_URL_ENV) {
        if !url.trim().is_empty() {
            config.directory.url = Some(url);
        }
    }
    if let Ok(key) = env::var(DIRECTORY_KEY_ENV) {
        if !key.trim().is_empty() {
            config.directory.api_key = Some(key);
        }
    }
}
