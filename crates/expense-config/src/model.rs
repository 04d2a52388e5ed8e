use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_DIR_NAME: &str = ".expense_tracker";

/// Environment variable overriding the application directory.
pub const HOME_ENV: &str = "EXPENSE_TRACKER_HOME";

/// `$EXPENSE_TRACKER_HOME`, or `~/.expense_tracker` when unset.
pub fn default_app_dir() -> PathBuf {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|value| !value.is_empty()) {
        return PathBuf::from(home);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

/// Stores user-configurable application settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Optional custom root directory for user documents. Defaults to the application directory.
    pub data_root: Option<PathBuf>,

    #[serde(default = "Config::default_backup_retention")]
    pub backup_retention: usize,

    #[serde(default = "Config::default_log_filter")]
    pub log_filter: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_user: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_root: None,
            backup_retention: Self::default_backup_retention(),
            log_filter: Self::default_log_filter(),
            last_user: None,
        }
    }
}

impl Config {
    pub fn default_backup_retention() -> usize {
        5
    }

    pub fn default_log_filter() -> String {
        "expense_tracker=info".into()
    }

    /// Directory holding user documents and their backups.
    pub fn resolve_data_root(&self) -> PathBuf {
        self.data_root.clone().unwrap_or_else(default_app_dir)
    }
}
