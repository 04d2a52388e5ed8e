use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid configuration file: {0}")]
    Serde(#[from] serde_json::Error),
}
