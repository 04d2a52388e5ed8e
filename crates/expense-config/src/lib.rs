//! expense-config
//!
//! Application settings persisted next to the user documents.

pub mod error;
pub mod manager;
pub mod model;

pub use error::ConfigError;
pub use manager::ConfigManager;
pub use model::{default_app_dir, Config, HOME_ENV};
