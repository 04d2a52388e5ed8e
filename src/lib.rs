//! Expense Tracker keeps per-user expense documents and materializes their
//! recurring expenses into concrete, dated entries.
//!
//! The business layers live in the `expense-*` workspace crates; this crate
//! wires them together and ships the `expense_tracker_cli` shell.

pub mod cli;
pub mod errors;
pub mod utils;

pub use errors::AppError;
pub use expense_config as config;
pub use expense_domain as domain;
pub use expense_storage_json as storage;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing with the default filter.
pub fn init() {
    init_with_filter(utils::DEFAULT_LOG_FILTER);
}

/// Initializes global tracing once; later calls are ignored.
pub fn init_with_filter(default_directive: &str) {
    INIT_TRACING.call_once(|| {
        utils::init_tracing(default_directive);
        tracing::debug!("expense tracker tracing initialized");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
        super::init_with_filter("expense_tracker=debug");
    }
}
