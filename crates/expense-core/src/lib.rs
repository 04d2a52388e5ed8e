//! expense-core
//!
//! Business logic and services for the expense tracker.
//! Depends on expense-domain. No CLI, no terminal I/O, no direct file access.

pub mod auth;
pub mod error;
pub mod recurrence_service;
pub mod storage;
pub mod time;
pub mod user_service;

pub use error::CoreError;
pub use recurrence_service::*;
pub use storage::{user_warnings, UserStore};
pub use time::{Clock, FixedClock, SystemClock};
pub use user_service::*;

#[cfg(test)]
mod tests;
