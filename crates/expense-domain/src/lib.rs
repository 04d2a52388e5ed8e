//! expense-domain
//!
//! Pure domain models (User, Expense, RecurringExpense, Frequency).
//! No I/O, no CLI, no storage. Only data types and calendar helpers.

pub mod common;
pub mod expense;
pub mod recurring;
pub mod user;

pub use common::*;
pub use expense::*;
pub use recurring::*;
pub use user::*;
