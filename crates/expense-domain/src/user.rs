//! The per-user document and its credential-free view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{expense::Expense, recurring::RecurringExpense};

/// Stored user document: credentials plus every expense and template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub recurring_expenses: Vec<RecurringExpense>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            password_hash: password_hash.into(),
            expenses: Vec::new(),
            recurring_expenses: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn recurring(&self, id: Uuid) -> Option<&RecurringExpense> {
        self.recurring_expenses.iter().find(|item| item.id == id)
    }

    pub fn recurring_mut(&mut self, id: Uuid) -> Option<&mut RecurringExpense> {
        self.recurring_expenses.iter_mut().find(|item| item.id == id)
    }

    /// Expenses that were materialized from the given template.
    pub fn instances_of(&self, recurring_id: Uuid) -> impl Iterator<Item = &Expense> {
        self.expenses.iter().filter(move |expense| {
            expense.is_recurring && expense.recurring_id == Some(recurring_id)
        })
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile::from(self.clone())
    }
}

/// User document as handed to callers; never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub expenses: Vec<Expense>,
    pub recurring_expenses: Vec<RecurringExpense>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            expenses: user.expenses,
            recurring_expenses: user.recurring_expenses,
            created_at: user.created_at,
        }
    }
}
