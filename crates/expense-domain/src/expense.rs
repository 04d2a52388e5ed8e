//! Domain model for concrete expense entries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single expense attributed to one calendar date.
///
/// Entries produced from a [`crate::RecurringExpense`] carry `is_recurring = true`
/// and a `recurring_id` pointing back at the template; the fields are a snapshot
/// taken at generation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,
    pub date: NaiveDate,
    pub name: String,
    pub description: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_id: Option<Uuid>,
}

impl Expense {
    /// Builds a manually entered expense.
    pub fn manual(date: NaiveDate, name: impl Into<String>, amount: f64) -> Self {
        let name = name.into();
        Self {
            id: Uuid::new_v4(),
            date,
            description: name.clone(),
            name,
            amount,
            category: None,
            payment_type: None,
            is_recurring: false,
            recurring_id: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_payment_type(mut self, payment_type: impl Into<String>) -> Self {
        self.payment_type = Some(payment_type.into());
        self
    }

    /// True when this entry was materialized from the given template on `date`.
    pub fn materializes(&self, recurring_id: Uuid, date: NaiveDate) -> bool {
        self.is_recurring && self.recurring_id == Some(recurring_id) && self.date == date
    }
}
