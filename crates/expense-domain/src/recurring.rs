//! Domain model for recurring expense templates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{common::*, expense::Expense};

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Template from which dated [`Expense`] entries are generated.
pub struct RecurringExpense {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<String>,
    pub frequency: Frequency,
    /// Calendar day targeted by monthly templates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<u32>,
    pub start_date: NaiveDate,
    /// Cursor: date of the most recently materialized occurrence.
    #[serde(default)]
    pub last_generated: Option<NaiveDate>,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl RecurringExpense {
    pub fn new(
        name: impl Into<String>,
        amount: f64,
        frequency: Frequency,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            amount,
            category: None,
            payment_type: None,
            frequency,
            day_of_month: None,
            start_date,
            last_generated: None,
            active: true,
        }
    }

    pub fn with_day_of_month(mut self, day: u32) -> Self {
        self.day_of_month = Some(day);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_payment_type(mut self, payment_type: impl Into<String>) -> Self {
        self.payment_type = Some(payment_type.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Description shown on generated entries, falling back to the name.
    pub fn display_description(&self) -> &str {
        self.description
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .unwrap_or(self.name.as_str())
    }

    /// Day anchoring monthly occurrences, if this template uses one. A stored
    /// zero means no anchor.
    pub fn anchor_day(&self) -> Option<u32> {
        match self.frequency {
            Frequency::Monthly => self.day_of_month.filter(|day| *day > 0),
            _ => None,
        }
    }

    /// Occurrence following `from` under this template's cadence.
    pub fn next_date(&self, from: NaiveDate) -> NaiveDate {
        self.frequency.next_date(from, self.anchor_day())
    }

    /// Snapshots the template into a new expense dated `date`.
    pub fn instantiate(&self, date: NaiveDate) -> Expense {
        Expense {
            id: Uuid::new_v4(),
            date,
            name: self.name.clone(),
            description: self.display_description().to_string(),
            amount: self.amount,
            category: self.category.clone(),
            payment_type: self.payment_type.clone(),
            is_recurring: true,
            recurring_id: Some(self.id),
        }
    }
}
