use std::collections::HashSet;

use uuid::Uuid;

use expense_domain::{format_date, User};

use crate::CoreError;

/// Abstraction over persistence backends capable of storing user documents.
pub trait UserStore: Send + Sync {
    fn find_by_username(&self, username: &str) -> Result<Option<User>, CoreError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<User>, CoreError>;
    /// Stores a new document, failing with `UsernameTaken` if one exists.
    fn insert_user(&self, user: &User) -> Result<(), CoreError>;
    /// Replaces an existing document, failing with `UserNotFound` if absent.
    fn update_user(&self, user: &User) -> Result<(), CoreError>;
}

/// Detects dangling references and other anomalies within a user document.
pub fn user_warnings(user: &User) -> Vec<String> {
    let template_ids: HashSet<_> = user.recurring_expenses.iter().map(|t| t.id).collect();
    let mut warnings = Vec::new();

    for expense in user.expenses.iter().filter(|e| e.is_recurring) {
        match expense.recurring_id {
            Some(id) if !template_ids.contains(&id) => warnings.push(format!(
                "expense {} references unknown recurring expense {}",
                expense.id, id
            )),
            None => warnings.push(format!(
                "expense {} is marked recurring but has no template reference",
                expense.id
            )),
            _ => {}
        }
    }

    for template in &user.recurring_expenses {
        if !template.frequency.is_known() {
            warnings.push(format!(
                "recurring expense {} has an unknown frequency and will never generate",
                template.id
            ));
        }
        if let Some(day) = template.day_of_month {
            if day > 31 {
                warnings.push(format!(
                    "recurring expense {} has day of month {} past 31",
                    template.id, day
                ));
            }
        }
        if let Some(last) = template.last_generated {
            if last < template.start_date {
                warnings.push(format!(
                    "recurring expense {} was last generated on {} before its start date {}",
                    template.id,
                    format_date(last),
                    format_date(template.start_date)
                ));
            }
        }
    }
    warnings
}
