//! Materializes due occurrences of recurring expense templates.
//!
//! The engine is a pure computation over `(templates, existing expenses, reference
//! date)`: it never touches storage and never fails. Callers persist the returned
//! templates and expenses themselves.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use expense_domain::{format_date, with_day_clamped, Expense, RecurringExpense};

use crate::time::Clock;

/// Result of one engine run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    /// Newly due expenses, grouped per template in input order.
    pub new_expenses: Vec<Expense>,
    /// Copy of every input template with advanced cursors.
    pub updated_recurring: Vec<RecurringExpense>,
}

impl Generation {
    pub fn is_empty(&self) -> bool {
        self.new_expenses.is_empty()
    }

    /// Number of templates whose cursor moved compared to `original`.
    pub fn advanced_templates(&self, original: &[RecurringExpense]) -> usize {
        self.updated_recurring
            .iter()
            .zip(original)
            .filter(|(updated, before)| updated.last_generated != before.last_generated)
            .count()
    }

    /// True when persisting this run would change the stored document.
    pub fn has_changes(&self, original: &[RecurringExpense]) -> bool {
        !self.new_expenses.is_empty() || self.advanced_templates(original) > 0
    }
}

pub struct RecurrenceService;

impl RecurrenceService {
    /// Computes every occurrence due on or before `reference` that has not been
    /// materialized yet, and the templates with their cursors advanced.
    ///
    /// Inactive templates are copied through untouched. Re-running with the
    /// returned templates and the union of old and new expenses yields nothing new.
    pub fn generate(
        recurring: &[RecurringExpense],
        existing: &[Expense],
        reference: NaiveDate,
    ) -> Generation {
        let materialized: HashSet<(Uuid, NaiveDate)> = existing
            .iter()
            .filter(|expense| expense.is_recurring)
            .filter_map(|expense| expense.recurring_id.map(|id| (id, expense.date)))
            .collect();

        let mut updated_recurring = recurring.to_vec();
        let mut new_expenses = Vec::new();

        for template in updated_recurring.iter_mut().filter(|t| t.active) {
            let created = catch_up(template, &materialized, reference, &mut new_expenses);
            if created > 0 {
                debug!(
                    template = %template.id,
                    name = %template.name,
                    created,
                    "materialized recurring expense occurrences"
                );
            }
        }

        Generation {
            new_expenses,
            updated_recurring,
        }
    }

    /// Same as [`RecurrenceService::generate`] using the clock's current date.
    pub fn generate_now(
        recurring: &[RecurringExpense],
        existing: &[Expense],
        clock: &dyn Clock,
    ) -> Generation {
        Self::generate(recurring, existing, clock.today())
    }

    /// Date the template will next produce, as seen from `reference`.
    ///
    /// Returns `None` for inactive templates and cadences that cannot advance.
    pub fn next_occurrence(template: &RecurringExpense, reference: NaiveDate) -> Option<NaiveDate> {
        if !template.active {
            return None;
        }
        match template.last_generated {
            Some(last) => advance(template, last),
            None => first_occurrence(template, reference),
        }
    }
}

/// Runs the catch-up loop for a single template, returning how many expenses it created.
fn catch_up(
    template: &mut RecurringExpense,
    materialized: &HashSet<(Uuid, NaiveDate)>,
    reference: NaiveDate,
    out: &mut Vec<Expense>,
) -> usize {
    let first = match template.last_generated {
        Some(last) => advance(template, last),
        None => first_occurrence(template, reference),
    };
    let Some(mut next) = first else {
        warn!(
            template = %template.id,
            frequency = %template.frequency,
            "recurring expense cannot advance; skipping"
        );
        return 0;
    };

    let mut created = 0;
    while next <= reference {
        if materialized.contains(&(template.id, next)) {
            trace!(template = %template.id, date = %format_date(next), "already materialized");
        } else {
            out.push(template.instantiate(next));
            created += 1;
        }
        template.last_generated = Some(next);

        match advance(template, next) {
            Some(following) => next = following,
            None => {
                warn!(template = %template.id, "occurrence did not advance; stopping");
                break;
            }
        }
    }
    created
}

/// Next occurrence after `from`, or `None` when the cadence makes no progress.
fn advance(template: &RecurringExpense, from: NaiveDate) -> Option<NaiveDate> {
    let next = template.next_date(from);
    (next != from).then_some(next)
}

/// First occurrence of a template that has never generated anything.
///
/// Occurrences always fall strictly after the start date. Monthly templates with a
/// day of month are re-anchored to that day within the start month (or the month
/// after, when the day already passed), so a backlog starts at the first anchored
/// date rather than one period later.
fn first_occurrence(template: &RecurringExpense, reference: NaiveDate) -> Option<NaiveDate> {
    let start = template.start_date;
    let Some(day) = template.anchor_day() else {
        return advance(template, start);
    };

    let mut anchored = with_day_clamped(start, day);
    if anchored < start {
        anchored = template.next_date(anchored);
    }
    if anchored > reference {
        return advance(template, start);
    }

    let mut next = if anchored > start {
        anchored
    } else {
        advance(template, anchored)?
    };

    // A payment day that already passed this month still counts for this month.
    if let Some(this_month) = NaiveDate::from_ymd_opt(reference.year(), reference.month(), day) {
        if this_month > start && this_month <= reference && this_month < next {
            next = this_month;
        }
    }
    Some(next)
}
