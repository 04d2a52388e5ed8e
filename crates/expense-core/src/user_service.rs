//! Account and expense operations over stored user documents.
//!
//! This is the caller of the recurrence engine: it reads a user's document,
//! materializes due recurring expenses and writes the result back in one update.

use std::{
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::NaiveDate;
use tracing::{error, info, warn};
use uuid::Uuid;

use expense_domain::{Expense, RecurringExpense, User, UserProfile};

use crate::{
    auth::{hash_password, verify_password},
    recurrence_service::{Generation, RecurrenceService},
    storage::{user_warnings, UserStore},
    time::Clock,
    CoreError,
};

/// Outcome of an explicit recurring-expense run.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    pub reference: NaiveDate,
    pub created: Vec<Expense>,
    pub advanced_templates: usize,
}

pub struct UserService {
    store: Box<dyn UserStore>,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl UserService {
    pub fn new(store: Box<dyn UserStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Registers a new user with an empty expense list.
    pub fn signup(&self, username: &str, password: &str) -> Result<UserProfile, CoreError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(CoreError::Validation("username must not be empty".into()));
        }
        if password.is_empty() {
            return Err(CoreError::Validation("password must not be empty".into()));
        }

        let _guard = self.lock();
        if self.store.find_by_username(username)?.is_some() {
            return Err(CoreError::UsernameTaken(username.to_string()));
        }
        let user = User::new(username, hash_password(password)?);
        self.store.insert_user(&user)?;
        info!(username, "user signed up");
        Ok(user.into())
    }

    /// Verifies credentials, then brings the user's recurring expenses up to date.
    ///
    /// Materialization failures never fail the login; the stored state is returned.
    pub fn login(&self, username: &str, password: &str) -> Result<UserProfile, CoreError> {
        let username = username.trim();
        let _guard = self.lock();
        let user = self
            .store
            .find_by_username(username)?
            .ok_or_else(|| CoreError::UserNotFound(username.to_string()))?;
        verify_password(password, &user.password_hash)?;

        for warning in user_warnings(&user) {
            warn!(username = %user.username, "{warning}");
        }
        let user = self.materialize_locked(user);
        info!(username = %user.username, "user logged in");
        Ok(user.into())
    }

    /// Fail-safe materialization: returns the updated document on success and the
    /// untouched `user` if generation or persistence fails.
    pub fn materialize_recurring(&self, user: User) -> User {
        let _guard = self.lock();
        self.materialize_locked(user)
    }

    /// Runs the engine for `user_id` as of `reference` (today when `None`) and
    /// persists the result, propagating storage errors.
    pub fn generate_recurring(
        &self,
        user_id: Uuid,
        reference: Option<NaiveDate>,
    ) -> Result<GenerationReport, CoreError> {
        let reference = reference.unwrap_or_else(|| self.clock.today());
        let _guard = self.lock();
        let user = self.load(user_id)?;
        let generation =
            RecurrenceService::generate(&user.recurring_expenses, &user.expenses, reference);
        let advanced_templates = generation.advanced_templates(&user.recurring_expenses);
        let created = generation.new_expenses.clone();
        if generation.has_changes(&user.recurring_expenses) {
            let updated = apply_generation(&user, generation);
            self.store.update_user(&updated)?;
            info!(
                username = %updated.username,
                created = created.len(),
                "recurring expenses generated"
            );
        }
        Ok(GenerationReport {
            reference,
            created,
            advanced_templates,
        })
    }

    pub fn profile(&self, user_id: Uuid) -> Result<UserProfile, CoreError> {
        self.load(user_id).map(UserProfile::from)
    }

    pub fn integrity_warnings(&self, user_id: Uuid) -> Result<Vec<String>, CoreError> {
        self.load(user_id).map(|user| user_warnings(&user))
    }

    /// Replaces the user's whole expense list.
    pub fn update_expenses(
        &self,
        user_id: Uuid,
        expenses: Vec<Expense>,
    ) -> Result<UserProfile, CoreError> {
        let profile = self.modify_user(user_id, |user| {
            user.expenses = expenses;
            Ok(())
        })?;
        info!(username = %profile.username, "expenses updated");
        Ok(profile)
    }

    pub fn add_expense(&self, user_id: Uuid, expense: Expense) -> Result<UserProfile, CoreError> {
        self.modify_user(user_id, |user| {
            user.expenses.push(expense);
            Ok(())
        })
    }

    /// Adds a template; its cursor always starts unset.
    pub fn add_recurring(
        &self,
        user_id: Uuid,
        mut template: RecurringExpense,
    ) -> Result<UserProfile, CoreError> {
        validate_recurring(&template)?;
        template.last_generated = None;
        self.modify_user(user_id, |user| {
            if user.recurring(template.id).is_some() {
                return Err(CoreError::Validation(format!(
                    "recurring expense {} already exists",
                    template.id
                )));
            }
            user.recurring_expenses.push(template);
            Ok(())
        })
    }

    pub fn set_recurring_active(
        &self,
        user_id: Uuid,
        template_id: Uuid,
        active: bool,
    ) -> Result<UserProfile, CoreError> {
        self.modify_user(user_id, |user| {
            let template = user
                .recurring_mut(template_id)
                .ok_or(CoreError::RecurringNotFound(template_id))?;
            template.active = active;
            Ok(())
        })
    }

    /// Deletes a template. Expenses already generated from it are kept.
    pub fn remove_recurring(
        &self,
        user_id: Uuid,
        template_id: Uuid,
    ) -> Result<UserProfile, CoreError> {
        self.modify_user(user_id, |user| {
            let before = user.recurring_expenses.len();
            user.recurring_expenses.retain(|item| item.id != template_id);
            if user.recurring_expenses.len() == before {
                return Err(CoreError::RecurringNotFound(template_id));
            }
            Ok(())
        })
    }

    fn materialize_locked(&self, user: User) -> User {
        let reference = self.clock.today();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            RecurrenceService::generate(&user.recurring_expenses, &user.expenses, reference)
        }));
        let generation = match outcome {
            Ok(generation) => generation,
            Err(_) => {
                error!(
                    username = %user.username,
                    "recurring expense generation failed; keeping stored state"
                );
                return user;
            }
        };
        if !generation.has_changes(&user.recurring_expenses) {
            return user;
        }

        let created = generation.new_expenses.len();
        let updated = apply_generation(&user, generation);
        match self.store.update_user(&updated) {
            Ok(()) => {
                info!(username = %updated.username, created, "recurring expenses materialized");
                updated
            }
            Err(err) => {
                error!(
                    username = %user.username,
                    error = %err,
                    "failed to persist recurring expenses; keeping stored state"
                );
                user
            }
        }
    }

    fn modify_user<F>(&self, user_id: Uuid, mutator: F) -> Result<UserProfile, CoreError>
    where
        F: FnOnce(&mut User) -> Result<(), CoreError>,
    {
        let _guard = self.lock();
        let mut user = self.load(user_id)?;
        mutator(&mut user)?;
        self.store.update_user(&user)?;
        Ok(user.into())
    }

    fn load(&self, user_id: Uuid) -> Result<User, CoreError> {
        self.store
            .find_by_id(user_id)?
            .ok_or_else(|| CoreError::UserNotFound(user_id.to_string()))
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn apply_generation(user: &User, generation: Generation) -> User {
    let mut updated = user.clone();
    updated.expenses.extend(generation.new_expenses);
    updated.recurring_expenses = generation.updated_recurring;
    updated
}

fn validate_recurring(template: &RecurringExpense) -> Result<(), CoreError> {
    if template.name.trim().is_empty() {
        return Err(CoreError::Validation(
            "recurring expense name must not be empty".into(),
        ));
    }
    if !template.frequency.is_known() {
        return Err(CoreError::Validation(
            "frequency must be daily, weekly, monthly or yearly".into(),
        ));
    }
    if let Some(day) = template.day_of_month {
        if !(1..=31).contains(&day) {
            return Err(CoreError::Validation(format!(
                "day of month must be between 1 and 31, got {day}"
            )));
        }
    }
    Ok(())
}
