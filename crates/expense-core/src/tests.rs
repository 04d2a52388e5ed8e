use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    storage::UserStore, time::FixedClock, user_warnings, CoreError, RecurrenceService, UserService,
};
use expense_domain::{Expense, Frequency, RecurringExpense, User};

#[derive(Default)]
struct MemoryStore {
    users: Mutex<HashMap<Uuid, User>>,
    fail_updates: AtomicBool,
}

impl MemoryStore {
    fn get(&self, username: &str) -> Option<User> {
        self.users
            .lock()
            .unwrap()
            .values()
            .find(|user| user.username == username)
            .cloned()
    }
}

impl UserStore for Arc<MemoryStore> {
    fn find_by_username(&self, username: &str) -> Result<Option<User>, CoreError> {
        Ok(self.get(username))
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<User>, CoreError> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    fn insert_user(&self, user: &User) -> Result<(), CoreError> {
        if self.get(&user.username).is_some() {
            return Err(CoreError::UsernameTaken(user.username.clone()));
        }
        self.users.lock().unwrap().insert(user.id, user.clone());
        Ok(())
    }

    fn update_user(&self, user: &User) -> Result<(), CoreError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(CoreError::Storage("disk full".into()));
        }
        let mut users = self.users.lock().unwrap();
        if !users.contains_key(&user.id) {
            return Err(CoreError::UserNotFound(user.id.to_string()));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn service_at(today: NaiveDate) -> (UserService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let service = UserService::new(Box::new(store.clone()), Arc::new(FixedClock::new(today)));
    (service, store)
}

fn rent() -> RecurringExpense {
    RecurringExpense::new("Rent", 1200.0, Frequency::Monthly, date(2024, 1, 10)).with_day_of_month(5)
}

#[test]
fn signup_rejects_duplicate_usernames_and_blank_input() {
    let (service, _) = service_at(date(2024, 4, 5));

    let profile = service.signup("alice", "hunter2").expect("signup");
    assert_eq!(profile.username, "alice");
    assert!(profile.expenses.is_empty());

    assert!(matches!(
        service.signup("alice", "other"),
        Err(CoreError::UsernameTaken(_))
    ));
    assert!(matches!(service.signup("  ", "pw"), Err(CoreError::Validation(_))));
    assert!(matches!(service.signup("bob", ""), Err(CoreError::Validation(_))));
}

#[test]
fn signup_stores_a_password_hash_not_the_password() {
    let (service, store) = service_at(date(2024, 4, 5));
    service.signup("alice", "hunter2").unwrap();

    let stored = store.get("alice").unwrap();
    assert_ne!(stored.password_hash, "hunter2");
    assert!(stored.password_hash.starts_with("$argon2"));
}

#[test]
fn login_checks_credentials() {
    let (service, _) = service_at(date(2024, 4, 5));
    service.signup("alice", "hunter2").unwrap();

    assert!(service.login("alice", "hunter2").is_ok());
    assert!(matches!(
        service.login("alice", "nope"),
        Err(CoreError::InvalidCredentials)
    ));
    assert!(matches!(
        service.login("carol", "hunter2"),
        Err(CoreError::UserNotFound(_))
    ));
}

#[test]
fn login_materializes_due_recurring_expenses_once() {
    let (service, store) = service_at(date(2024, 4, 5));
    let user = service.signup("alice", "hunter2").unwrap();
    service.add_recurring(user.id, rent()).unwrap();

    let first = service.login("alice", "hunter2").unwrap();
    let dates: Vec<_> = first.expenses.iter().map(|expense| expense.date).collect();
    assert_eq!(dates, vec![date(2024, 2, 5), date(2024, 3, 5), date(2024, 4, 5)]);
    assert_eq!(first.recurring_expenses[0].last_generated, Some(date(2024, 4, 5)));

    let second = service.login("alice", "hunter2").unwrap();
    assert_eq!(second.expenses.len(), 3);
    assert_eq!(store.get("alice").unwrap().expenses.len(), 3);
}

#[test]
fn login_survives_a_failing_write_back() {
    let (service, store) = service_at(date(2024, 4, 5));
    let user = service.signup("alice", "hunter2").unwrap();
    service.add_recurring(user.id, rent()).unwrap();
    store.fail_updates.store(true, Ordering::SeqCst);

    let profile = service.login("alice", "hunter2").expect("login must not fail");

    assert!(profile.expenses.is_empty());
    assert_eq!(profile.recurring_expenses[0].last_generated, None);

    store.fail_updates.store(false, Ordering::SeqCst);
    let retried = service.login("alice", "hunter2").unwrap();
    assert_eq!(retried.expenses.len(), 3);
}

#[test]
fn generate_recurring_reports_and_persists() {
    let (service, store) = service_at(date(2024, 1, 1));
    let user = service.signup("alice", "hunter2").unwrap();
    service.add_recurring(user.id, rent()).unwrap();

    let report = service
        .generate_recurring(user.id, Some(date(2024, 3, 31)))
        .unwrap();
    assert_eq!(report.created.len(), 2);
    assert_eq!(report.advanced_templates, 1);

    let stored = store.get("alice").unwrap();
    assert_eq!(stored.expenses.len(), 2);
    assert!(user_warnings(&stored).is_empty());

    let again = service
        .generate_recurring(user.id, Some(date(2024, 3, 31)))
        .unwrap();
    assert!(again.created.is_empty());
    assert_eq!(again.advanced_templates, 0);
}

#[test]
fn paused_templates_do_not_generate() {
    let (service, _) = service_at(date(2024, 4, 5));
    let user = service.signup("alice", "hunter2").unwrap();
    let template = rent();
    let template_id = template.id;
    service.add_recurring(user.id, template).unwrap();
    service.set_recurring_active(user.id, template_id, false).unwrap();

    let profile = service.login("alice", "hunter2").unwrap();

    assert!(profile.expenses.is_empty());
    assert!(!profile.recurring_expenses[0].active);
}

#[test]
fn add_recurring_validates_and_resets_cursor() {
    let (service, _) = service_at(date(2024, 4, 5));
    let user = service.signup("alice", "hunter2").unwrap();

    let bad_day = rent().with_day_of_month(32);
    assert!(matches!(
        service.add_recurring(user.id, bad_day),
        Err(CoreError::Validation(_))
    ));
    let unknown = RecurringExpense::new("Odd", 1.0, Frequency::Unknown, date(2024, 1, 1));
    assert!(matches!(
        service.add_recurring(user.id, unknown),
        Err(CoreError::Validation(_))
    ));

    let mut seeded = rent();
    seeded.last_generated = Some(date(2030, 1, 5));
    let profile = service.add_recurring(user.id, seeded).unwrap();
    assert_eq!(profile.recurring_expenses[0].last_generated, None);
}

#[test]
fn removing_a_template_keeps_its_expenses() {
    let (service, _) = service_at(date(2024, 4, 5));
    let user = service.signup("alice", "hunter2").unwrap();
    let template = rent();
    let template_id = template.id;
    service.add_recurring(user.id, template).unwrap();
    service.login("alice", "hunter2").unwrap();

    let profile = service.remove_recurring(user.id, template_id).unwrap();

    assert!(profile.recurring_expenses.is_empty());
    assert_eq!(profile.expenses.len(), 3);
    assert!(matches!(
        service.remove_recurring(user.id, template_id),
        Err(CoreError::RecurringNotFound(_))
    ));
}

#[test]
fn update_expenses_replaces_the_list() {
    let (service, _) = service_at(date(2024, 4, 5));
    let user = service.signup("alice", "hunter2").unwrap();
    service
        .add_expense(user.id, Expense::manual(date(2024, 4, 1), "Lunch", 12.0))
        .unwrap();

    let replacement = vec![Expense::manual(date(2024, 4, 2), "Taxi", 18.5).with_category("travel")];
    let profile = service.update_expenses(user.id, replacement).unwrap();

    assert_eq!(profile.expenses.len(), 1);
    assert_eq!(profile.expenses[0].name, "Taxi");
    assert!(matches!(
        service.update_expenses(Uuid::new_v4(), Vec::new()),
        Err(CoreError::UserNotFound(_))
    ));
}

#[test]
fn user_warnings_flag_inconsistent_documents() {
    let mut user = User::new("alice", "hash");
    let mut template = rent().with_day_of_month(40);
    template.last_generated = Some(date(2023, 12, 5));
    let orphan = RecurringExpense::new("Gone", 5.0, Frequency::Weekly, date(2024, 1, 1))
        .instantiate(date(2024, 1, 8));
    user.recurring_expenses.push(template);
    user.recurring_expenses
        .push(RecurringExpense::new("Odd", 1.0, Frequency::Unknown, date(2024, 1, 1)));
    user.expenses.push(orphan);

    let warnings = user_warnings(&user);

    assert_eq!(warnings.len(), 4, "{warnings:?}");
}

#[test]
fn engine_output_can_be_appended_to_a_document() {
    let mut user = User::new("alice", "hash");
    user.recurring_expenses.push(rent());

    let run = RecurrenceService::generate(&user.recurring_expenses, &user.expenses, date(2024, 2, 5));
    user.expenses.extend(run.new_expenses);
    user.recurring_expenses = run.updated_recurring;

    assert_eq!(user.instances_of(user.recurring_expenses[0].id).count(), 1);
}

#[test]
fn materialize_recurring_returns_the_updated_document() {
    let (service, store) = service_at(date(2024, 3, 31));
    let profile = service.signup("alice", "hunter2").unwrap();
    service.add_recurring(profile.id, rent()).unwrap();
    let stored = store.get("alice").unwrap();

    let updated = service.materialize_recurring(stored.clone());
    assert_eq!(updated.expenses.len(), 2);
    assert_eq!(store.get("alice").unwrap(), updated);

    let unchanged = service.materialize_recurring(updated.clone());
    assert_eq!(unchanged, updated);
}
