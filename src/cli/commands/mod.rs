//! Command table and shared argument parsing.

mod expense;
mod recurring;
mod session;
mod system;

use chrono::NaiveDate;
use uuid::Uuid;

use expense_domain::{parse_date, UserProfile};

use crate::cli::context::CommandError;
use crate::cli::registry::CommandRegistry;

pub fn register_all(registry: &mut CommandRegistry) {
    for entry in system::entries()
        .into_iter()
        .chain(session::entries())
        .chain(expense::entries())
        .chain(recurring::entries())
    {
        registry.register(entry);
    }
}

pub(crate) fn usage_error(usage: &str) -> CommandError {
    CommandError::InvalidArguments(format!("usage: {usage}"))
}

pub(crate) fn parse_date_arg(input: &str) -> Result<NaiveDate, CommandError> {
    parse_date(input).ok_or_else(|| {
        CommandError::InvalidArguments(format!("invalid date `{}` (use YYYY-MM-DD)", input))
    })
}

pub(crate) fn parse_amount(input: &str) -> Result<f64, CommandError> {
    input
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
        .ok_or_else(|| CommandError::InvalidArguments(format!("invalid amount `{}`", input)))
}

/// Treats `-` and empty strings as an omitted positional argument.
pub(crate) fn optional_arg<'a>(args: &[&'a str], idx: usize) -> Option<&'a str> {
    args.get(idx)
        .copied()
        .filter(|value| !value.is_empty() && *value != "-")
}

pub(crate) fn short_id(id: Uuid) -> String {
    let mut short = id.simple().to_string();
    short.truncate(8);
    short
}

/// Resolves a full template id or a unique prefix of one.
pub(crate) fn resolve_template_id(
    profile: &UserProfile,
    input: &str,
) -> Result<Uuid, CommandError> {
    if let Ok(id) = Uuid::parse_str(input) {
        return Ok(id);
    }
    let needle = input.to_ascii_lowercase().replace('-', "");
    let matches: Vec<Uuid> = profile
        .recurring_expenses
        .iter()
        .map(|template| template.id)
        .filter(|id| !needle.is_empty() && id.simple().to_string().starts_with(&needle))
        .collect();
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(CommandError::InvalidArguments(format!(
            "no recurring expense matches `{}`",
            input
        ))),
        _ => Err(CommandError::InvalidArguments(format!(
            "`{}` matches several recurring expenses; use more characters",
            input
        ))),
    }
}

pub(crate) fn format_amount(amount: f64) -> String {
    format!("{:.2}", amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use expense_domain::{Frequency, RecurringExpense, User};

    fn profile_with(templates: Vec<RecurringExpense>) -> UserProfile {
        let mut user = User::new("alice", "hash");
        user.recurring_expenses = templates;
        user.profile()
    }

    fn template() -> RecurringExpense {
        RecurringExpense::new(
            "Rent",
            1200.0,
            Frequency::Monthly,
            NaiveDate::from_ymd_opt(2024, 1, 10).expect("date"),
        )
    }

    #[test]
    fn amounts_must_be_finite_numbers() {
        assert_eq!(parse_amount("12.5").expect("amount"), 12.5);
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("NaN").is_err());
        assert!(parse_amount("inf").is_err());
    }

    #[test]
    fn dash_marks_an_omitted_argument() {
        let args = ["Rent", "-", "Housing"];
        assert_eq!(optional_arg(&args, 1), None);
        assert_eq!(optional_arg(&args, 2), Some("Housing"));
        assert_eq!(optional_arg(&args, 3), None);
    }

    #[test]
    fn template_ids_resolve_from_prefixes() {
        let rent = template();
        let profile = profile_with(vec![rent.clone()]);

        assert_eq!(
            resolve_template_id(&profile, &short_id(rent.id)).expect("prefix"),
            rent.id
        );
        assert_eq!(
            resolve_template_id(&profile, &rent.id.to_string()).expect("full id"),
            rent.id
        );
        assert!(resolve_template_id(&profile, "zzzz").is_err());
        assert!(resolve_template_id(&profile, "").is_err());
    }

    #[test]
    fn bad_dates_name_the_expected_format() {
        let err = parse_date_arg("03/05/2024").expect_err("bad date");
        assert!(err.to_string().contains("YYYY-MM-DD"));
    }
}
