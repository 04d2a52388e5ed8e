use expense_domain::{format_date, Expense};

use crate::cli::context::{CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::CommandEntry;

use super::{format_amount, optional_arg, parse_amount, parse_date_arg, short_id, usage_error};

const ADD_USAGE: &str = "add-expense <date> <amount> <name> [category] [payment-type]";

pub(super) fn entries() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("add-expense", "Record a one-off expense", ADD_USAGE, cmd_add_expense),
        CommandEntry::new("expenses", "List recorded expenses", "expenses", cmd_expenses),
    ]
}

fn cmd_add_expense(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let user_id = context.user_id()?;
    if args.len() < 3 {
        return Err(usage_error(ADD_USAGE));
    }
    let date = parse_date_arg(args[0])?;
    let amount = parse_amount(args[1])?;
    let mut expense = Expense::manual(date, args[2], amount);
    if let Some(category) = optional_arg(args, 3) {
        expense = expense.with_category(category);
    }
    if let Some(payment_type) = optional_arg(args, 4) {
        expense = expense.with_payment_type(payment_type);
    }

    let profile = context.service.add_expense(user_id, expense)?;
    output::success(format!(
        "Recorded `{}` ({}) on {}.",
        args[2],
        format_amount(amount),
        format_date(date)
    ));
    context.refresh_session(profile);
    Ok(())
}

fn cmd_expenses(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let profile = context.require_session()?;
    if profile.expenses.is_empty() {
        output::info("No expenses recorded.");
        return Ok(());
    }

    let mut expenses: Vec<&Expense> = profile.expenses.iter().collect();
    expenses.sort_by_key(|expense| expense.date);

    let rows: Vec<Vec<String>> = expenses
        .iter()
        .map(|expense| {
            vec![
                format_date(expense.date),
                expense.name.clone(),
                format_amount(expense.amount),
                expense.category.clone().unwrap_or_default(),
                expense.payment_type.clone().unwrap_or_default(),
                match expense.recurring_id {
                    Some(id) if expense.is_recurring => format!("recurring {}", short_id(id)),
                    _ => "manual".into(),
                },
            ]
        })
        .collect();

    output::section(format!("Expenses of {}", profile.username));
    output::table(
        &["Date", "Name", "Amount", "Category", "Payment", "Source"],
        &rows,
    );
    let total: f64 = expenses.iter().map(|expense| expense.amount).sum();
    output::info(format!(
        "{} expenses, total {}",
        expenses.len(),
        format_amount(total)
    ));
    Ok(())
}
