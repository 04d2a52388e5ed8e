use expense_core::RecurrenceService;
use expense_domain::{format_date, Frequency, RecurringExpense};

use crate::cli::context::{CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::CommandEntry;

use super::{
    format_amount, optional_arg, parse_amount, parse_date_arg, resolve_template_id, short_id,
    usage_error,
};

const ADD_USAGE: &str = "add-recurring <name> <amount> <frequency> <start-date> [day-of-month|-] [category] [payment-type]";
const PAUSE_USAGE: &str = "pause <template-id>";
const RESUME_USAGE: &str = "resume <template-id>";
const REMOVE_USAGE: &str = "remove-recurring <template-id>";

pub(super) fn entries() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "add-recurring",
            "Create a recurring expense template",
            ADD_USAGE,
            cmd_add_recurring,
        ),
        CommandEntry::new(
            "recurring",
            "List recurring expense templates",
            "recurring",
            cmd_recurring,
        ),
        CommandEntry::new("pause", "Stop a template from generating", PAUSE_USAGE, cmd_pause),
        CommandEntry::new(
            "resume",
            "Let a paused template generate again",
            RESUME_USAGE,
            cmd_resume,
        ),
        CommandEntry::new(
            "remove-recurring",
            "Delete a template, keeping its generated expenses",
            REMOVE_USAGE,
            cmd_remove_recurring,
        ),
        CommandEntry::new(
            "generate",
            "Materialize due recurring expenses up to a date",
            "generate [date]",
            cmd_generate,
        ),
        CommandEntry::new(
            "check",
            "Report inconsistencies in the stored data",
            "check",
            cmd_check,
        ),
    ]
}

fn cmd_add_recurring(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let user_id = context.user_id()?;
    if args.len() < 4 {
        return Err(usage_error(ADD_USAGE));
    }
    let amount = parse_amount(args[1])?;
    let frequency = args[2]
        .parse::<Frequency>()
        .map_err(|err| CommandError::InvalidArguments(err.to_string()))?;
    let start_date = parse_date_arg(args[3])?;

    let mut template = RecurringExpense::new(args[0], amount, frequency, start_date);
    if let Some(day) = optional_arg(args, 4) {
        let day = day.parse::<u32>().map_err(|_| {
            CommandError::InvalidArguments(format!("invalid day of month `{day}`"))
        })?;
        template = template.with_day_of_month(day);
    }
    if let Some(category) = optional_arg(args, 5) {
        template = template.with_category(category);
    }
    if let Some(payment_type) = optional_arg(args, 6) {
        template = template.with_payment_type(payment_type);
    }

    let id = template.id;
    let profile = context.service.add_recurring(user_id, template)?;
    output::success(format!(
        "Added recurring expense `{}` [{}], {} from {}.",
        args[0],
        short_id(id),
        frequency,
        format_date(start_date)
    ));
    context.refresh_session(profile);
    Ok(())
}

fn cmd_recurring(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let today = context.today();
    let profile = context.require_session()?;
    if profile.recurring_expenses.is_empty() {
        output::info("No recurring expenses.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = profile
        .recurring_expenses
        .iter()
        .map(|template| {
            vec![
                short_id(template.id),
                template.name.clone(),
                format_amount(template.amount),
                template.frequency.to_string(),
                template
                    .day_of_month
                    .map(|day| day.to_string())
                    .unwrap_or_else(|| "-".into()),
                format_date(template.start_date),
                template
                    .last_generated
                    .map(format_date)
                    .unwrap_or_else(|| "never".into()),
                RecurrenceService::next_occurrence(template, today)
                    .map(format_date)
                    .unwrap_or_else(|| "-".into()),
                if template.active { "active" } else { "paused" }.to_string(),
            ]
        })
        .collect();

    output::section("Recurring expenses");
    output::table(
        &[
            "Id", "Name", "Amount", "Frequency", "Day", "Start", "Last", "Next", "Status",
        ],
        &rows,
    );
    Ok(())
}

fn cmd_pause(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    set_active(context, args, false, PAUSE_USAGE)
}

fn cmd_resume(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    set_active(context, args, true, RESUME_USAGE)
}

fn set_active(
    context: &mut ShellContext,
    args: &[&str],
    active: bool,
    usage: &str,
) -> CommandResult {
    let input = args.first().ok_or_else(|| usage_error(usage))?;
    let profile = context.require_session()?;
    let (user_id, template_id) = (profile.id, resolve_template_id(profile, input)?);

    let profile = context
        .service
        .set_recurring_active(user_id, template_id, active)?;
    let verb = if active { "Resumed" } else { "Paused" };
    output::success(format!("{verb} recurring expense [{}].", short_id(template_id)));
    context.refresh_session(profile);
    Ok(())
}

fn cmd_remove_recurring(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let input = args.first().ok_or_else(|| usage_error(REMOVE_USAGE))?;
    let profile = context.require_session()?;
    let (user_id, template_id) = (profile.id, resolve_template_id(profile, input)?);

    let profile = context.service.remove_recurring(user_id, template_id)?;
    output::success(format!(
        "Removed recurring expense [{}]; its expenses were kept.",
        short_id(template_id)
    ));
    context.refresh_session(profile);
    Ok(())
}

fn cmd_generate(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let user_id = context.user_id()?;
    let reference = args.first().map(|raw| parse_date_arg(raw)).transpose()?;

    let report = context.service.generate_recurring(user_id, reference)?;
    if report.created.is_empty() {
        output::info(format!(
            "Nothing due as of {}.",
            format_date(report.reference)
        ));
    } else {
        output::success(format!(
            "Generated {} expenses as of {}.",
            report.created.len(),
            format_date(report.reference)
        ));
        for expense in &report.created {
            output::info(format!(
                "  {}  {}  {}",
                format_date(expense.date),
                expense.name,
                format_amount(expense.amount)
            ));
        }
    }

    let profile = context.service.profile(user_id)?;
    context.refresh_session(profile);
    Ok(())
}

fn cmd_check(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let user_id = context.user_id()?;
    let warnings = context.service.integrity_warnings(user_id)?;
    if warnings.is_empty() {
        output::success("No integrity issues found.");
    } else {
        for warning in &warnings {
            output::warning(warning);
        }
    }

    if let Some(profile) = &context.session {
        let backups = context.storage.list_backups(&profile.username)?;
        output::info(format!(
            "{} backups kept (retention {}).",
            backups.len(),
            context.storage.retention()
        ));
    }
    Ok(())
}
