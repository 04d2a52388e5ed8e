use crate::cli::context::{CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::CommandEntry;

use super::usage_error;

const SIGNUP_USAGE: &str = "signup <user> [password]";
const LOGIN_USAGE: &str = "login <user> [password]";

pub(super) fn entries() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("signup", "Create an account and log in", SIGNUP_USAGE, cmd_signup),
        CommandEntry::new(
            "login",
            "Log in and materialize due recurring expenses",
            LOGIN_USAGE,
            cmd_login,
        ),
        CommandEntry::new("logout", "End the current session", "logout", cmd_logout),
        CommandEntry::new("whoami", "Show the logged-in user", "whoami", cmd_whoami),
    ]
}

fn cmd_signup(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let username = args.first().ok_or_else(|| usage_error(SIGNUP_USAGE))?;
    let password = context.password_arg(args.get(1).copied(), true)?;
    let profile = context.service.signup(username, &password)?;
    output::success(format!("Signed up as `{}`.", profile.username));
    context.remember_user(&profile.username)?;
    context.refresh_session(profile);
    Ok(())
}

fn cmd_login(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let username = args.first().ok_or_else(|| usage_error(LOGIN_USAGE))?;
    let password = context.password_arg(args.get(1).copied(), false)?;
    let profile = context.service.login(username, &password)?;
    output::success(format!(
        "Logged in as `{}` ({} expenses, {} recurring).",
        profile.username,
        profile.expenses.len(),
        profile.recurring_expenses.len()
    ));
    context.remember_user(&profile.username)?;
    context.refresh_session(profile);
    Ok(())
}

fn cmd_logout(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    match context.session.take() {
        Some(profile) => output::success(format!("Logged out `{}`.", profile.username)),
        None => output::info("No active session."),
    }
    Ok(())
}

fn cmd_whoami(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    match &context.session {
        Some(profile) => output::info(format!(
            "{} (today is {})",
            profile.username,
            context.today()
        )),
        None => output::info("Not logged in."),
    }
    Ok(())
}
