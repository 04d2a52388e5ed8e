//! Shell state, dispatch and error reporting.

use std::{env, io, path::PathBuf, sync::Arc};

use chrono::NaiveDate;
use dialoguer::{theme::ColorfulTheme, Confirm, Password};
use uuid::Uuid;

use expense_config::{default_app_dir, Config, ConfigError, ConfigManager};
use expense_core::{Clock, CoreError, FixedClock, SystemClock, UserService};
use expense_domain::{parse_date, UserProfile};
use expense_storage_json::JsonUserStorage;

use crate::cli::{commands, output, registry::CommandRegistry};
use crate::AppError;

/// Environment variable pinning the shell's notion of today (`YYYY-MM-DD`).
pub const TODAY_ENV: &str = "EXPENSE_TRACKER_TODAY";
/// Set to run the shell non-interactively over stdin.
pub const SCRIPT_ENV: &str = "EXPENSE_TRACKER_CLI_SCRIPT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub type CommandResult = Result<(), CommandError>;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Not logged in.")]
    NotLoggedIn,
    #[error("{0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Dialoguer(#[from] dialoguer::Error),
    #[error("exit requested")]
    ExitRequested,
}

impl From<CommandError> for AppError {
    fn from(err: CommandError) -> Self {
        AppError::Command(err.to_string())
    }
}

pub struct ShellContext {
    pub mode: CliMode,
    pub registry: CommandRegistry,
    pub theme: ColorfulTheme,
    pub service: UserService,
    pub storage: JsonUserStorage,
    pub config_manager: ConfigManager,
    pub config: Config,
    pub session: Option<UserProfile>,
    pub last_command: Option<String>,
    pub running: bool,
}

impl ShellContext {
    /// Builds a shell rooted at the application directory, honoring
    /// `EXPENSE_TRACKER_TODAY` for the clock.
    pub fn new(mode: CliMode) -> Result<Self, AppError> {
        Self::with_paths(mode, default_app_dir(), clock_from_env()?)
    }

    pub fn with_paths(
        mode: CliMode,
        app_dir: PathBuf,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        let config_manager = ConfigManager::with_base_dir(app_dir.clone())?;
        let config = config_manager.load()?;
        crate::init_with_filter(&config.log_filter);

        let data_root = config.data_root.clone().unwrap_or(app_dir);
        let storage = JsonUserStorage::with_retention(
            data_root.join("users"),
            data_root.join("backups"),
            config.backup_retention,
        )?;
        let service = UserService::new(Box::new(storage.clone()), clock);

        let mut registry = CommandRegistry::new();
        commands::register_all(&mut registry);

        tracing::debug!(data_root = %data_root.display(), ?mode, "shell initialized");

        Ok(Self {
            mode,
            registry,
            theme: ColorfulTheme::default(),
            service,
            storage,
            config_manager,
            config,
            session: None,
            last_command: None,
            running: true,
        })
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        self.registry.names().collect()
    }

    pub fn prompt(&self) -> String {
        match &self.session {
            Some(profile) => format!("expense-tracker ({})> ", profile.username),
            None => "expense-tracker> ".to_string(),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.service.clock().today()
    }

    pub(crate) fn require_session(&self) -> Result<&UserProfile, CommandError> {
        self.session.as_ref().ok_or(CommandError::NotLoggedIn)
    }

    pub(crate) fn user_id(&self) -> Result<Uuid, CommandError> {
        self.require_session().map(|profile| profile.id)
    }

    /// Installs the latest view of the logged-in user's document.
    pub(crate) fn refresh_session(&mut self, profile: UserProfile) {
        self.session = Some(profile);
    }

    pub(crate) fn remember_user(&mut self, username: &str) -> CommandResult {
        if self.config.last_user.as_deref() == Some(username) {
            return Ok(());
        }
        self.config.last_user = Some(username.to_string());
        self.config_manager.save(&self.config)?;
        Ok(())
    }

    /// Takes the password from `arg`, or asks for it when interactive.
    pub(crate) fn password_arg(
        &self,
        arg: Option<&str>,
        confirm: bool,
    ) -> Result<String, CommandError> {
        if let Some(password) = arg {
            return Ok(password.to_string());
        }
        if self.mode == CliMode::Script {
            return Err(CommandError::InvalidArguments(
                "a password argument is required in script mode".into(),
            ));
        }
        let prompt = Password::with_theme(&self.theme).with_prompt("Password");
        let prompt = if confirm {
            prompt.with_confirmation("Confirm password", "Passwords do not match")
        } else {
            prompt
        };
        Ok(prompt.interact()?)
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        if let Some(handler) = self.registry.handler(command) {
            match handler(self, args) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
                Err(err) => Err(err),
            }
        } else {
            self.suggest_command(raw);
            Ok(LoopControl::Continue)
        }
    }

    #[cfg(test)]
    pub(crate) fn process_line(&mut self, line: &str) -> Result<LoopControl, CommandError> {
        let tokens = match crate::cli::shell::parse_command_line(line) {
            Ok(tokens) => tokens,
            Err(err) => {
                output::warning(err);
                return Ok(LoopControl::Continue);
            }
        };
        let Some((raw, rest)) = tokens.split_first() else {
            return Ok(LoopControl::Continue);
        };
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();
        self.dispatch(&raw.to_lowercase(), raw, &args)
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        output::warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));

        if let Some(name) = self.registry.suggest(input) {
            output::hint(format!("Did you mean `{}`?", name));
        }
    }

    pub(crate) fn confirm_exit(&self) -> Result<bool, AppError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        Confirm::with_theme(&self.theme)
            .with_prompt("Exit shell?")
            .default(true)
            .interact()
            .map_err(|err| AppError::Input(err.to_string()))
    }

    pub(crate) fn report_error(&self, err: CommandError) {
        match err {
            CommandError::ExitRequested => {}
            CommandError::InvalidArguments(message) => {
                output::error(message);
                output::hint("Use `help <command>` for usage details.");
            }
            CommandError::NotLoggedIn => {
                output::error("Not logged in.");
                output::hint("Use `login <user>` or `signup <user>` first.");
            }
            other => output::error(other),
        }
    }
}

/// System clock, or a fixed day when `EXPENSE_TRACKER_TODAY` is set.
pub fn clock_from_env() -> Result<Arc<dyn Clock>, AppError> {
    match env::var(TODAY_ENV) {
        Ok(raw) if !raw.trim().is_empty() => {
            let today = parse_date(raw.trim()).ok_or_else(|| {
                AppError::Input(format!("{TODAY_ENV} must be YYYY-MM-DD, got `{raw}`"))
            })?;
            Ok(Arc::new(FixedClock::new(today)))
        }
        _ => Ok(Arc::new(SystemClock)),
    }
}

#[cfg(test)]
pub(crate) fn process_script(
    app_dir: PathBuf,
    today: NaiveDate,
    lines: &[&str],
) -> Result<ShellContext, AppError> {
    let clock = Arc::new(FixedClock::new(today));
    let mut app = ShellContext::with_paths(CliMode::Script, app_dir, clock)?;
    for line in lines {
        match app.process_line(line)? {
            LoopControl::Continue => {}
            LoopControl::Exit => break,
        }
    }
    Ok(app)
}
