//! Shell dispatch, error types, and helpers shared by command handlers.

use std::path::PathBuf;

use dialoguer::theme::ColorfulTheme;
use rustyline::error::ReadlineError;
use strsim::levenshtein;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::{ConfigError, ConfigManager},
    core::{ExpenseService, LoadReport},
    domain::ExpenseRecord,
    errors::LedgerError,
    storage::JsonFileStore,
    utils::paths,
};

use super::commands;
use super::io as cli_io;
use super::output::{self, OutputPreferences};
use super::registry::{CommandEntry, CommandRegistry};
pub use super::shell_context::{CliMode, ShellContext};

/// Shortest id prefix accepted when addressing an expense.
const MIN_ID_PREFIX: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub type CommandResult = Result<(), CommandError>;

/// Errors raised by individual commands; reported without leaving the shell.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Input error: {0}")]
    Input(String),
    #[error("exit requested")]
    ExitRequested,
}

impl From<dialoguer::Error> for CommandError {
    fn from(err: dialoguer::Error) -> Self {
        CommandError::Input(err.to_string())
    }
}

/// Errors that stop the shell itself.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Readline error: {0}")]
    Readline(#[from] ReadlineError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        Self::with_base_dir(mode, paths::app_data_dir())
    }

    pub fn with_base_dir(mode: CliMode, base: PathBuf) -> Result<Self, CliError> {
        let mut registry = CommandRegistry::new();
        commands::register_all(&mut registry);

        let config_manager = ConfigManager::with_base_dir(base.clone())?;
        let config = config_manager.load()?;
        let store =
            JsonFileStore::with_retention(paths::store_dir_in(&base), config.backup_retention)?;
        let mut service = ExpenseService::new(Box::new(store.clone()));
        if let Err(err) = service.set_chart_label_format(config.chart_label_format.clone()) {
            cli_io::print_warning(err);
        }

        output::set_preferences(OutputPreferences {
            plain: mode == CliMode::Script,
        });
        tracing::debug!(base = %base.display(), ?mode, "starting shell");

        let mut context = ShellContext {
            mode,
            registry,
            service,
            store,
            config_manager,
            config,
            theme: ColorfulTheme::default(),
            running: true,
        };
        context.reload_expenses();
        Ok(context)
    }

    pub(crate) fn is_interactive(&self) -> bool {
        self.mode == CliMode::Interactive
    }

    pub(crate) fn prompt(&self) -> String {
        format!("expenses [{}]> ", self.service.ledger().len())
    }

    pub(crate) fn command_names(&self) -> Vec<&'static str> {
        self.registry.names().collect()
    }

    pub(crate) fn command(&self, name: &str) -> Option<&CommandEntry> {
        self.registry.get(name)
    }

    /// Reads the persisted ledger, reporting problems without aborting.
    pub(crate) fn reload_expenses(&mut self) -> Option<LoadReport> {
        match self.service.load() {
            Ok(report) => {
                if report.assigned_ids > 0 {
                    cli_io::print_info(format!(
                        "Assigned identifiers to {} older expense(s).",
                        report.assigned_ids
                    ));
                }
                if report.non_numeric > 0 {
                    cli_io::print_warning(format!(
                        "{} expense(s) have a non-numeric cost and count as 0.",
                        report.non_numeric
                    ));
                }
                Some(report)
            }
            Err(err) => {
                cli_io::print_warning(format!("Could not load saved expenses: {err}"));
                None
            }
        }
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

    pub(crate) fn suggest_command(&self, input: &str) {
        cli_io::print_warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));

        let best = self
            .registry
            .names()
            .map(|key| (levenshtein(key, &input.to_lowercase()), key))
            .min_by_key(|(distance, _)| *distance);

        if let Some((distance, name)) = best {
            if distance <= 3 {
                cli_io::print_hint(format!("Did you mean `{}`?", name));
            }
        }
    }

    pub(crate) fn confirm_exit(&self) -> Result<bool, CliError> {
        if !self.is_interactive() {
            return Ok(true);
        }
        cli_io::confirm_action(&self.theme, "Exit shell?", true).or(Ok(true))
    }

    pub(crate) fn report_error(&self, err: CommandError) -> Result<(), CliError> {
        match err {
            CommandError::ExitRequested => {}
            CommandError::InvalidArguments(message) => {
                cli_io::print_error(message);
                cli_io::print_hint("Use `help <command>` for usage details.");
            }
            other => cli_io::print_error(other),
        }
        Ok(())
    }

    pub(crate) fn print_warning(&self, message: &str) {
        cli_io::print_warning(message);
    }

    /// Resolves a 1-based list position, a full id, or a unique id prefix.
    pub(crate) fn resolve_expense(&self, selector: &str) -> Result<ExpenseRecord, CommandError> {
        let records = self.service.records();
        let selector = selector.trim().trim_start_matches('#');

        if let Ok(position) = selector.parse::<usize>() {
            return position
                .checked_sub(1)
                .and_then(|idx| records.get(idx))
                .cloned()
                .ok_or_else(|| {
                    CommandError::InvalidArguments(format!(
                        "no expense at position {} (the list has {})",
                        position,
                        records.len()
                    ))
                });
        }

        if let Ok(id) = Uuid::parse_str(selector) {
            return self.service.ledger().get(id).cloned().ok_or_else(|| {
                CommandError::Ledger(LedgerError::NotFound(id.to_string()))
            });
        }

        let prefix = selector.to_ascii_lowercase();
        if prefix.len() < MIN_ID_PREFIX {
            return Err(CommandError::InvalidArguments(format!(
                "`{}` is neither a list position nor an expense id",
                selector
            )));
        }
        let mut matches = records
            .iter()
            .filter(|record| record.id.to_string().starts_with(&prefix));
        match (matches.next(), matches.next()) {
            (Some(record), None) => Ok(record.clone()),
            (Some(_), Some(_)) => Err(CommandError::InvalidArguments(format!(
                "id prefix `{}` matches more than one expense",
                selector
            ))),
            (None, _) => Err(CommandError::Ledger(LedgerError::NotFound(
                selector.to_string(),
            ))),
        }
    }

    /// Picks an expense from `args[0]`, or interactively when no argument is
    /// given. `Ok(None)` means the user backed out.
    pub(crate) fn expense_from_arg(
        &self,
        arg: Option<&str>,
        usage: &str,
        prompt: &str,
    ) -> Result<Option<ExpenseRecord>, CommandError> {
        if let Some(selector) = arg {
            return self.resolve_expense(selector).map(Some);
        }
        if !self.is_interactive() {
            return Err(CommandError::InvalidArguments(usage.to_string()));
        }
        let records = self.service.records();
        if records.is_empty() {
            cli_io::print_info("No expenses yet");
            return Ok(None);
        }
        let labels: Vec<String> = records
            .iter()
            .map(|record| format!("{} ({})", record.item, self.format_cost(record)))
            .collect();
        let choice = cli_io::select_item(&self.theme, prompt, &labels)?;
        Ok(choice.and_then(|idx| records.get(idx).cloned()))
    }

    /// Cost as currency when numeric, otherwise the text the user typed.
    pub(crate) fn format_cost(&self, record: &ExpenseRecord) -> String {
        match record.amount() {
            Some(amount) => self.config.format_amount(amount),
            None => record.cost.to_string(),
        }
    }
}
