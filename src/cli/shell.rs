//! Read-eval loop shared by the interactive editor and scripted stdin.

use std::io::{self, BufRead, Lines, StdinLock};

use rustyline::{
    completion::{Completer, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    history::DefaultHistory,
    validate::Validator,
    Cmd, Context as ReadlineContext, Editor, Helper, KeyEvent,
};

use crate::cli::commands;
use crate::cli::core::{CliError, CliMode, CommandError, LoopControl, ShellContext};
use crate::cli::output::info as output_info;
use crate::config::Config;

/// Environment variable switching the shell to line-by-line stdin input.
pub const SCRIPT_MODE_ENV: &str = "EXPENSE_LEDGER_CLI_SCRIPT";

pub fn run_cli() -> Result<(), CliError> {
    let mode = if std::env::var_os(SCRIPT_MODE_ENV).is_some() {
        CliMode::Script
    } else {
        CliMode::Interactive
    };

    let mut context = ShellContext::new(mode)?;
    let mut source: Box<dyn LineSource> = match mode {
        CliMode::Interactive => {
            let source = EditorSource::new(context.command_names())?;
            output_info("Type `help` to list commands, `exit` to leave.");
            if let Err(err) = commands::expense::show_home(&mut context) {
                context.report_error(err)?;
            }
            Box::new(source)
        }
        CliMode::Script => Box::new(StdinSource::new()),
    };

    drive(&mut context, source.as_mut())
}

/// What a line source produced for one prompt.
enum ReadOutcome {
    Line(String),
    /// Ctrl-C at the prompt.
    Interrupted,
    Finished,
}

trait LineSource {
    fn next_line(&mut self, prompt: &str) -> Result<ReadOutcome, CliError>;
}

struct EditorSource {
    editor: Editor<ShellHelper, DefaultHistory>,
}

impl EditorSource {
    fn new(commands: Vec<&'static str>) -> Result<Self, CliError> {
        let mut editor = Editor::<ShellHelper, DefaultHistory>::new()?;
        editor.set_helper(Some(ShellHelper::new(commands)));
        editor.bind_sequence(KeyEvent::from('?'), Cmd::Complete);
        Ok(Self { editor })
    }
}

impl LineSource for EditorSource {
    fn next_line(&mut self, prompt: &str) -> Result<ReadOutcome, CliError> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    self.editor.add_history_entry(trimmed).ok();
                }
                Ok(ReadOutcome::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => {
                output_info("Exiting shell.");
                Ok(ReadOutcome::Finished)
            }
            Err(err) => Err(err.into()),
        }
    }
}

struct StdinSource {
    lines: Lines<StdinLock<'static>>,
}

impl StdinSource {
    fn new() -> Self {
        Self {
            lines: io::stdin().lock().lines(),
        }
    }
}

impl LineSource for StdinSource {
    fn next_line(&mut self, _prompt: &str) -> Result<ReadOutcome, CliError> {
        match self.lines.next() {
            Some(line) => Ok(ReadOutcome::Line(line?)),
            None => Ok(ReadOutcome::Finished),
        }
    }
}

fn drive(context: &mut ShellContext, source: &mut dyn LineSource) -> Result<(), CliError> {
    while context.running {
        let prompt = context.prompt();
        match source.next_line(&prompt)? {
            ReadOutcome::Line(line) => match handle_line(context, &line) {
                Ok(LoopControl::Continue) => {}
                Ok(LoopControl::Exit) => break,
                Err(err) => context.report_error(err)?,
            },
            ReadOutcome::Interrupted if context.service.editing().is_some() => {
                context.service.cancel_edit();
                output_info("Edit cancelled.");
            }
            ReadOutcome::Interrupted => {
                if context.confirm_exit()? {
                    break;
                }
            }
            ReadOutcome::Finished => break,
        }
    }
    Ok(())
}

/// Runs one input line. Blank lines and `#` comments are skipped.
pub(crate) fn handle_line(
    context: &mut ShellContext,
    line: &str,
) -> Result<LoopControl, CommandError> {
    let tokens = match shell_words::split(line) {
        Ok(tokens) => tokens,
        Err(err) => {
            context.print_warning(&format!("Could not read that line: {err}"));
            return Ok(LoopControl::Continue);
        }
    };
    let Some((raw, rest)) = tokens.split_first() else {
        return Ok(LoopControl::Continue);
    };
    if raw.starts_with('#') {
        return Ok(LoopControl::Continue);
    }

    let command = raw.to_lowercase();
    let args: Vec<&str> = rest.iter().map(String::as_str).collect();
    tracing::debug!(command = %command, args = args.len(), "dispatching");

    let outcome = context.dispatch(&command, raw, &args)?;
    if outcome == LoopControl::Exit {
        context.running = false;
    }
    Ok(outcome)
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|word| word.to_string()).collect()
}

/// Completes command names, their sub-commands, and config keys.
struct ShellHelper {
    commands: Vec<String>,
}

impl ShellHelper {
    fn new(names: Vec<&'static str>) -> Self {
        let mut commands: Vec<String> = names.into_iter().map(str::to_ascii_lowercase).collect();
        commands.sort();
        commands.dedup();
        Self { commands }
    }

    /// Words that may follow `preceding` on the command line.
    fn candidates(&self, preceding: &[&str]) -> Vec<String> {
        match preceding {
            [] | ["help"] => self.commands.clone(),
            ["backup"] => owned(&["list", "restore"]),
            ["config"] => owned(&["set", "show"]),
            ["config", "set"] => owned(Config::KEYS),
            _ => Vec::new(),
        }
    }
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let before = &line[..pos];
        let start = before
            .rfind(char::is_whitespace)
            .map(|idx| idx + 1)
            .unwrap_or(0);
        let lowered = before[..start].to_ascii_lowercase();
        let preceding: Vec<&str> = lowered.split_whitespace().collect();
        let needle = before[start..].to_ascii_lowercase();

        let pairs = self
            .candidates(&preceding)
            .into_iter()
            .filter(|word| word.starts_with(&needle))
            .map(|word| Pair {
                display: word.clone(),
                replacement: word,
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;
}

impl Highlighter for ShellHelper {}

impl Validator for ShellHelper {}

impl Helper for ShellHelper {}
