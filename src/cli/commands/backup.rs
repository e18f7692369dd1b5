use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::section as output_section;
use crate::cli::registry::CommandEntry;
use crate::ledger::EXPENSES_KEY;
use crate::storage::BackupInfo;

const BACKUP_USAGE: &str = "backup [list|restore <name|#>]";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "backup",
        "List or restore earlier versions of the expense list",
        BACKUP_USAGE,
        cmd_backup,
    )]
}

fn cmd_backup(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args.first().map(|arg| arg.to_lowercase()).as_deref() {
        None | Some("list") => list_backups(context),
        Some("restore") => restore_backup(context, args.get(1).copied()),
        Some(_) => Err(CommandError::InvalidArguments(format!(
            "usage: {}",
            BACKUP_USAGE
        ))),
    }
}

fn list_backups(context: &ShellContext) -> CommandResult {
    let backups = context.store.list_backups(EXPENSES_KEY)?;
    output_section("Backups");
    if backups.is_empty() {
        io::print_info("No backups yet. One is taken before every save.");
        return Ok(());
    }
    for (idx, backup) in backups.iter().enumerate() {
        io::print_info(format!(
            "  {:>2}. {}  {}",
            idx + 1,
            backup.name,
            created_label(backup)
        ));
    }
    Ok(())
}

fn restore_backup(context: &mut ShellContext, reference: Option<&str>) -> CommandResult {
    let backups = context.store.list_backups(EXPENSES_KEY)?;
    if backups.is_empty() {
        io::print_warning("No backups available.");
        return Ok(());
    }

    let name = match reference {
        Some(reference) => resolve_reference(&backups, reference)?,
        None if context.is_interactive() => {
            let labels: Vec<String> = backups
                .iter()
                .map(|backup| format!("{}  {}", backup.name, created_label(backup)))
                .collect();
            match io::select_item(&context.theme, "Select a backup to restore", &labels)? {
                Some(idx) => backups[idx].name.clone(),
                None => {
                    io::print_info("Restore cancelled.");
                    return Ok(());
                }
            }
        }
        None => {
            return Err(CommandError::InvalidArguments(
                "usage: backup restore <name|#>".into(),
            ))
        }
    };

    if context.is_interactive() {
        let prompt = format!("Replace the current expenses with `{}`?", name);
        if !io::confirm_action(&context.theme, &prompt, false)? {
            io::print_info("Restore cancelled.");
            return Ok(());
        }
    }

    context.store.restore_backup(EXPENSES_KEY, &name)?;
    let report = context.reload_expenses();
    let count = report.map(|report| report.count).unwrap_or_default();
    io::print_success(format!("Restored {} ({} expense(s)).", name, count));
    Ok(())
}

/// Accepts a backup file name or its 1-based position in `backup list`.
fn resolve_reference(backups: &[BackupInfo], reference: &str) -> Result<String, CommandError> {
    if let Ok(position) = reference.parse::<usize>() {
        return position
            .checked_sub(1)
            .and_then(|idx| backups.get(idx))
            .map(|backup| backup.name.clone())
            .ok_or_else(|| {
                CommandError::InvalidArguments(format!("no backup at position {}", position))
            });
    }
    backups
        .iter()
        .find(|backup| backup.name == reference || backup.name.trim_end_matches(".json") == reference)
        .map(|backup| backup.name.clone())
        .ok_or_else(|| CommandError::InvalidArguments(format!("backup `{}` not found", reference)))
}

fn created_label(backup: &BackupInfo) -> String {
    backup
        .created_at
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown time".into())
}
