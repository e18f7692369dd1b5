use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::section as output_section;
use crate::cli::registry::CommandEntry;
use crate::config::Config;

const CONFIG_USAGE: &str = "config [show|set <key> <value>]";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "config",
        "View and change display and storage preferences",
        CONFIG_USAGE,
        cmd_config,
    )]
}

fn cmd_config(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if args.is_empty() || args[0].eq_ignore_ascii_case("show") {
        return show_config(context);
    }

    match args[0].to_lowercase().as_str() {
        "set" => {
            if args.len() < 3 {
                return Err(CommandError::InvalidArguments(format!(
                    "usage: config set <{}> <value>",
                    Config::KEYS.join("|")
                )));
            }
            let key = args[1].to_lowercase();
            let value = args[2..].join(" ");
            set_config_value(context, &key, &value)
        }
        _ => Err(CommandError::InvalidArguments(format!(
            "usage: {}",
            CONFIG_USAGE
        ))),
    }
}

fn show_config(context: &ShellContext) -> CommandResult {
    output_section("Configuration");
    for (key, value) in context.config.entries() {
        io::print_info(format!("  {:<20} {}", key, value));
    }
    io::print_hint(format!("Stored at {}", context.config_manager.path().display()));
    Ok(())
}

fn set_config_value(context: &mut ShellContext, key: &str, value: &str) -> CommandResult {
    let mut updated = context.config.clone();
    updated.set(key, value)?;
    context.config_manager.save(&updated)?;
    context.config = updated;

    if key == "chart_label_format" {
        context
            .service
            .set_chart_label_format(context.config.chart_label_format.clone())?;
    }
    io::print_success(format!("{} set to `{}`.", key, value.trim()));
    if key == "backup_retention" {
        io::print_hint("The new retention applies the next time the shell starts.");
    }
    tracing::info!(key, "configuration updated");
    Ok(())
}
