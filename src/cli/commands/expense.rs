//! Commands that read or change the expense list.

use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::section as output_section;
use crate::cli::registry::CommandEntry;
use crate::cli::render;
use crate::domain::{Cost, Displayable};

const ADD_USAGE: &str = "add <item> <cost>";
const EDIT_USAGE: &str = "edit <#|id> [item] [cost]";
const DELETE_USAGE: &str = "delete <#|id> | delete --date <timestamp>";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "home",
            "Show expenses, total, and spend per day",
            "home",
            cmd_home,
        ),
        CommandEntry::new("list", "List all expenses", "list", cmd_list),
        CommandEntry::new("add", "Record a new expense", ADD_USAGE, cmd_add),
        CommandEntry::new("edit", "Change an expense's item or cost", EDIT_USAGE, cmd_edit),
        CommandEntry::new("delete", "Remove an expense", DELETE_USAGE, cmd_delete),
        CommandEntry::new("total", "Show the sum of all expenses", "total", cmd_total),
        CommandEntry::new("chart", "Show spend grouped by day", "chart", cmd_chart),
    ]
}

/// Home screen: the list followed by total and chart.
pub(crate) fn show_home(context: &mut ShellContext) -> CommandResult {
    output_section("Your Expenses");
    if context.service.ledger().is_empty() {
        io::print_info("No expenses yet");
        return Ok(());
    }
    print_table(context);
    print_total(context);
    print_chart(context);
    Ok(())
}

fn cmd_home(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    show_home(context)
}

fn cmd_list(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    if context.service.ledger().is_empty() {
        io::print_info("No expenses yet");
        return Ok(());
    }
    print_table(context);
    Ok(())
}

fn cmd_total(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    print_total(context);
    Ok(())
}

fn cmd_chart(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let series = context.service.chart_series();
    if series.is_empty() {
        io::print_info("Nothing to chart yet");
        return Ok(());
    }
    print_chart(context);
    Ok(())
}

fn cmd_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (item, cost) = match split_item_and_cost(args) {
        (Some(item), Some(cost)) => (item, cost),
        (item, _) if context.is_interactive() => {
            let item = match item {
                Some(item) => item,
                None => io::prompt_text(&context.theme, "Item", None)?,
            };
            let cost = io::prompt_text(&context.theme, "Cost", None)?;
            (item, cost)
        }
        _ => return Err(CommandError::InvalidArguments(format!("usage: {}", ADD_USAGE))),
    };

    let id = context.service.add(&item, Cost::from(cost))?;
    if let Some(record) = context.service.ledger().get(id) {
        io::print_success(format!(
            "Submitted {} ({})",
            record.item,
            context.format_cost(record)
        ));
    }
    Ok(())
}

fn cmd_edit(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let usage = format!("usage: {}", EDIT_USAGE);
    let Some(record) =
        context.expense_from_arg(args.first().copied(), &usage, "Select an expense to edit")?
    else {
        return Ok(());
    };
    let Some(mut draft) = context.service.begin_edit(record.id) else {
        return Err(CommandError::InvalidArguments(usage));
    };

    let rest = args.get(1..).unwrap_or_default();
    let result = match split_item_and_cost(rest) {
        (Some(item), Some(cost)) => {
            draft.item = item;
            draft.cost = Cost::from(cost);
            Ok(())
        }
        (Some(item), None) => {
            draft.item = item;
            Ok(())
        }
        _ if context.is_interactive() => prompt_edit(context, &mut draft),
        _ => Err(CommandError::InvalidArguments(usage)),
    };
    if let Err(err) = result {
        context.service.cancel_edit();
        return Err(err);
    }

    match context.service.edit(draft) {
        Ok(_) => {
            if let Some(updated) = context.service.ledger().get(record.id) {
                io::print_success(format!(
                    "Updated {} ({})",
                    updated.item,
                    context.format_cost(updated)
                ));
            }
            Ok(())
        }
        Err(err) => {
            context.service.cancel_edit();
            Err(err.into())
        }
    }
}

fn prompt_edit(
    context: &ShellContext,
    draft: &mut crate::domain::ExpenseRecord,
) -> Result<(), CommandError> {
    draft.item = io::prompt_text(&context.theme, "Item", Some(&draft.item))?;
    let cost = io::prompt_text(&context.theme, "Cost", Some(&draft.cost.to_string()))?;
    draft.cost = Cost::from(cost);
    Ok(())
}

fn cmd_delete(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if let Some(&"--date") = args.first() {
        let Some(date) = args.get(1) else {
            return Err(CommandError::InvalidArguments(format!("usage: {}", DELETE_USAGE)));
        };
        return match context.service.delete_by_date(date)? {
            Some(removed) => {
                io::print_success(format!("Deleted {}", removed.display_label()));
                Ok(())
            }
            None => {
                io::print_warning(format!("No expense recorded at `{}`.", date));
                Ok(())
            }
        };
    }

    let usage = format!("usage: {}", DELETE_USAGE);
    let Some(record) =
        context.expense_from_arg(args.first().copied(), &usage, "Select an expense to delete")?
    else {
        return Ok(());
    };

    if context.is_interactive() {
        let prompt = format!("Delete {}?", record.display_label());
        if !io::confirm_action(&context.theme, &prompt, false)? {
            io::print_info("Delete cancelled.");
            return Ok(());
        }
    }

    if let Some(removed) = context.service.delete(record.id)? {
        io::print_success(format!("Deleted {}", removed.display_label()));
    }
    Ok(())
}

/// Splits `[item words..] cost`: the last argument is the cost and the rest
/// form the item. A single argument is treated as the item alone.
fn split_item_and_cost(args: &[&str]) -> (Option<String>, Option<String>) {
    match args {
        [] => (None, None),
        [item] => (Some(item.to_string()), None),
        [item @ .., cost] => (Some(item.join(" ")), Some(cost.to_string())),
    }
}

fn print_table(context: &ShellContext) {
    for line in render::expense_table(context.service.records(), &context.config) {
        io::print_info(line);
    }
}

fn print_total(context: &ShellContext) {
    let non_numeric = context.service.ledger().non_numeric().count();
    io::print_info(render::total_line(context.service.total(), &context.config));
    if non_numeric > 0 {
        io::print_hint(format!(
            "{} expense(s) with a non-numeric cost are counted as 0.",
            non_numeric
        ));
    }
}

fn print_chart(context: &ShellContext) {
    let series = context.service.chart_series();
    if series.is_empty() {
        return;
    }
    output_section("Spend per day");
    for line in render::chart_lines(&series, &context.config) {
        io::print_info(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_argument_is_the_cost() {
        assert_eq!(
            split_item_and_cost(&["Iced", "coffee", "4.50"]),
            (Some("Iced coffee".into()), Some("4.50".into()))
        );
        assert_eq!(split_item_and_cost(&["Bagel"]), (Some("Bagel".into()), None));
        assert_eq!(split_item_and_cost(&[]), (None, None));
    }
}
