//! Plain-text rendering of the expense list, total, and daily chart.

use chrono::Local;

use crate::config::Config;
use crate::domain::ExpenseRecord;
use crate::ledger::ChartSeries;

const ITEM_MAX_WIDTH: usize = 32;
const SHORT_ID_LEN: usize = 8;
const DATE_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";
const BAR_CHAR: char = '█';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Alignment {
    Left,
    Right,
}

struct Column {
    header: &'static str,
    alignment: Alignment,
    max_width: Option<usize>,
}

const COLUMNS: [Column; 5] = [
    Column {
        header: "#",
        alignment: Alignment::Right,
        max_width: None,
    },
    Column {
        header: "ID",
        alignment: Alignment::Left,
        max_width: None,
    },
    Column {
        header: "ITEM",
        alignment: Alignment::Left,
        max_width: Some(ITEM_MAX_WIDTH),
    },
    Column {
        header: "COST",
        alignment: Alignment::Right,
        max_width: None,
    },
    Column {
        header: "DATE",
        alignment: Alignment::Left,
        max_width: None,
    },
];

/// Renders expenses as an aligned table, one line per record in list order.
pub fn expense_table(records: &[ExpenseRecord], config: &Config) -> Vec<String> {
    let rows: Vec<[String; 5]> = records
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            [
                (idx + 1).to_string(),
                short_id(record),
                record.item.clone(),
                cost_cell(record, config),
                date_cell(record),
            ]
        })
        .collect();

    let widths: Vec<usize> = COLUMNS
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let widest = rows
                .iter()
                .map(|row| width_of(&row[idx]))
                .max()
                .unwrap_or(0)
                .max(width_of(column.header));
            column.max_width.map_or(widest, |max| widest.min(max))
        })
        .collect();

    let mut lines = Vec::with_capacity(rows.len() + 2);
    let header: Vec<String> = COLUMNS.iter().map(|c| c.header.to_string()).collect();
    lines.push(render_row(&header, &widths));
    lines.push(
        widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in &rows {
        lines.push(render_row(row, &widths));
    }
    lines
}

pub fn total_line(total: f64, config: &Config) -> String {
    format!("Total: {}", config.format_amount(total))
}

/// Horizontal bar per day, scaled so the largest day fills `config.chart_width`.
pub fn chart_lines(series: &ChartSeries, config: &Config) -> Vec<String> {
    let max = series.max_value();
    let label_width = series
        .labels
        .iter()
        .map(|label| width_of(label))
        .max()
        .unwrap_or(0);

    series
        .points()
        .map(|(label, value)| {
            let bar = bar_length(value, max, config.chart_width);
            format!(
                "{label:<label_width$} | {bar} {amount}",
                label = label,
                label_width = label_width,
                bar = BAR_CHAR.to_string().repeat(bar),
                amount = config.format_amount(value)
            )
            .trim_end()
            .to_string()
        })
        .collect()
}

fn bar_length(value: f64, max: f64, width: usize) -> usize {
    if max <= 0.0 || value <= 0.0 {
        return 0;
    }
    ((value / max) * width as f64).round().max(1.0) as usize
}

fn short_id(record: &ExpenseRecord) -> String {
    record.id.to_string().chars().take(SHORT_ID_LEN).collect()
}

fn cost_cell(record: &ExpenseRecord, config: &Config) -> String {
    match record.amount() {
        Some(amount) => config.format_amount(amount),
        None => record.cost.to_string(),
    }
}

fn date_cell(record: &ExpenseRecord) -> String {
    match record.timestamp() {
        Some(stamp) => stamp
            .with_timezone(&Local)
            .format(DATE_DISPLAY_FORMAT)
            .to_string(),
        None => record.date.clone(),
    }
}

fn render_row<S: AsRef<str>>(row: &[S], widths: &[usize]) -> String {
    COLUMNS
        .iter()
        .zip(row)
        .zip(widths)
        .map(|((column, cell), width)| render_cell(cell.as_ref(), *width, column.alignment))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn render_cell(text: &str, width: usize, alignment: Alignment) -> String {
    let fitted = truncate_text(text, width);
    let remaining = width.saturating_sub(width_of(&fitted));
    match alignment {
        Alignment::Left => format!("{}{}", fitted, " ".repeat(remaining)),
        Alignment::Right => format!("{}{}", " ".repeat(remaining), fitted),
    }
}

fn truncate_text(text: &str, width: usize) -> String {
    if width_of(text) <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut result: String = text.chars().take(width - 1).collect();
    result.push('…');
    result
}

fn width_of(text: &str) -> usize {
    text.chars().count()
}
