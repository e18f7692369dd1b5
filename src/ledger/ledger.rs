use std::fmt::Write as _;

use chrono::{
    format::{Item, StrftimeItems},
    NaiveDate,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{ExpenseRecord, Identifiable};

/// Key under which the ledger blob is stored.
pub const EXPENSES_KEY: &str = "expenses";

/// Label layout used when the configured one cannot render a date.
const FALLBACK_LABEL_FORMAT: &str = "%Y-%m-%d";

/// Checks that `pattern` only uses specifiers a calendar date can render.
pub fn is_valid_date_format(pattern: &str) -> bool {
    if pattern.trim().is_empty()
        || StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
    {
        return false;
    }
    let mut rendered = String::new();
    write!(rendered, "{}", NaiveDate::default().format(pattern)).is_ok()
}

fn day_label(day: NaiveDate, label_format: &str) -> String {
    let mut label = String::new();
    if write!(label, "{}", day.format(label_format)).is_ok() {
        return label;
    }
    tracing::warn!(pattern = label_format, "chart label pattern cannot render a date");
    day.format(FALLBACK_LABEL_FORMAT).to_string()
}

/// Ordered collection of expenses, in entry order.
///
/// Serializes as a bare JSON array so the persisted blob stays a plain list of
/// records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpenseLedger {
    records: Vec<ExpenseRecord>,
}

/// Day-bucketed spend, as parallel label/value sequences.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl ChartSeries {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    pub fn max_value(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }
}

impl ExpenseLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<ExpenseRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[ExpenseRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: ExpenseRecord) -> Uuid {
        let id = record.id;
        self.records.push(record);
        id
    }

    pub fn get(&self, id: Uuid) -> Option<&ExpenseRecord> {
        self.records.iter().find(|record| record.id() == id)
    }

    pub fn position(&self, id: Uuid) -> Option<usize> {
        self.records.iter().position(|record| record.id() == id)
    }

    pub fn remove(&mut self, id: Uuid) -> Option<ExpenseRecord> {
        let idx = self.position(id)?;
        Some(self.records.remove(idx))
    }

    /// Removes the first record created at exactly `date`.
    pub fn remove_by_date(&mut self, date: &str) -> Option<ExpenseRecord> {
        let idx = self.records.iter().position(|record| record.date == date)?;
        Some(self.records.remove(idx))
    }

    /// Swaps in `updated` for the record sharing its id. Position and the
    /// original creation date are kept. Returns the previous record.
    pub fn replace(&mut self, mut updated: ExpenseRecord) -> Option<ExpenseRecord> {
        let idx = self.position(updated.id)?;
        updated.date = self.records[idx].date.clone();
        Some(std::mem::replace(&mut self.records[idx], updated))
    }

    /// Back-fills identifiers on records loaded from older blobs. Returns the
    /// number of records repaired.
    pub fn assign_missing_ids(&mut self) -> usize {
        self.records
            .iter_mut()
            .map(ExpenseRecord::ensure_id)
            .filter(|assigned| *assigned)
            .count()
    }

    /// Records whose cost does not parse as a number.
    pub fn non_numeric(&self) -> impl Iterator<Item = &ExpenseRecord> + '_ {
        self.records
            .iter()
            .filter(|record| record.amount().is_none())
    }

    /// Sum of all costs. Non-numeric costs count as zero.
    pub fn total(&self) -> f64 {
        self.records
            .iter()
            .filter_map(ExpenseRecord::amount)
            .sum()
    }

    /// Groups spend by calendar day, labelled with `label_format`. Days appear
    /// in the order they are first seen in the ledger, not calendar order.
    pub fn chart_series(&self, label_format: &str) -> ChartSeries {
        let mut days: Vec<NaiveDate> = Vec::new();
        let mut values: Vec<f64> = Vec::new();
        for record in &self.records {
            let Some(day) = record.day() else {
                tracing::debug!(id = %record.id, date = %record.date, "skipping undated expense");
                continue;
            };
            let amount = record.amount().unwrap_or(0.0);
            match days.iter().position(|seen| *seen == day) {
                Some(idx) => values[idx] += amount,
                None => {
                    days.push(day);
                    values.push(amount);
                }
            }
        }
        ChartSeries {
            labels: days
                .iter()
                .map(|day| day_label(*day, label_format))
                .collect(),
            values,
        }
    }
}
