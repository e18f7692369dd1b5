//! Service object owning the expense ledger and keeping storage in step with it.

use std::sync::Arc;

use uuid::Uuid;

use crate::core::time::{Clock, SystemClock};
use crate::domain::{Cost, ExpenseRecord};
use crate::errors::{LedgerError, Result};
use crate::ledger::{is_valid_date_format, ChartSeries, ExpenseLedger, EXPENSES_KEY};
use crate::storage::KeyValueStore;

pub const DEFAULT_CHART_LABEL_FORMAT: &str = "%-m/%-d";

/// Outcome of reading the persisted blob.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Whether a blob existed under the expenses key.
    pub found: bool,
    pub count: usize,
    /// Records that predated identifiers and were assigned one.
    pub assigned_ids: usize,
    pub non_numeric: usize,
}

/// Holds the authoritative in-memory ledger and mirrors every mutation to the
/// injected store.
pub struct ExpenseService {
    ledger: ExpenseLedger,
    store: Box<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    chart_label_format: String,
    editing: Option<Uuid>,
}

impl ExpenseService {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Box<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger: ExpenseLedger::new(),
            store,
            clock,
            chart_label_format: DEFAULT_CHART_LABEL_FORMAT.to_string(),
            editing: None,
        }
    }

    /// Sets the strftime pattern for chart labels. Patterns that cannot render
    /// a calendar date are refused and the default is used instead.
    pub fn set_chart_label_format(&mut self, format: impl Into<String>) -> Result<()> {
        let format = format.into();
        if !is_valid_date_format(&format) {
            tracing::warn!(pattern = %format, "invalid chart label pattern, using default");
            self.chart_label_format = DEFAULT_CHART_LABEL_FORMAT.to_string();
            return Err(LedgerError::Validation(format!(
                "`{}` is not a valid date pattern for chart labels",
                format
            )));
        }
        self.chart_label_format = format;
        Ok(())
    }

    pub fn ledger(&self) -> &ExpenseLedger {
        &self.ledger
    }

    pub fn records(&self) -> &[ExpenseRecord] {
        self.ledger.records()
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    /// Replaces the in-memory ledger with the persisted one. On failure the
    /// in-memory ledger is left untouched.
    pub fn load(&mut self) -> Result<LoadReport> {
        let raw = self.store.get(EXPENSES_KEY).map_err(|err| {
            tracing::warn!(%err, "error loading expenses");
            err
        })?;
        let Some(raw) = raw else {
            tracing::debug!("no stored expenses, starting empty");
            self.ledger = ExpenseLedger::new();
            self.editing = None;
            return Ok(LoadReport::default());
        };

        let mut ledger: ExpenseLedger = serde_json::from_str(&raw).map_err(|err| {
            tracing::warn!(%err, "stored expenses could not be parsed");
            LedgerError::from(err)
        })?;

        let assigned_ids = ledger.assign_missing_ids();
        let report = LoadReport {
            found: true,
            count: ledger.len(),
            assigned_ids,
            non_numeric: ledger.non_numeric().count(),
        };
        self.ledger = ledger;
        self.editing = None;

        if assigned_ids > 0 {
            tracing::info!(assigned_ids, "assigned identifiers to legacy expenses");
            if let Err(err) = self.persist() {
                tracing::warn!(%err, "identifiers will be regenerated on next load");
            }
        }
        tracing::info!(count = report.count, "expenses loaded");
        Ok(report)
    }

    /// Appends a new expense stamped with the current time and persists the
    /// ledger. Empty `item` or `cost` is rejected without touching state.
    pub fn add(&mut self, item: &str, cost: impl Into<Cost>) -> Result<Uuid> {
        let cost = normalize_cost(cost.into());
        validate(item, &cost)?;
        let record = ExpenseRecord::new(item.trim(), cost, self.clock.now());
        if record.amount().is_none() {
            tracing::warn!(item = %record.item, cost = %record.cost, "cost is not numeric");
        }
        let id = self.ledger.push(record);
        tracing::info!(%id, "expense added");
        self.persist()?;
        Ok(id)
    }

    /// Removes the expense with `id`. Unknown ids are a no-op and nothing is
    /// written.
    pub fn delete(&mut self, id: Uuid) -> Result<Option<ExpenseRecord>> {
        let Some(removed) = self.ledger.remove(id) else {
            tracing::debug!(%id, "delete ignored, no such expense");
            return Ok(None);
        };
        self.after_removal(&removed)?;
        Ok(Some(removed))
    }

    /// Removes the first expense created at exactly `date`.
    pub fn delete_by_date(&mut self, date: &str) -> Result<Option<ExpenseRecord>> {
        let Some(removed) = self.ledger.remove_by_date(date) else {
            tracing::debug!(date, "delete ignored, no expense with that date");
            return Ok(None);
        };
        self.after_removal(&removed)?;
        Ok(Some(removed))
    }

    /// Marks the expense with `id` as being edited and returns a copy to edit.
    pub fn begin_edit(&mut self, id: Uuid) -> Option<ExpenseRecord> {
        let record = self.ledger.get(id).cloned()?;
        self.editing = Some(id);
        Some(record)
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    pub fn editing(&self) -> Option<Uuid> {
        self.editing
    }

    /// Saves an edited expense over the stored one with the same id. The
    /// original position and creation date are kept. Returns the previous
    /// version.
    pub fn edit(&mut self, mut updated: ExpenseRecord) -> Result<ExpenseRecord> {
        updated.cost = normalize_cost(updated.cost);
        validate(&updated.item, &updated.cost)?;
        updated.item = updated.item.trim().to_string();
        let id = updated.id;
        let previous = self
            .ledger
            .replace(updated)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;
        self.editing = None;
        tracing::info!(%id, "expense updated");
        self.persist()?;
        Ok(previous)
    }

    pub fn total(&self) -> f64 {
        self.ledger.total()
    }

    pub fn chart_series(&self) -> ChartSeries {
        self.ledger.chart_series(&self.chart_label_format)
    }

    fn after_removal(&mut self, removed: &ExpenseRecord) -> Result<()> {
        if self.editing == Some(removed.id) {
            self.editing = None;
        }
        tracing::info!(id = %removed.id, "expense deleted");
        self.persist()
    }

    /// Writes the whole ledger under the expenses key. A failure leaves the
    /// in-memory ledger ahead of storage.
    fn persist(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.ledger)?;
        self.store.set(EXPENSES_KEY, &json).map_err(|err| {
            tracing::error!(%err, "error saving expenses");
            err
        })
    }
}

fn normalize_cost(cost: Cost) -> Cost {
    match cost {
        Cost::Text(raw) => Cost::Text(raw.trim().to_string()),
        number => number,
    }
}

fn validate(item: &str, cost: &Cost) -> Result<()> {
    if item.trim().is_empty() {
        return Err(LedgerError::Validation("item must not be empty".into()));
    }
    if cost.is_blank() {
        return Err(LedgerError::Validation("cost must not be empty".into()));
    }
    if let Cost::Number(value) = cost {
        if !value.is_finite() {
            return Err(LedgerError::Validation(format!(
                "cost must be a finite number, got {}",
                value
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::FixedClock;
    use crate::storage::MemoryStore;
    use chrono::{Local, TimeZone};

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(LedgerError::Storage("storage unavailable".into()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(LedgerError::Storage("storage unavailable".into()))
        }
    }

    fn service() -> ExpenseService {
        let clock = FixedClock(Local.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap());
        ExpenseService::with_clock(Box::new(MemoryStore::new()), Arc::new(clock))
    }

    #[test]
    fn add_rejects_blank_fields() {
        let mut service = service();
        let err = service.add("", "3").expect_err("blank item must fail");
        assert!(matches!(err, LedgerError::Validation(_)));
        let err = service.add("Coffee", "   ").expect_err("blank cost must fail");
        assert!(matches!(err, LedgerError::Validation(_)));
        assert!(service.ledger().is_empty());
        assert_eq!(service.store().get(EXPENSES_KEY).unwrap(), None);
    }

    #[test]
    fn add_trims_and_stamps_with_clock() {
        let mut service = service();
        let id = service.add("  Coffee ", " 3.20 ").unwrap();
        let record = service.ledger().get(id).unwrap();
        assert_eq!(record.item, "Coffee");
        assert_eq!(record.cost, Cost::from("3.20"));
        assert!(record.date.starts_with("2026-10-19T09:30:00"));
    }

    #[test]
    fn add_keeps_non_numeric_cost_text() {
        let mut service = service();
        service.add("Gift", "ten").unwrap();
        assert_eq!(service.records()[0].cost, Cost::from("ten"));
        assert_eq!(service.total(), 0.0);
    }

    #[test]
    fn edit_clears_editing_state() {
        let mut service = service();
        let id = service.add("Coffee", "3").unwrap();
        let mut draft = service.begin_edit(id).expect("known id");
        assert_eq!(service.editing(), Some(id));

        draft.cost = Cost::from("4");
        service.edit(draft).unwrap();
        assert_eq!(service.editing(), None);
        assert_eq!(service.total(), 4.0);
    }

    #[test]
    fn rejected_edit_keeps_ledger_and_editing_state() {
        let mut service = service();
        let id = service.add("Coffee", "3").unwrap();
        let mut draft = service.begin_edit(id).unwrap();
        draft.item = String::new();

        let err = service.edit(draft).expect_err("empty item must fail");
        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(service.records()[0].item, "Coffee");
        assert_eq!(service.editing(), Some(id));
    }

    #[test]
    fn edit_of_unknown_record_is_not_found() {
        let mut service = service();
        let stray = ExpenseRecord::new("Ghost", "1", Local::now());
        let err = service.edit(stray).expect_err("unknown id must fail");
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[test]
    fn deleting_the_edited_record_clears_editing_state() {
        let mut service = service();
        let id = service.add("Coffee", "3").unwrap();
        service.begin_edit(id);
        service.delete(id).unwrap();
        assert_eq!(service.editing(), None);
    }

    #[test]
    fn time_only_label_pattern_is_refused() {
        let mut service = service();
        service.add("Coffee", "3").unwrap();
        let err = service
            .set_chart_label_format("%H:%M")
            .expect_err("time-only pattern");
        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(service.chart_series().labels, vec!["10/19".to_string()]);
    }

    #[test]
    fn non_finite_costs_are_rejected() {
        let mut service = service();
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = service.add("Weird", value).expect_err("non-finite cost");
            assert!(matches!(err, LedgerError::Validation(_)));
        }
        assert!(service.ledger().is_empty());
        assert_eq!(service.store().get(EXPENSES_KEY).unwrap(), None);
    }

    #[test]
    fn load_failure_leaves_memory_untouched() {
        let store = MemoryStore::new();
        store.set(EXPENSES_KEY, "{ not json").unwrap();
        let mut service = ExpenseService::new(Box::new(store));
        let err = service.load().expect_err("corrupt blob must fail");
        assert!(matches!(err, LedgerError::Serde(_)));
        assert!(service.ledger().is_empty());
    }

    #[test]
    fn persist_failure_keeps_in_memory_mutation() {
        let mut service = ExpenseService::new(Box::new(FailingStore));
        let err = service.add("Coffee", "3").expect_err("store rejects writes");
        assert!(matches!(err, LedgerError::Storage(_)));
        assert_eq!(service.ledger().len(), 1);
    }

    #[test]
    fn load_backfills_missing_ids_and_persists_them() {
        let store = MemoryStore::new();
        store
            .set(
                EXPENSES_KEY,
                r#"[{"item":"Tea","cost":2,"date":"Mon Oct 19 2026 08:00:00 GMT+0200 (CEST)"}]"#,
            )
            .unwrap();
        let mut service = ExpenseService::new(Box::new(store));
        let report = service.load().unwrap();
        assert!(report.found);
        assert_eq!(report.count, 1);
        assert_eq!(report.assigned_ids, 1);

        let id = service.records()[0].id;
        let stored = service.store().get(EXPENSES_KEY).unwrap().unwrap();
        assert!(stored.contains(&id.to_string()));
    }
}
