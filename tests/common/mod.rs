#![allow(dead_code)]

use std::{path::PathBuf, sync::Arc, sync::Mutex};

use chrono::{DateTime, Local, TimeZone};
use expense_ledger::{
    core::{ExpenseService, FixedClock},
    storage::JsonFileStore,
};
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Fresh directory that outlives the calling test.
pub fn temp_base() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

pub fn at(day: u32, hour: u32) -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2026, 10, day, hour, 0, 0)
        .single()
        .expect("unambiguous local time")
}

pub fn file_store(base: &PathBuf, retention: usize) -> JsonFileStore {
    JsonFileStore::with_retention(base.join("store"), retention).expect("create json store")
}

/// Service over a JSON store in `base`, with time frozen at `now`.
pub fn service_at(base: &PathBuf, now: DateTime<Local>) -> ExpenseService {
    ExpenseService::with_clock(Box::new(file_store(base, 5)), Arc::new(FixedClock(now)))
}
