#![doc(test(attr(deny(warnings))))]

//! Expense Ledger records what was bought, what it cost, and when, and keeps
//! the list in a pluggable key/value store. It derives a running total and a
//! per-day spend series, and ships an interactive shell on top.

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod errors;
pub mod ledger;
pub mod storage;
pub mod utils;

pub use crate::core::{ExpenseService, LoadReport};
pub use crate::domain::{Cost, ExpenseRecord};
pub use crate::errors::{LedgerError, Result};
pub use crate::ledger::{ChartSeries, ExpenseLedger};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Expense Ledger tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
        super::init();
    }
}
