#[allow(clippy::module_inception)]
pub mod ledger;

pub use crate::domain::{Cost, ExpenseRecord};
pub use ledger::{is_valid_date_format, ChartSeries, ExpenseLedger, EXPENSES_KEY};
