pub mod expense_service;
pub mod time;

pub use expense_service::{ExpenseService, LoadReport, DEFAULT_CHART_LABEL_FORMAT};
pub use time::{Clock, FixedClock, SystemClock};
