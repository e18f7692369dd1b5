use std::fmt;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::{Displayable, Identifiable};

/// Layout produced by JavaScript's `Date.prototype.toString`, minus the
/// trailing parenthesised zone name.
const JS_DATE_FORMAT: &str = "%a %b %d %Y %H:%M:%S GMT%z";
const NAIVE_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Amount attached to an expense, stored exactly as the user supplied it.
///
/// Older blobs carry either a JSON string or a JSON number, so both shapes
/// deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cost {
    Number(f64),
    Text(String),
}

impl Cost {
    /// Numeric value of the cost, or `None` when the text is not a number.
    pub fn amount(&self) -> Option<f64> {
        let value = match self {
            Cost::Number(value) => *value,
            Cost::Text(raw) => raw.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cost::Number(_) => false,
            Cost::Text(raw) => raw.trim().is_empty(),
        }
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cost::Number(value) => write!(f, "{}", value),
            Cost::Text(raw) => f.write_str(raw.trim()),
        }
    }
}

impl From<&str> for Cost {
    fn from(value: &str) -> Self {
        Cost::Text(value.to_string())
    }
}

impl From<String> for Cost {
    fn from(value: String) -> Self {
        Cost::Text(value)
    }
}

impl From<f64> for Cost {
    fn from(value: f64) -> Self {
        Cost::Number(value)
    }
}

/// One expense entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    #[serde(default = "ExpenseRecord::default_id")]
    pub id: Uuid,
    pub item: String,
    pub cost: Cost,
    /// Creation timestamp as text.
    pub date: String,
}

impl ExpenseRecord {
    pub fn new(item: impl Into<String>, cost: impl Into<Cost>, created_at: DateTime<Local>) -> Self {
        Self {
            id: Uuid::new_v4(),
            item: item.into(),
            cost: cost.into(),
            date: created_at.to_rfc3339(),
        }
    }

    /// Placeholder used when a stored record predates identifiers.
    pub fn default_id() -> Uuid {
        Uuid::nil()
    }

    /// Assigns a fresh identifier if the record has none. Returns `true` when
    /// an identifier was generated.
    pub fn ensure_id(&mut self) -> bool {
        if self.id.is_nil() {
            self.id = Uuid::new_v4();
            true
        } else {
            false
        }
    }

    pub fn amount(&self) -> Option<f64> {
        self.cost.amount()
    }

    /// Parses the stored timestamp, keeping the offset it was recorded with.
    pub fn timestamp(&self) -> Option<DateTime<FixedOffset>> {
        let raw = self.date.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed);
        }
        let without_zone_name = raw.split(" (").next().unwrap_or(raw);
        DateTime::parse_from_str(without_zone_name, JS_DATE_FORMAT).ok()
    }

    /// Calendar day the expense was recorded on, in the offset it was
    /// recorded with.
    pub fn day(&self) -> Option<NaiveDate> {
        if let Some(timestamp) = self.timestamp() {
            return Some(timestamp.date_naive());
        }
        let raw = self.date.trim();
        NaiveDateTime::parse_from_str(raw, NAIVE_DATETIME_FORMAT)
            .map(|naive| naive.date())
            .or_else(|_| NaiveDate::parse_from_str(raw, DATE_FORMAT))
            .ok()
    }
}

impl Identifiable for ExpenseRecord {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for ExpenseRecord {
    fn display_label(&self) -> String {
        format!("{} ({})", self.item, self.cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record_with_date(date: &str) -> ExpenseRecord {
        ExpenseRecord {
            id: Uuid::new_v4(),
            item: "Coffee".into(),
            cost: Cost::from("3"),
            date: date.into(),
        }
    }

    #[test]
    fn cost_accepts_both_json_shapes() {
        let text: Cost = serde_json::from_str("\"5.50\"").unwrap();
        let number: Cost = serde_json::from_str("12").unwrap();
        assert_eq!(text, Cost::Text("5.50".into()));
        assert_eq!(number, Cost::Number(12.0));
        assert_eq!(text.amount(), Some(5.5));
        assert_eq!(number.amount(), Some(12.0));
    }

    #[test]
    fn non_numeric_cost_has_no_amount() {
        assert_eq!(Cost::from("lunch").amount(), None);
        assert_eq!(Cost::from("  ").amount(), None);
        assert!(Cost::from("  ").is_blank());
        assert_eq!(Cost::Number(f64::NAN).amount(), None);
    }

    #[test]
    fn missing_id_deserializes_as_nil_and_is_backfilled() {
        let raw = r#"{"item":"Tea","cost":"2","date":"2026-10-19T08:00:00+02:00"}"#;
        let mut record: ExpenseRecord = serde_json::from_str(raw).unwrap();
        assert!(record.id.is_nil());
        assert!(record.ensure_id());
        assert!(!record.id.is_nil());
        assert!(!record.ensure_id());
    }

    #[test]
    fn day_reads_rfc3339_in_recorded_offset() {
        let record = record_with_date("2026-10-19T23:30:00-05:00");
        assert_eq!(record.day(), NaiveDate::from_ymd_opt(2026, 10, 19));
    }

    #[test]
    fn day_reads_javascript_date_strings() {
        let record =
            record_with_date("Mon Oct 19 2026 14:03:22 GMT+0200 (Central European Summer Time)");
        assert_eq!(record.day(), NaiveDate::from_ymd_opt(2026, 10, 19));
    }

    #[test]
    fn day_reads_plain_dates_and_rejects_garbage() {
        assert_eq!(
            record_with_date("2026-01-02").day(),
            NaiveDate::from_ymd_opt(2026, 1, 2)
        );
        assert_eq!(record_with_date("D1").day(), None);
    }

    #[test]
    fn new_record_stores_rfc3339_timestamp() {
        let created = Local.with_ymd_and_hms(2026, 3, 4, 9, 15, 0).unwrap();
        let record = ExpenseRecord::new("Bus", "2.40", created);
        assert_eq!(record.day(), NaiveDate::from_ymd_opt(2026, 3, 4));
        assert!(!record.id.is_nil());
    }
}
