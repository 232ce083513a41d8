use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One observation in a longitudinal working series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatedValue {
    pub date: Date,
    pub value: Value,
}

impl DatedValue {
    pub fn new(date: Date, value: impl Into<Value>) -> Self {
        Self {
            date,
            value: value.into(),
        }
    }
}

/// Decode a stored series. Entries are kept sorted by date on write, but
/// the result is sorted again so hand-built stores behave the same.
pub fn decode_series(raw: &Value) -> Result<Vec<DatedValue>, serde_json::Error> {
    let mut series: Vec<DatedValue> = serde_json::from_value(raw.clone())?;
    series.sort_by_key(|entry| entry.date);
    Ok(series)
}

/// Insert keeping date order; an entry on an existing date replaces it.
/// Returns `true` when the entry landed before the current last date.
pub fn insert_dated(series: &mut Vec<DatedValue>, entry: DatedValue) -> bool {
    let out_of_order = series.last().is_some_and(|last| entry.date < last.date);
    match series.binary_search_by_key(&entry.date, |e| e.date) {
        Ok(idx) => series[idx] = entry,
        Err(idx) => series.insert(idx, entry),
    }
    out_of_order
}
