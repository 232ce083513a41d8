//! Group status aggregation.
//!
//! Reduces independently resolved member statuses (0 = no, 1 = yes,
//! 9 = unknown, missingness marker = not applicable) to one group status.
//! Version-agnostic: member handlers translate raw fields into
//! [`GroupStatus`] before anything here runs.

use cohort_core::value::values_match;
use serde_json::Value;

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupStatus {
    No,
    Yes,
    Unknown,
    NotApplicable,
}

impl GroupStatus {
    /// Decode a resolved status. `missing_marker` (and null) mean not applicable.
    pub fn from_value(value: &Value, missing_marker: &Value) -> Result<Self, EngineError> {
        if value.is_null() || values_match(value, missing_marker) {
            return Ok(GroupStatus::NotApplicable);
        }
        match value.as_f64() {
            Some(code) if code == 0.0 => Ok(GroupStatus::No),
            Some(code) if code == 1.0 => Ok(GroupStatus::Yes),
            Some(code) if code == 9.0 => Ok(GroupStatus::Unknown),
            _ => Err(EngineError::Derivation(format!("not a group status: {value}"))),
        }
    }

    pub fn to_value(self, missing_marker: &Value) -> Value {
        match self {
            GroupStatus::No => Value::from(0),
            GroupStatus::Yes => Value::from(1),
            GroupStatus::Unknown => Value::from(9),
            GroupStatus::NotApplicable => missing_marker.clone(),
        }
    }

    /// `0` or `1`: a status later unknowns may not overwrite.
    pub fn is_known(self) -> bool {
        matches!(self, GroupStatus::No | GroupStatus::Yes)
    }
}

/// Reduce member statuses to one group status.
///
/// Any yes wins; all no is no; all not-applicable (or no members) is not
/// applicable; anything else is unknown, except that an unknown never
/// replaces a `prior` known status.
pub fn aggregate(members: &[GroupStatus], prior: Option<GroupStatus>) -> GroupStatus {
    if members.contains(&GroupStatus::Yes) {
        return GroupStatus::Yes;
    }
    if members.is_empty() || members.iter().all(|m| *m == GroupStatus::NotApplicable) {
        return GroupStatus::NotApplicable;
    }
    if members.iter().all(|m| *m == GroupStatus::No) {
        return GroupStatus::No;
    }
    match prior {
        Some(known) if known.is_known() => {
            tracing::debug!(?known, "unknown group status kept prior known value");
            known
        }
        _ => GroupStatus::Unknown,
    }
}

/// [`aggregate`] over raw values, reading the prior cross-sectional value.
pub fn aggregate_values(
    members: &[Value],
    prior: Option<&Value>,
    missing_marker: &Value,
) -> Result<Value, EngineError> {
    let statuses = members
        .iter()
        .map(|value| GroupStatus::from_value(value, missing_marker))
        .collect::<Result<Vec<_>, _>>()?;
    let prior = prior
        .map(|value| GroupStatus::from_value(value, missing_marker))
        .transpose()?;
    Ok(aggregate(&statuses, prior).to_value(missing_marker))
}
