//! Schema version normalization.
//!
//! Visits carry the generation of the intake form they were submitted on.
//! Raw versions arrive as integers, floats (`3.2`) or numeric strings
//! (`"4.0"`); only the major ordinal matters to the engine.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SchemaVersion(u8);

impl SchemaVersion {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    pub const V1: SchemaVersion = SchemaVersion(1);
    pub const V2: SchemaVersion = SchemaVersion(2);
    pub const V3: SchemaVersion = SchemaVersion(3);
    pub const V4: SchemaVersion = SchemaVersion(4);

    pub fn new(ordinal: u8) -> Result<Self, CoreError> {
        if (Self::MIN..=Self::MAX).contains(&ordinal) {
            Ok(Self(ordinal))
        } else {
            Err(CoreError::InvalidField(format!(
                "schema version {ordinal} outside supported range {}..={}",
                Self::MIN,
                Self::MAX
            )))
        }
    }

    /// Normalize a raw submitted version value.
    pub fn normalize(raw: &Value) -> Result<Self, CoreError> {
        let numeric = match raw {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        let numeric = numeric
            .filter(|n| n.is_finite() && *n >= 0.0)
            .ok_or_else(|| CoreError::InvalidField(format!("unparseable schema version: {raw}")))?;

        let major = numeric.floor();
        if major > f64::from(u8::MAX) {
            return Err(CoreError::InvalidField(format!(
                "schema version {raw} outside supported range"
            )));
        }
        // Range-checked above; truncation is the normalization.
        Self::new(major as u8)
    }

    pub fn ordinal(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for SchemaVersion {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SchemaVersion> for u8 {
    fn from(value: SchemaVersion) -> Self {
        value.0
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}
