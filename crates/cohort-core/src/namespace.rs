//! Scoped accessors.
//!
//! A [`Namespace`] is a read-only view of one prefix of a [`PathStore`].
//! Every logical scope (raw forms, resolved values, derived output, subject
//! state, the previous-visit mirror) is the same type with a different
//! [`ScopePrefix`]. Writes go through the store itself.

use jiff::civil::Date;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::dated::{DatedValue, decode_series};
use crate::error::CoreError;
use crate::key::{AttributeKey, Entity, ScopePrefix, Section, WorkingScope};
use crate::store::{PathStore, type_name};

#[derive(Debug, Clone)]
pub struct Namespace<'a> {
    store: &'a PathStore,
    prefix: ScopePrefix,
}

impl<'a> Namespace<'a> {
    pub fn new(store: &'a PathStore, prefix: ScopePrefix) -> Self {
        Self { store, prefix }
    }

    /// Build a namespace that requires `required` to be present.
    ///
    /// On failure the error lists every missing field.
    pub fn with_required(
        store: &'a PathStore,
        prefix: ScopePrefix,
        required: &[&str],
    ) -> Result<Self, CoreError> {
        let ns = Self::new(store, prefix);
        ns.check_present(required)?;
        Ok(ns)
    }

    pub fn forms(store: &'a PathStore, layer: &str) -> Self {
        Self::new(store, ScopePrefix::forms(layer))
    }

    pub fn resolved(store: &'a PathStore) -> Self {
        Self::new(store, ScopePrefix::resolved())
    }

    pub fn derived(store: &'a PathStore) -> Self {
        Self::new(store, ScopePrefix::derived())
    }

    pub fn subject_derived(store: &'a PathStore) -> Self {
        Self::new(store, ScopePrefix::subject_derived())
    }

    /// The previous-visit mirror of `section`, if the caller supplied one.
    pub fn prev_record(store: &'a PathStore, section: Section) -> Option<Self> {
        if !store.contains(Entity::PrevRecord.as_str()) {
            return None;
        }
        Some(Self::new(store, ScopePrefix::new(Entity::PrevRecord, section)))
    }

    pub fn prefix(&self) -> &ScopePrefix {
        &self.prefix
    }

    pub fn store(&self) -> &'a PathStore {
        self.store
    }

    pub fn key(&self, field: &str) -> AttributeKey {
        self.prefix.key(field)
    }

    /// The stored value, including explicit nulls.
    pub fn raw(&self, field: &str) -> Option<&'a Value> {
        self.store.get_key(&self.key(field))
    }

    pub fn contains(&self, field: &str) -> bool {
        self.raw(field).is_some()
    }

    /// Checked read. Null and absent both yield `default`; a present value
    /// of the wrong type fails with [`CoreError::TypeMismatch`]. Integers
    /// widen to floats, nothing else is coerced.
    pub fn get<T: DeserializeOwned>(
        &self,
        field: &str,
        default: Option<T>,
    ) -> Result<Option<T>, CoreError> {
        match self.raw(field) {
            None | Some(Value::Null) => Ok(default),
            Some(value) => serde_json::from_value::<T>(value.clone())
                .map(Some)
                .map_err(|_| CoreError::TypeMismatch {
                    key: self.key(field).path(),
                    expected: std::any::type_name::<T>().to_string(),
                    found: type_name(value).to_string(),
                }),
        }
    }

    pub fn get_or<T: DeserializeOwned>(&self, field: &str, default: T) -> Result<T, CoreError> {
        Ok(self.get(field, None)?.unwrap_or(default))
    }

    /// Return the values of `fields` in order, or fail naming every absent one.
    pub fn assert_required(&self, fields: &[&str]) -> Result<Vec<&'a Value>, CoreError> {
        self.check_present(fields)?;
        Ok(fields.iter().filter_map(|field| self.raw(field)).collect())
    }

    pub fn missing(&self, fields: &[&str]) -> Vec<String> {
        fields
            .iter()
            .filter(|field| !self.contains(field))
            .map(|field| field.to_string())
            .collect()
    }

    fn check_present(&self, fields: &[&str]) -> Result<(), CoreError> {
        let missing = self.missing(fields);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::MissingRequired {
                scope: self.prefix.to_string(),
                fields: missing,
            })
        }
    }
}

/// Subject working state: cross-sectional last values plus date-tagged
/// longitudinal series.
#[derive(Debug, Clone)]
pub struct WorkingNamespace<'a> {
    cross_sectional: Namespace<'a>,
    longitudinal: Namespace<'a>,
}

impl<'a> WorkingNamespace<'a> {
    pub fn new(store: &'a PathStore) -> Self {
        Self {
            cross_sectional: Namespace::new(store, ScopePrefix::working(WorkingScope::CrossSectional)),
            longitudinal: Namespace::new(store, ScopePrefix::working(WorkingScope::Longitudinal)),
        }
    }

    pub fn cross_sectional(&self) -> &Namespace<'a> {
        &self.cross_sectional
    }

    pub fn longitudinal(&self) -> &Namespace<'a> {
        &self.longitudinal
    }

    /// The date-ordered series for `field`; empty if never recorded.
    pub fn series(&self, field: &str) -> Result<Vec<DatedValue>, CoreError> {
        match self.longitudinal.raw(field) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(raw) => decode_series(raw).map_err(|e| CoreError::TypeMismatch {
                key: self.longitudinal.key(field).path(),
                expected: "date-tagged series".to_string(),
                found: e.to_string(),
            }),
        }
    }

    /// Last value ever recorded for `field`, across every prior visit.
    pub fn last_value(&self, field: &str) -> Result<Option<Value>, CoreError> {
        let latest = self
            .series(field)?
            .into_iter()
            .rev()
            .map(|entry| entry.value)
            .find(|value| !value.is_null());
        if latest.is_some() {
            return Ok(latest);
        }
        Ok(self
            .cross_sectional
            .raw(field)
            .filter(|value| !value.is_null())
            .cloned())
    }

    pub fn value_on_or_before(&self, field: &str, date: Date) -> Result<Option<DatedValue>, CoreError> {
        Ok(self
            .series(field)?
            .into_iter()
            .rev()
            .find(|entry| entry.date <= date))
    }

    /// Entry closest to `date`; ties go to the earlier entry.
    pub fn nearest(&self, field: &str, date: Date) -> Result<Option<DatedValue>, CoreError> {
        let mut best: Option<(i64, DatedValue)> = None;
        for entry in self.series(field)? {
            let distance = day_distance(entry.date, date)?;
            if best.as_ref().is_none_or(|(d, _)| distance < *d) {
                best = Some((distance, entry));
            }
        }
        Ok(best.map(|(_, entry)| entry))
    }
}

fn day_distance(a: Date, b: Date) -> Result<i64, CoreError> {
    let span = a
        .until(b)
        .map_err(|e| CoreError::InvalidField(format!("date arithmetic failed: {e}")))?;
    Ok(i64::from(span.get_days()).abs())
}
