//! Field resolution protocol.
//!
//! A raw value that is absent or equal to one of the field's carry-forward
//! codes is replaced from history, in this order:
//!
//! 1. the subject's working state (last value ever recorded, any depth),
//! 2. the previous visit's resolved value,
//! 3. the previous visit's raw value,
//! 4. the caller's default, else the missingness marker.
//!
//! Without a previous-visit mirror there is no history to consult. Resolving
//! never writes; only [`record_working`] appends to working state.

use cohort_core::dated::{DatedValue, insert_dated};
use cohort_core::key::{ScopePrefix, Section, WorkingScope};
use cohort_core::namespace::{Namespace, WorkingNamespace};
use cohort_core::store::PathStore;
use cohort_core::value::{is_absent, matches_any, values_match};
use jiff::civil::Date;
use serde_json::Value;

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Current,
    Working,
    PrevResolved,
    PrevRaw,
    Default,
    Missing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub value: Value,
    pub source: Source,
}

#[derive(Debug, Clone)]
pub struct Resolver<'a> {
    current: Namespace<'a>,
    prev_resolved: Option<Namespace<'a>>,
    prev_forms: Option<Namespace<'a>>,
    working: WorkingNamespace<'a>,
    missing_marker: &'a Value,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a PathStore, layer: &str, missing_marker: &'a Value) -> Self {
        Self {
            current: Namespace::forms(store, layer),
            prev_resolved: Namespace::prev_record(store, Section::Resolved),
            prev_forms: Namespace::prev_record(store, Section::forms(layer)),
            working: WorkingNamespace::new(store),
            missing_marker,
        }
    }

    pub fn has_history(&self) -> bool {
        self.prev_forms.is_some()
    }

    pub fn missing_marker(&self) -> &'a Value {
        self.missing_marker
    }

    /// True for null and for the configured missingness marker.
    pub fn is_missing(&self, value: &Value) -> bool {
        value.is_null() || values_match(value, self.missing_marker)
    }

    pub fn current(&self) -> &Namespace<'a> {
        &self.current
    }

    pub fn working(&self) -> &WorkingNamespace<'a> {
        &self.working
    }

    pub fn resolve(&self, field: &str, codes: &[Value], default: Option<&Value>) -> Result<Value, EngineError> {
        Ok(self.resolve_traced(field, codes, default)?.value)
    }

    /// Resolve `field`, reporting which tier produced the value.
    pub fn resolve_traced(
        &self,
        field: &str,
        codes: &[Value],
        default: Option<&Value>,
    ) -> Result<Resolution, EngineError> {
        self.resolve_from(field, self.current.raw(field), codes, default)
    }

    /// Resolve `field` starting from `current` instead of the raw form
    /// value, for callers holding a reordered view of the visit.
    pub fn resolve_from(
        &self,
        field: &str,
        current: Option<&Value>,
        codes: &[Value],
        default: Option<&Value>,
    ) -> Result<Resolution, EngineError> {
        if let Some(value) = current.filter(|v| usable(Some(*v), codes)) {
            return Ok(Resolution {
                value: value.clone(),
                source: Source::Current,
            });
        }
        self.resolve_history(field, codes, default)
    }

    /// Steps 2 and 3 only: the current value is already known to be
    /// absent or a carry-forward code.
    pub fn resolve_history(
        &self,
        field: &str,
        codes: &[Value],
        default: Option<&Value>,
    ) -> Result<Resolution, EngineError> {
        if !self.has_history() {
            return Ok(self.fallback(default));
        }

        if let Some(value) = self.working.last_value(field)?
            && usable(Some(&value), codes)
        {
            tracing::debug!(field, "resolved from working state");
            return Ok(Resolution {
                value,
                source: Source::Working,
            });
        }

        let prev_resolved = self.prev_resolved.as_ref().and_then(|ns| ns.raw(field));
        if usable(prev_resolved, codes)
            && let Some(value) = prev_resolved
        {
            tracing::debug!(field, "resolved from previous visit");
            return Ok(Resolution {
                value: value.clone(),
                source: Source::PrevResolved,
            });
        }

        let prev_raw = self.prev_forms.as_ref().and_then(|ns| ns.raw(field));
        if usable(prev_raw, codes)
            && let Some(value) = prev_raw
        {
            tracing::debug!(field, "resolved from previous raw value");
            return Ok(Resolution {
                value: value.clone(),
                source: Source::PrevRaw,
            });
        }

        Ok(self.fallback(default))
    }

    fn fallback(&self, default: Option<&Value>) -> Resolution {
        match default {
            Some(value) => Resolution {
                value: value.clone(),
                source: Source::Default,
            },
            None => Resolution {
                value: self.missing_marker.clone(),
                source: Source::Missing,
            },
        }
    }
}

/// Present, non-null, and not a carry-forward code.
fn usable(value: Option<&Value>, codes: &[Value]) -> bool {
    !is_absent(value) && value.is_some_and(|v| !matches_any(v, codes))
}

/// Append `value` to the subject's working series for `field` and refresh
/// the cross-sectional last value.
pub fn record_working(
    store: &mut PathStore,
    field: &str,
    date: Date,
    value: Value,
) -> Result<(), EngineError> {
    let mut series = WorkingNamespace::new(store).series(field)?;
    if insert_dated(&mut series, DatedValue::new(date, value)) {
        tracing::warn!(field, %date, "working value recorded out of chronological order");
    }

    let latest = series.last().map(|entry| entry.value.clone()).unwrap_or(Value::Null);
    store.set_key(
        &ScopePrefix::working(WorkingScope::Longitudinal).key(field),
        serde_json::to_value(&series)?,
    )?;
    store.set_key(&ScopePrefix::working(WorkingScope::CrossSectional).key(field), latest)?;
    Ok(())
}
