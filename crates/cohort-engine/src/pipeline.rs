//! Per-visit derivation pass.
//!
//! Visits of one subject must be run in chronological order: working and
//! cross-sectional state are mutated in place and read by later visits.
//! Nothing is rolled back on error; fields written before the failure stay.

use std::collections::BTreeMap;
use std::sync::Arc;

use cohort_core::error::CoreError;
use cohort_core::key::{Entity, ScopePrefix};
use cohort_core::namespace::Namespace;
use cohort_core::store::PathStore;
use cohort_core::value::values_match;
use cohort_core::version::SchemaVersion;
use jiff::civil::Date;
use serde_json::Value;

use crate::codes::CodeTable;
use crate::config::EngineConfig;
use crate::context::VisitContext;
use crate::error::EngineError;
use crate::missingness::MissingnessEvaluator;
use crate::registry::RuleRegistry;
use crate::resolve::{Resolver, record_working};

/// What one pass wrote.
#[derive(Debug, Clone)]
pub struct VisitReport {
    pub version: SchemaVersion,
    pub visit_date: Option<Date>,
    pub resolved: BTreeMap<String, Value>,
    /// Output paths in the order they were written.
    pub derived: Vec<String>,
}

pub struct Pipeline {
    config: EngineConfig,
    registry: RuleRegistry,
    codes: Arc<CodeTable>,
}

impl Pipeline {
    pub fn new(config: EngineConfig, registry: RuleRegistry) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            registry,
            codes: Arc::new(CodeTable::new()),
        })
    }

    pub fn with_codes(mut self, codes: Arc<CodeTable>) -> Self {
        self.codes = codes;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Derive every registered field for the visit held in `store`.
    pub fn run_visit(&self, store: &mut PathStore) -> Result<VisitReport, EngineError> {
        let config = &self.config;
        let forms = Namespace::forms(store, &config.form_layer);

        let version = visit_version(&forms, &config.version_field)?;
        let visit_date = visit_date(&forms, &config.visit_date_field)?;
        if visit_date.is_none() && !config.tracked.is_empty() {
            return Err(CoreError::MissingRequired {
                scope: forms.prefix().to_string(),
                fields: vec![config.visit_date_field.clone()],
            }
            .into());
        }

        let evaluator = MissingnessEvaluator::new(config, version, &forms)?;

        let resolved = {
            let resolver = Resolver::new(store, &config.form_layer, &config.missing_marker);
            config
                .resolved_fields()
                .into_iter()
                .map(|field| Ok((field.to_string(), evaluator.evaluate(field, &resolver)?)))
                .collect::<Result<BTreeMap<_, _>, EngineError>>()?
        };
        for (field, value) in &resolved {
            store.set_key(&ScopePrefix::resolved().key(field.as_str()), value.clone())?;
        }

        let mut derived = Vec::with_capacity(self.registry.len());
        for rule in self.registry.iter() {
            let value = {
                let ctx = VisitContext::new(store, config, visit_date, &evaluator, &self.codes);
                rule.derive(&ctx).map_err(|e| e.in_rule(rule.name()))?
            };
            let key = rule.target().prefix().key(rule.name());
            tracing::debug!(rule = rule.name(), key = %key, "derived");
            store.set_key(&key, value)?;
            derived.push(key.path());
        }

        if let Some(date) = visit_date {
            for field in &config.tracked {
                match resolved.get(field) {
                    Some(value) if !value.is_null() && !values_match(value, &config.missing_marker) => {
                        record_working(store, field, date, value.clone())?;
                    }
                    _ => tracing::debug!(field = %field, "tracked field unresolved, working state unchanged"),
                }
            }
        }

        tracing::info!(
            version = %version,
            resolved = resolved.len(),
            derived = derived.len(),
            "visit derived"
        );

        Ok(VisitReport {
            version,
            visit_date,
            resolved,
            derived,
        })
    }

    /// Run a subject's visits in the given (chronological) order, chaining
    /// subject state and the previous-visit mirror between them.
    pub fn run_subject<I>(&self, visits: I) -> Result<Vec<PathStore>, EngineError>
    where
        I: IntoIterator<Item = PathStore>,
    {
        let mut done: Vec<PathStore> = Vec::new();
        for raw in visits {
            let mut store = match done.last() {
                Some(previous) => chain_visit(previous, raw)?,
                None => raw,
            };
            self.run_visit(&mut store)?;
            done.push(store);
        }
        Ok(done)
    }
}

/// Build the next visit's store: carry the `subject` subtree forward and
/// mirror the previous visit's `file.info` under `_prev_record.info`.
pub fn chain_visit(previous: &PathStore, next: PathStore) -> Result<PathStore, EngineError> {
    let mut next = next;

    let subject = Entity::Subject.as_str();
    for (path, value) in previous.flatten_prefix(subject) {
        if !next.contains(&path) {
            next.set(&path, value)?;
        }
    }

    let prev_root = Entity::PrevRecord.as_str();
    next.delete(prev_root);
    if let Some(info) = previous.get(&format!("{}.info", Entity::File.as_str())) {
        next.set(&format!("{prev_root}.info"), info.clone())?;
    }
    Ok(next)
}

fn visit_version(forms: &Namespace<'_>, field: &str) -> Result<SchemaVersion, EngineError> {
    let raw = forms
        .assert_required(&[field])?
        .into_iter()
        .next()
        .ok_or_else(|| EngineError::Derivation(format!("version field '{field}' vanished")))?;
    Ok(SchemaVersion::normalize(raw)?)
}

fn visit_date(forms: &Namespace<'_>, field: &str) -> Result<Option<Date>, EngineError> {
    let Some(raw) = forms.get::<String>(field, None)? else {
        return Ok(None);
    };
    // Accept full timestamps by keeping only the date part.
    let date_part = raw.get(..10).unwrap_or(&raw);
    let date = date_part
        .parse::<Date>()
        .map_err(|e| CoreError::InvalidField(format!("unparseable visit date '{raw}': {e}")))?;
    Ok(Some(date))
}
