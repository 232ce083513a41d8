//! Read-only view of one visit handed to every rule.

use cohort_core::key::Section;
use cohort_core::namespace::{Namespace, WorkingNamespace};
use cohort_core::store::PathStore;
use cohort_core::version::SchemaVersion;
use jiff::civil::Date;
use serde_json::Value;

use crate::codes::CodeTable;
use crate::config::EngineConfig;
use crate::dependency::require_derived;
use crate::error::EngineError;
use crate::missingness::MissingnessEvaluator;
use crate::resolve::Resolver;

pub struct VisitContext<'a> {
    store: &'a PathStore,
    config: &'a EngineConfig,
    version: SchemaVersion,
    visit_date: Option<Date>,
    resolver: Resolver<'a>,
    missingness: &'a MissingnessEvaluator,
    codes: &'a CodeTable,
}

impl<'a> VisitContext<'a> {
    pub fn new(
        store: &'a PathStore,
        config: &'a EngineConfig,
        visit_date: Option<Date>,
        missingness: &'a MissingnessEvaluator,
        codes: &'a CodeTable,
    ) -> Self {
        Self {
            store,
            config,
            version: missingness.version(),
            visit_date,
            resolver: Resolver::new(store, &config.form_layer, &config.missing_marker),
            missingness,
            codes,
        }
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    pub fn visit_date(&self) -> Option<Date> {
        self.visit_date
    }

    pub fn config(&self) -> &'a EngineConfig {
        self.config
    }

    pub fn codes(&self) -> &'a CodeTable {
        self.codes
    }

    pub fn missing_marker(&self) -> &'a Value {
        &self.config.missing_marker
    }

    pub fn is_missing(&self, value: &Value) -> bool {
        self.resolver.is_missing(value)
    }

    /// Raw submitted values, before slot reordering. Rules reading slot
    /// group fields should use [`VisitContext::current`] or
    /// [`VisitContext::evaluate`].
    pub fn forms(&self) -> &Namespace<'a> {
        self.resolver.current()
    }

    pub fn resolved(&self) -> Namespace<'a> {
        Namespace::resolved(self.store)
    }

    pub fn derived(&self) -> Namespace<'a> {
        Namespace::derived(self.store)
    }

    pub fn subject(&self) -> Namespace<'a> {
        Namespace::subject_derived(self.store)
    }

    pub fn working(&self) -> &WorkingNamespace<'a> {
        self.resolver.working()
    }

    pub fn prev(&self, section: Section) -> Option<Namespace<'a>> {
        Namespace::prev_record(self.store, section)
    }

    pub fn resolver(&self) -> &Resolver<'a> {
        &self.resolver
    }

    pub fn missingness(&self) -> &MissingnessEvaluator {
        self.missingness
    }

    /// The visit's value of `field` after slot reordering, before any
    /// resolution.
    pub fn current(&self, field: &str) -> Option<&Value> {
        self.missingness.current(field, &self.resolver)
    }

    /// Gate-aware, history-aware value of a raw field.
    pub fn evaluate(&self, field: &str) -> Result<Value, EngineError> {
        self.missingness.evaluate(field, &self.resolver)
    }

    /// Carry-forward resolution only, with the field's configured codes and
    /// the reordered slot values.
    pub fn resolve(&self, field: &str, default: Option<&Value>) -> Result<Value, EngineError> {
        self.missingness.resolve(field, &self.resolver, default)
    }

    /// A visit-level derived value that must already exist.
    pub fn require(&self, dependency: &str, caller: &str) -> Result<&'a Value, EngineError> {
        require_derived(&self.derived(), dependency, caller)
    }

    /// A subject-level derived value that must already exist.
    pub fn require_subject(&self, dependency: &str, caller: &str) -> Result<&'a Value, EngineError> {
        require_derived(&self.subject(), dependency, caller)
    }
}
