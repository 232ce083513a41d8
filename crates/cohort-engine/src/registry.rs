//! Explicit rule registry.
//!
//! Rules are registered by value at startup. Duplicate names fail at build
//! time and [`RuleRegistry::verify`] reports expected rules that were never
//! registered, so neither surfaces halfway through a batch.

use std::collections::BTreeSet;

use cohort_core::key::ScopePrefix;
use serde_json::Value;

use crate::context::VisitContext;
use crate::error::EngineError;

/// Where a rule's output is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// `file.info.derived.<name>`
    Visit,
    /// `subject.info.derived.<name>`, cross-sectional.
    Subject,
}

impl Target {
    pub fn prefix(self) -> ScopePrefix {
        match self {
            Target::Visit => ScopePrefix::derived(),
            Target::Subject => ScopePrefix::subject_derived(),
        }
    }
}

/// One derived field.
pub trait Derivation: Send + Sync {
    /// Output field name, unique within a registry.
    fn name(&self) -> &str;

    fn target(&self) -> Target {
        Target::Visit
    }

    /// Compute the field. Return the missingness marker when it cannot be
    /// determined; rules never write to the store themselves.
    fn derive(&self, ctx: &VisitContext<'_>) -> Result<Value, EngineError>;
}

/// Rules in execution order.
pub struct RuleRegistry {
    rules: Vec<Box<dyn Derivation>>,
}

#[derive(Default)]
pub struct RegistryBuilder {
    rules: Vec<Box<dyn Derivation>>,
}

impl RegistryBuilder {
    pub fn register(mut self, rule: impl Derivation + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn register_boxed(mut self, rule: Box<dyn Derivation>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn build(self) -> Result<RuleRegistry, EngineError> {
        let mut seen = BTreeSet::new();
        for rule in &self.rules {
            if !seen.insert(rule.name()) {
                return Err(EngineError::DuplicateRule(rule.name().to_string()));
            }
        }
        Ok(RuleRegistry { rules: self.rules })
    }
}

impl RuleRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Derivation> {
        self.rules.iter().find(|r| r.name() == name).map(Box::as_ref)
    }

    pub fn names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Derivation> {
        self.rules.iter().map(Box::as_ref)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Fail listing every name in `expected` that is not registered.
    pub fn verify(&self, expected: &[&str]) -> Result<(), EngineError> {
        let missing: Vec<String> = expected
            .iter()
            .filter(|name| self.get(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(EngineError::MissingRules(missing))
        }
    }
}
