//! Gated missingness evaluator.
//!
//! An absent or carry-forward value is recoded from a sibling gate field
//! ("if GATE=0 then FIELD=8") before the generic history policy applies.
//! Gates may themselves be gated, forming finite cascades. Slot groups are
//! reordered once at construction; every later read sees the reordered view.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use cohort_core::namespace::Namespace;
use cohort_core::value::{is_absent, matches_any};
use cohort_core::version::SchemaVersion;
use serde_json::Value;

use crate::config::{EngineConfig, FieldGroup, GateRule};
use crate::error::EngineError;
use crate::resolve::Resolver;

/// Gate rules keyed by gated field, validated acyclic.
#[derive(Debug, Clone, Default)]
pub struct GateTable {
    rules: BTreeMap<String, GateRule>,
}

impl GateTable {
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        let declared = config
            .gates
            .iter()
            .cloned()
            .chain(config.chains.iter().flat_map(|chain| chain.rules()));

        let mut rules = BTreeMap::new();
        for rule in declared {
            if rules.contains_key(&rule.field) {
                return Err(EngineError::Config(format!(
                    "field '{}' has more than one gate rule",
                    rule.field
                )));
            }
            rules.insert(rule.field.clone(), rule);
        }

        let table = Self { rules };
        table.check_acyclic()?;
        Ok(table)
    }

    pub fn rule(&self, field: &str) -> Option<&GateRule> {
        self.rules.get(field)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn check_acyclic(&self) -> Result<(), EngineError> {
        for start in self.rules.keys() {
            let mut seen = BTreeSet::new();
            let mut field = start.as_str();
            while let Some(rule) = self.rules.get(field) {
                if !seen.insert(field) {
                    return Err(EngineError::Config(format!("gate cycle through field '{start}'")));
                }
                field = rule.gate.as_str();
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct MissingnessEvaluator {
    version: SchemaVersion,
    gates: GateTable,
    codes: BTreeMap<String, Vec<Value>>,
    /// Canonical slot field → value taken from the slot now occupying it.
    reordered: BTreeMap<String, Option<Value>>,
    cache: RefCell<BTreeMap<String, Value>>,
}

impl MissingnessEvaluator {
    /// Build the evaluator for one pass, reordering slot groups eagerly.
    pub fn new(config: &EngineConfig, version: SchemaVersion, current: &Namespace<'_>) -> Result<Self, EngineError> {
        let gates = GateTable::from_config(config)?;

        let mut codes = BTreeMap::new();
        for rule in config.carry_forward.iter().filter(|r| r.applies_to(version)) {
            codes.entry(rule.field.clone()).or_insert_with(|| rule.codes.clone());
        }

        let mut reordered = BTreeMap::new();
        for group in &config.groups {
            reorder_group(group, current, &mut reordered);
        }

        Ok(Self {
            version,
            gates,
            codes,
            reordered,
            cache: RefCell::new(BTreeMap::new()),
        })
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    pub fn gates(&self) -> &GateTable {
        &self.gates
    }

    pub fn codes(&self, field: &str) -> &[Value] {
        self.codes.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The pre-resolution value of `field`, after slot reordering.
    pub fn current<'r>(&'r self, field: &str, resolver: &Resolver<'r>) -> Option<&'r Value> {
        match self.reordered.get(field) {
            Some(slot) => slot.as_ref(),
            None => resolver.current().raw(field),
        }
    }

    /// Carry-forward resolution of `field` without gates, starting from the
    /// reordered value.
    pub fn resolve(&self, field: &str, resolver: &Resolver<'_>, default: Option<&Value>) -> Result<Value, EngineError> {
        let current = self.current(field, resolver);
        Ok(resolver.resolve_from(field, current, self.codes(field), default)?.value)
    }

    /// Resolve `field` through gates and history. Memoized for the pass.
    pub fn evaluate(&self, field: &str, resolver: &Resolver<'_>) -> Result<Value, EngineError> {
        let cached = self.cache.borrow().get(field).cloned();
        if let Some(value) = cached {
            return Ok(value);
        }

        let value = self.compute(field, resolver)?;
        self.cache.borrow_mut().insert(field.to_string(), value.clone());
        Ok(value)
    }

    fn compute(&self, field: &str, resolver: &Resolver<'_>) -> Result<Value, EngineError> {
        let codes = self.codes(field);
        let current = self.current(field, resolver);
        if !is_absent(current)
            && let Some(value) = current
            && !matches_any(value, codes)
        {
            return Ok(value.clone());
        }

        if let Some(rule) = self.gates.rule(field) {
            let gate_value = self.evaluate(&rule.gate, resolver)?;
            if resolver.is_missing(&gate_value) {
                if rule.required {
                    return Err(EngineError::UnresolvableGate {
                        field: field.to_string(),
                        gate: rule.gate.clone(),
                    });
                }
            } else if let Some(case) = rule.cases.iter().find(|c| matches_any(&gate_value, &c.when)) {
                tracing::trace!(field, gate = %rule.gate, "recoded from gate");
                return Ok(case.then.clone());
            }
        }

        Ok(resolver.resolve_history(field, codes, None)?.value)
    }
}

fn reorder_group(group: &FieldGroup, current: &Namespace<'_>, out: &mut BTreeMap<String, Option<Value>>) {
    let selected: Vec<bool> = group
        .slots
        .iter()
        .map(|slot| {
            slot.get(group.selector)
                .and_then(|field| current.raw(field))
                .is_some_and(|value| matches_any(value, &group.selected))
        })
        .collect();

    let mut order: Vec<usize> = (0..group.slots.len()).collect();
    order.sort_by_key(|&idx| !selected[idx]);
    tracing::debug!(group = %group.name, ?order, "slot group reordered");

    for (position, &source) in order.iter().enumerate() {
        for (canonical, origin) in group.slots[position].iter().zip(&group.slots[source]) {
            out.insert(canonical.clone(), current.raw(origin).cloned());
        }
    }
}
