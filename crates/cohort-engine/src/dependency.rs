//! Dependency ordering contract.
//!
//! Rules derived from other derived fields check their inputs exist before
//! reading them. The engine never reorders rules; it only detects a rule
//! that ran too early.

use cohort_core::namespace::Namespace;
use serde_json::Value;

use crate::error::EngineError;

pub fn require_derived<'a>(
    namespace: &Namespace<'a>,
    dependency: &str,
    caller: &str,
) -> Result<&'a Value, EngineError> {
    namespace.raw(dependency).ok_or_else(|| {
        tracing::debug!(dependency, caller, "dependency not yet derived");
        EngineError::MissingDependency {
            dependency: namespace.key(dependency).path(),
            caller: caller.to_string(),
        }
    })
}

/// All of `dependencies`, in order. Fails on the first absent one.
pub fn require_all<'a>(
    namespace: &Namespace<'a>,
    dependencies: &[&str],
    caller: &str,
) -> Result<Vec<&'a Value>, EngineError> {
    dependencies
        .iter()
        .map(|dependency| require_derived(namespace, dependency, caller))
        .collect()
}
