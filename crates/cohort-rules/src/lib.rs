//! cohort-rules
//!
//! Concrete derivation rules built on `cohort-engine`: family history
//! aggregates over schema-specific member handlers, smoking status with a
//! gated carry-forward input, and a code-table lookup.

pub mod config;
pub mod family;
pub mod rules;

use cohort_engine::error::EngineError;
use cohort_engine::registry::{Derivation, RuleRegistry};

pub use crate::config::engine_config;
pub use crate::family::{FamilyHandlerV4, LegacyFamilyHandler, MemberHandler, member_handler};

/// Every rule this crate provides, in execution order.
pub const RULE_NAMES: &[&str] = &[
    "naccmom", "naccdad", "naccpar", "naccfam", "naccfamv", "nacctob", "naccetpr",
];

/// Return all rules, ordered so derived-from-derived rules run after their
/// inputs.
pub fn all_rules() -> Vec<Box<dyn Derivation>> {
    vec![
        Box::new(rules::family::FamilyHistory::mother()),
        Box::new(rules::family::FamilyHistory::father()),
        Box::new(rules::family::ParentHistory),
        Box::new(rules::family::FamilyHistory::family()),
        Box::new(rules::family::FamilyHistory::visit_family()),
        Box::new(rules::tobacco::SmokingStatus),
        Box::new(rules::diagnosis::PrimaryEtiology),
    ]
}

/// Build the registry and check nothing in [`RULE_NAMES`] is missing.
pub fn registry() -> Result<RuleRegistry, EngineError> {
    let registry = all_rules()
        .into_iter()
        .fold(RuleRegistry::builder(), |builder, rule| builder.register_boxed(rule))
        .build()?;
    registry.verify(RULE_NAMES)?;
    tracing::debug!(rules = ?registry.names(), "rule registry built");
    Ok(registry)
}
