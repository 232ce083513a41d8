//! Family history aggregates.

use cohort_engine::context::VisitContext;
use cohort_engine::dependency::require_all;
use cohort_engine::error::EngineError;
use cohort_engine::group::{GroupStatus, aggregate, aggregate_values};
use cohort_engine::registry::{Derivation, Target};
use serde_json::Value;

use crate::family::{MemberHandler, member_handler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relatives {
    Mother,
    Father,
    FirstDegree,
}

/// Group status over a set of relatives. Subject-level outputs accumulate
/// across visits and an unknown never replaces a known prior value;
/// visit-level outputs reflect this visit alone.
///
/// Only unknown is held back. A visit whose relatives are all not
/// applicable replaces a known prior with the missingness marker.
#[derive(Debug, Clone)]
pub struct FamilyHistory {
    name: &'static str,
    relatives: Relatives,
    target: Target,
}

impl FamilyHistory {
    pub fn mother() -> Self {
        Self {
            name: "naccmom",
            relatives: Relatives::Mother,
            target: Target::Subject,
        }
    }

    pub fn father() -> Self {
        Self {
            name: "naccdad",
            relatives: Relatives::Father,
            target: Target::Subject,
        }
    }

    pub fn family() -> Self {
        Self {
            name: "naccfam",
            relatives: Relatives::FirstDegree,
            target: Target::Subject,
        }
    }

    pub fn visit_family() -> Self {
        Self {
            name: "naccfamv",
            relatives: Relatives::FirstDegree,
            target: Target::Visit,
        }
    }

    fn members(&self, handler: &dyn MemberHandler, ctx: &VisitContext<'_>) -> Result<Vec<GroupStatus>, EngineError> {
        match self.relatives {
            Relatives::Mother => Ok(vec![handler.mother(ctx)?]),
            Relatives::Father => Ok(vec![handler.father(ctx)?]),
            Relatives::FirstDegree => handler.members(ctx),
        }
    }
}

impl Derivation for FamilyHistory {
    fn name(&self) -> &str {
        self.name
    }

    fn target(&self) -> Target {
        self.target
    }

    fn derive(&self, ctx: &VisitContext<'_>) -> Result<Value, EngineError> {
        let handler = member_handler(ctx.version());
        let members = self.members(handler.as_ref(), ctx)?;

        let prior = match self.target {
            Target::Subject => ctx
                .subject()
                .raw(self.name)
                .map(|value| GroupStatus::from_value(value, ctx.missing_marker()))
                .transpose()?,
            Target::Visit => None,
        };

        let status = aggregate(&members, prior);
        tracing::debug!(rule = self.name, members = members.len(), ?prior, ?status, "family history aggregated");
        Ok(status.to_value(ctx.missing_marker()))
    }
}

/// Either parent, from the subject-level parent statuses already derived
/// this pass.
pub struct ParentHistory;

impl Derivation for ParentHistory {
    fn name(&self) -> &str {
        "naccpar"
    }

    fn derive(&self, ctx: &VisitContext<'_>) -> Result<Value, EngineError> {
        let parents: Vec<Value> = require_all(&ctx.subject(), &["naccmom", "naccdad"], self.name())?
            .into_iter()
            .cloned()
            .collect();
        aggregate_values(&parents, None, ctx.missing_marker())
    }
}
