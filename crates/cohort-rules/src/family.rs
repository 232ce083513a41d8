//! Per-member family status, by schema version.
//!
//! Forms up to version 3 ask a yes/no/unknown dementia question per
//! relative (`momdem`, `sib3dem`, ...) and record how many siblings and
//! children there are. Version 4 records a neurological diagnosis code per
//! relative (`momneur`, `kid2neur`, ...) with no counts. Both are reduced
//! to [`GroupStatus`] here so aggregation never sees raw codes.

use cohort_core::version::SchemaVersion;
use cohort_engine::context::VisitContext;
use cohort_engine::error::EngineError;
use cohort_engine::group::GroupStatus;
use serde_json::Value;

pub const MAX_SIBLINGS: usize = 20;
pub const MAX_CHILDREN: usize = 15;

/// Count value meaning the number of relatives is not known.
const UNKNOWN_COUNT: i64 = 99;

pub trait MemberHandler: Send + Sync {
    fn mother(&self, ctx: &VisitContext<'_>) -> Result<GroupStatus, EngineError>;

    fn father(&self, ctx: &VisitContext<'_>) -> Result<GroupStatus, EngineError>;

    fn siblings(&self, ctx: &VisitContext<'_>) -> Result<Vec<GroupStatus>, EngineError>;

    fn children(&self, ctx: &VisitContext<'_>) -> Result<Vec<GroupStatus>, EngineError>;

    /// Every first-degree relative: parents, then siblings, then children.
    fn members(&self, ctx: &VisitContext<'_>) -> Result<Vec<GroupStatus>, EngineError> {
        let mut members = vec![self.mother(ctx)?, self.father(ctx)?];
        members.extend(self.siblings(ctx)?);
        members.extend(self.children(ctx)?);
        Ok(members)
    }
}

/// Pick the handler for a visit's schema version.
pub fn member_handler(version: SchemaVersion) -> Box<dyn MemberHandler> {
    if version >= SchemaVersion::V4 {
        Box::new(FamilyHandlerV4)
    } else {
        Box::new(LegacyFamilyHandler)
    }
}

/// Versions 1 to 3: `<member>dem` with 0 = no, 1 = yes, 9 = unknown.
pub struct LegacyFamilyHandler;

impl LegacyFamilyHandler {
    fn status(ctx: &VisitContext<'_>, field: &str) -> Result<GroupStatus, EngineError> {
        let value = ctx.evaluate(field)?;
        Ok(match code(&value) {
            Some(0) => GroupStatus::No,
            Some(1) => GroupStatus::Yes,
            Some(9) => GroupStatus::Unknown,
            _ => GroupStatus::NotApplicable,
        })
    }

    fn relatives(
        ctx: &VisitContext<'_>,
        count_field: &str,
        member: &str,
        max: usize,
    ) -> Result<Vec<GroupStatus>, EngineError> {
        let count = ctx.evaluate(count_field)?;
        match code(&count) {
            Some(UNKNOWN_COUNT) => Ok(vec![GroupStatus::Unknown]),
            Some(n) if n > 0 => {
                let n = usize::try_from(n).unwrap_or(max);
                if n > max {
                    tracing::debug!(field = count_field, count = n, max, "relative count capped");
                }
                (1..=n.min(max))
                    .map(|i| Self::status(ctx, &format!("{member}{i}dem")))
                    .collect()
            }
            _ => Ok(Vec::new()),
        }
    }
}

impl MemberHandler for LegacyFamilyHandler {
    fn mother(&self, ctx: &VisitContext<'_>) -> Result<GroupStatus, EngineError> {
        Self::status(ctx, "momdem")
    }

    fn father(&self, ctx: &VisitContext<'_>) -> Result<GroupStatus, EngineError> {
        Self::status(ctx, "daddem")
    }

    fn siblings(&self, ctx: &VisitContext<'_>) -> Result<Vec<GroupStatus>, EngineError> {
        Self::relatives(ctx, "sibs", "sib", MAX_SIBLINGS)
    }

    fn children(&self, ctx: &VisitContext<'_>) -> Result<Vec<GroupStatus>, EngineError> {
        Self::relatives(ctx, "kids", "kid", MAX_CHILDREN)
    }
}

/// Version 4: `<member>neur` with 8 = no neurological problem,
/// 9 = unknown and 1 through 7 naming a problem.
pub struct FamilyHandlerV4;

impl FamilyHandlerV4 {
    fn status(ctx: &VisitContext<'_>, field: &str) -> Result<GroupStatus, EngineError> {
        let value = ctx.evaluate(field)?;
        Ok(match code(&value) {
            Some(8) => GroupStatus::No,
            Some(9) => GroupStatus::Unknown,
            Some(1..=7) => GroupStatus::Yes,
            _ => GroupStatus::NotApplicable,
        })
    }

    /// Only slots present on the form count as relatives.
    fn relatives(ctx: &VisitContext<'_>, member: &str, max: usize) -> Result<Vec<GroupStatus>, EngineError> {
        (1..=max)
            .map(|i| format!("{member}{i}neur"))
            .filter(|field| ctx.forms().contains(field))
            .map(|field| Self::status(ctx, &field))
            .collect()
    }
}

impl MemberHandler for FamilyHandlerV4 {
    fn mother(&self, ctx: &VisitContext<'_>) -> Result<GroupStatus, EngineError> {
        Self::status(ctx, "momneur")
    }

    fn father(&self, ctx: &VisitContext<'_>) -> Result<GroupStatus, EngineError> {
        Self::status(ctx, "dadneur")
    }

    fn siblings(&self, ctx: &VisitContext<'_>) -> Result<Vec<GroupStatus>, EngineError> {
        Self::relatives(ctx, "sib", MAX_SIBLINGS)
    }

    fn children(&self, ctx: &VisitContext<'_>) -> Result<Vec<GroupStatus>, EngineError> {
        Self::relatives(ctx, "kid", MAX_CHILDREN)
    }
}

/// Integral code of a numeric value (`1` and `1.0` alike).
pub(crate) fn code(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}
