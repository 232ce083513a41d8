use cohort_engine::context::VisitContext;
use cohort_engine::error::EngineError;
use cohort_engine::registry::Derivation;
use serde_json::Value;

use crate::family::code;

/// 0 = never smoked, 1 = smoked in the last 30 days, 2 = former smoker,
/// 9 = unknown.
///
/// Reads `tobac100` (ever smoked 100 cigarettes, carried forward from
/// history on 777) and `tobac30`, which is gated by `tobac100`.
pub struct SmokingStatus;

impl Derivation for SmokingStatus {
    fn name(&self) -> &str {
        "nacctob"
    }

    fn derive(&self, ctx: &VisitContext<'_>) -> Result<Value, EngineError> {
        let ever = code(&ctx.evaluate("tobac100")?);
        let recent = code(&ctx.evaluate("tobac30")?);

        let status = match (ever, recent) {
            (Some(0), _) => 0,
            (_, Some(1)) => 1,
            (Some(1), Some(0)) => 2,
            (Some(1) | Some(9), _) | (_, Some(9)) => 9,
            _ => return Ok(ctx.missing_marker().clone()),
        };
        Ok(Value::from(status))
    }
}
