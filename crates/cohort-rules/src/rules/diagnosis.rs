use cohort_engine::context::VisitContext;
use cohort_engine::error::EngineError;
use cohort_engine::registry::Derivation;
use serde_json::Value;

/// Label of the primary etiology code `primdx`, from the injected code table.
pub struct PrimaryEtiology;

impl Derivation for PrimaryEtiology {
    fn name(&self) -> &str {
        "naccetpr"
    }

    fn derive(&self, ctx: &VisitContext<'_>) -> Result<Value, EngineError> {
        let raw = ctx.evaluate("primdx")?;
        let code = match &raw {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return Ok(ctx.missing_marker().clone()),
        };

        match ctx.codes().lookup(&code) {
            Some(label) => Ok(Value::from(label)),
            None => {
                tracing::debug!(code = %code, "etiology code not in table");
                Ok(ctx.missing_marker().clone())
            }
        }
    }
}
