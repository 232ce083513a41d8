//! Engine configuration these rules are written against.

use cohort_engine::config::{CarryForwardRule, EngineConfig, GateCase, GateRule};
use serde_json::json;

/// `tobac100` may be carried forward with 777; `tobac30` is gated by
/// `tobac100` (never smoked means not smoking now) and `tobac100` is
/// tracked in working state so the carry-forward spans any number of visits.
pub fn engine_config() -> EngineConfig {
    EngineConfig {
        carry_forward: vec![CarryForwardRule {
            field: "tobac100".to_string(),
            codes: vec![json!(777)],
            versions: Vec::new(),
        }],
        gates: vec![GateRule {
            field: "tobac30".to_string(),
            gate: "tobac100".to_string(),
            cases: vec![
                GateCase {
                    when: vec![json!(0)],
                    then: json!(0),
                },
                GateCase {
                    when: vec![json!(9)],
                    then: json!(9),
                },
            ],
            required: false,
        }],
        tracked: vec!["tobac100".to_string()],
        ..EngineConfig::default()
    }
}
