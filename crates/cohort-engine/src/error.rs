use cohort_core::error::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("derivation error: {0}")]
    Derivation(String),

    #[error("missing dependency '{dependency}' required by '{caller}'")]
    MissingDependency { dependency: String, caller: String },

    #[error("gate '{gate}' for field '{field}' could not be resolved")]
    UnresolvableGate { field: String, gate: String },

    #[error("duplicate rule name: {0}")]
    DuplicateRule(String),

    #[error("missing rules: {}", .0.join(", "))]
    MissingRules(Vec<String>),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Prefix the rule that was running when the error surfaced.
    pub fn in_rule(self, rule: &str) -> Self {
        match self {
            Self::Derivation(msg) => Self::Derivation(format!("{rule}: {msg}")),
            other => other,
        }
    }
}
