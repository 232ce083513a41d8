use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Every absent required field is listed, not just the first.
    #[error("missing required field(s) in {scope}: {}", fields.join(", "))]
    MissingRequired { scope: String, fields: Vec<String> },

    #[error("invalid field: {0}")]
    InvalidField(String),

    #[error("type mismatch for '{key}': expected {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: String,
        found: String,
    },

    #[error("key collision at '{path}': '{leaf}' holds a scalar value")]
    KeyCollision { path: String, leaf: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
