//! Static lookup tables.
//!
//! Loaded once by the caller and shared read-only (`Arc<CodeTable>`) with
//! every rule that needs it. There is no process-wide table.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeTable {
    entries: BTreeMap<String, String>,
}

impl CodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(code, label)| (normalize(&code.into()), label.into()))
                .collect(),
        }
    }

    pub fn from_json_str(contents: &str) -> Result<Self, EngineError> {
        let raw: BTreeMap<String, String> = serde_json::from_str(contents)?;
        Ok(Self::from_entries(raw))
    }

    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let contents = std::fs::read_to_string(path)?;
        let table = Self::from_json_str(&contents)?;
        tracing::info!(path = %path.display(), entries = table.len(), "code table loaded");
        Ok(table)
    }

    /// Case- and whitespace-insensitive lookup.
    pub fn lookup(&self, code: &str) -> Option<&str> {
        self.entries.get(&normalize(code)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize(code: &str) -> String {
    code.trim().to_ascii_lowercase()
}
