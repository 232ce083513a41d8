//! Engine configuration.
//!
//! Sentinel conventions differ between schema versions and are data, not
//! code: the missingness marker, carry-forward codes, gate recodings, chains
//! and slot groups are all supplied here by the caller.

use std::collections::BTreeSet;
use std::path::Path;

use cohort_core::key::DEFAULT_LAYER;
use cohort_core::version::SchemaVersion;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineError;
use crate::missingness::GateTable;

/// Current config version. Bump this when adding fields or changing shape.
/// Each bump requires a corresponding entry in [`migrate`].
const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Schema version. Missing or 0 = pre-versioned config.
    #[serde(default)]
    pub config_version: u32,
    /// Value meaning "cannot be determined / not applicable".
    #[serde(default)]
    pub missing_marker: Value,
    #[serde(default = "default_version_field")]
    pub version_field: String,
    #[serde(default = "default_visit_date_field")]
    pub visit_date_field: String,
    #[serde(default = "default_layer")]
    pub form_layer: String,
    #[serde(default)]
    pub carry_forward: Vec<CarryForwardRule>,
    #[serde(default)]
    pub gates: Vec<GateRule>,
    #[serde(default)]
    pub chains: Vec<GateChain>,
    #[serde(default)]
    pub groups: Vec<FieldGroup>,
    /// Fields whose resolved value is appended to working state each visit.
    #[serde(default)]
    pub tracked: Vec<String>,
}

/// Codes meaning "look at history" for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarryForwardRule {
    pub field: String,
    pub codes: Vec<Value>,
    /// Versions the codes apply to. Empty = every version.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<SchemaVersion>,
}

impl CarryForwardRule {
    pub fn applies_to(&self, version: SchemaVersion) -> bool {
        self.versions.is_empty() || self.versions.contains(&version)
    }
}

/// "If GATE is one of `when`, FIELD is `then`."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateCase {
    pub when: Vec<Value>,
    pub then: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateRule {
    pub field: String,
    pub gate: String,
    pub cases: Vec<GateCase>,
    /// Fail instead of falling through when the gate itself is unresolvable.
    #[serde(default)]
    pub required: bool,
}

/// Linear cascade: each field's resolved value gates the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateChain {
    pub fields: Vec<String>,
    pub cases: Vec<GateCase>,
    #[serde(default)]
    pub required: bool,
}

impl GateChain {
    pub fn rules(&self) -> impl Iterator<Item = GateRule> + '_ {
        self.fields.windows(2).map(|pair| GateRule {
            field: pair[1].clone(),
            gate: pair[0].clone(),
            cases: self.cases.clone(),
            required: self.required,
        })
    }
}

/// Parallel slots (e.g. code / explanation / free text triples) that are
/// reordered so the selected slot comes first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldGroup {
    pub name: String,
    pub slots: Vec<Vec<String>>,
    /// Position within each slot of the field that marks selection.
    #[serde(default)]
    pub selector: usize,
    pub selected: Vec<Value>,
}

fn default_version_field() -> String {
    "formver".to_string()
}

fn default_visit_date_field() -> String {
    "visitdate".to_string()
}

fn default_layer() -> String {
    DEFAULT_LAYER.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            config_version: CURRENT_VERSION,
            missing_marker: Value::Null,
            version_field: default_version_field(),
            visit_date_field: default_visit_date_field(),
            form_layer: default_layer(),
            carry_forward: Vec::new(),
            gates: Vec::new(),
            chains: Vec::new(),
            groups: Vec::new(),
            tracked: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("failed to read config at {}: {e}", path.display())))?;
        let config = Self::from_json_str(&contents)?;
        tracing::info!(path = %path.display(), "engine config loaded");
        Ok(config)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, EngineError> {
        // Parse as raw JSON so we can run migrations before deserializing.
        let json: Value = serde_json::from_str(contents)?;
        let on_disk_version = json
            .get("config_version")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let on_disk_version = u32::try_from(on_disk_version)
            .map_err(|_| EngineError::Config(format!("config_version {on_disk_version} is out of range")))?;

        let migrated = migrate(json, on_disk_version)?;
        let config: EngineConfig = serde_json::from_value(migrated)?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks that would otherwise surface mid-derivation.
    pub fn validate(&self) -> Result<(), EngineError> {
        GateTable::from_config(self)?;

        for group in &self.groups {
            let width = group.slots.first().map_or(0, Vec::len);
            if width == 0 || group.slots.iter().any(|slot| slot.len() != width) {
                return Err(EngineError::Config(format!(
                    "group '{}' must have non-empty slots of equal width",
                    group.name
                )));
            }
            if group.selector >= width {
                return Err(EngineError::Config(format!(
                    "group '{}' selector {} outside slot width {width}",
                    group.name, group.selector
                )));
            }
        }
        Ok(())
    }

    pub fn carry_forward_codes(&self, field: &str, version: SchemaVersion) -> &[Value] {
        self.carry_forward
            .iter()
            .find(|rule| rule.field == field && rule.applies_to(version))
            .map(|rule| rule.codes.as_slice())
            .unwrap_or(&[])
    }

    /// Every field the engine publishes under `file.info.resolved`.
    pub fn resolved_fields(&self) -> BTreeSet<&str> {
        let mut fields = BTreeSet::new();
        fields.extend(self.carry_forward.iter().map(|r| r.field.as_str()));
        for rule in &self.gates {
            fields.insert(rule.field.as_str());
            fields.insert(rule.gate.as_str());
        }
        for chain in &self.chains {
            fields.extend(chain.fields.iter().map(String::as_str));
        }
        for group in &self.groups {
            fields.extend(group.slots.iter().flatten().map(String::as_str));
        }
        fields.extend(self.tracked.iter().map(String::as_str));
        fields
    }
}

/// Run sequential migrations from `from_version` up to [`CURRENT_VERSION`].
fn migrate(mut json: Value, from_version: u32) -> Result<Value, EngineError> {
    if from_version > CURRENT_VERSION {
        return Err(EngineError::Config(format!(
            "config_version {from_version} is newer than this build supports ({CURRENT_VERSION})"
        )));
    }

    // v0 → v1: `missing` renamed, `carry_forward` map became a versioned list
    if from_version < 1 {
        let obj = json
            .as_object_mut()
            .ok_or_else(|| EngineError::Config("config is not a JSON object".to_string()))?;

        if let Some(marker) = obj.remove("missing") {
            obj.entry("missing_marker").or_insert(marker);
        }

        if let Some(Value::Object(map)) = obj.get("carry_forward") {
            let rules: Vec<Value> = map
                .iter()
                .map(|(field, codes)| {
                    let codes = match codes {
                        Value::Array(_) => codes.clone(),
                        single => Value::Array(vec![single.clone()]),
                    };
                    serde_json::json!({ "field": field, "codes": codes })
                })
                .collect();
            obj.insert("carry_forward".to_string(), Value::Array(rules));
        }

        obj.insert("config_version".to_string(), Value::Number(1.into()));
        tracing::info!("migrated engine config v0 → v1 (versioned carry-forward rules)");
    }

    Ok(json)
}
