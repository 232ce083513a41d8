//! Hierarchical path store.
//!
//! A nested `serde_json` object addressed by dotted paths. Intermediate
//! levels are created on demand; a path may never pass through a scalar.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::key::AttributeKey;

/// Flat dotted-path view of a store, the boundary format.
pub type FlatRecord = BTreeMap<String, Value>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathStore {
    root: Map<String, Value>,
}

impl PathStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already nested JSON object.
    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(CoreError::InvalidField(format!(
                "store root must be an object, found {}",
                type_name(&other)
            ))),
        }
    }

    /// Rebuild a nested store from its flattened form.
    pub fn expand<I, K>(flat: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut store = Self::new();
        for (path, value) in flat {
            store.set(path.as_ref(), value)?;
        }
        Ok(store)
    }

    pub fn as_value(&self) -> &Map<String, Value> {
        &self.root
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Set `path` to `value`, creating intermediate objects as needed.
    ///
    /// Fails with [`CoreError::KeyCollision`] if any proper prefix of `path`
    /// already holds a non-object value, and with [`CoreError::InvalidField`]
    /// if an object inside `value` has a key that is empty or dotted, which
    /// the flat form could not reproduce.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<(), CoreError> {
        let value = value.into();
        check_keys(path, &value)?;
        let segments = split(path)?;
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| CoreError::InvalidField("empty path".to_string()))?;

        let mut node = &mut self.root;
        for (depth, segment) in parents.iter().enumerate() {
            let entry = node
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            node = match entry {
                Value::Object(map) => map,
                _ => {
                    return Err(CoreError::KeyCollision {
                        path: path.to_string(),
                        leaf: segments[..=depth].join("."),
                    });
                }
            };
        }

        node.insert(last.to_string(), value);
        Ok(())
    }

    pub fn set_key(&mut self, key: &AttributeKey, value: impl Into<Value>) -> Result<(), CoreError> {
        self.set(&key.path(), value)
    }

    /// Look up `path`. Present-but-falsy values (`0`, `""`, `[]`, `null`)
    /// are returned as `Some`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let segments = split(path).ok()?;
        let (first, rest) = segments.split_first()?;
        let mut node = self.root.get(*first)?;
        for segment in rest {
            node = node.as_object()?.get(*segment)?;
        }
        Some(node)
    }

    pub fn get_key(&self, key: &AttributeKey) -> Option<&Value> {
        self.get(&key.path())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn contains_key(&self, key: &AttributeKey) -> bool {
        self.contains(&key.path())
    }

    /// Remove and return the value (leaf or subtree) at `path`.
    pub fn delete(&mut self, path: &str) -> Option<Value> {
        let segments = split(path).ok()?;
        let (last, parents) = segments.split_last()?;
        let mut node = &mut self.root;
        for segment in parents {
            node = node.get_mut(*segment)?.as_object_mut()?;
        }
        node.remove(*last)
    }

    /// Flatten to dotted paths. Arrays and empty objects are leaves.
    pub fn flatten(&self) -> FlatRecord {
        let mut out = FlatRecord::new();
        flatten_into(&self.root, "", &mut out);
        out
    }

    /// Flatten only the subtree under `prefix`, keeping full paths.
    pub fn flatten_prefix(&self, prefix: &str) -> FlatRecord {
        let mut out = FlatRecord::new();
        match self.get(prefix) {
            Some(Value::Object(map)) if !map.is_empty() => flatten_into(map, prefix, &mut out),
            Some(leaf) => {
                out.insert(prefix.to_string(), leaf.clone());
            }
            None => {}
        }
        out
    }
}

fn split(path: &str) -> Result<Vec<&str>, CoreError> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(CoreError::InvalidField(format!("malformed path: '{path}'")));
    }
    Ok(segments)
}

fn check_keys(path: &str, value: &Value) -> Result<(), CoreError> {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key.is_empty() || key.contains('.') {
                    return Err(CoreError::InvalidField(format!(
                        "object key '{key}' under '{path}' cannot be addressed by a dotted path"
                    )));
                }
                check_keys(path, child)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn flatten_into(map: &Map<String, Value>, prefix: &str, out: &mut FlatRecord) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(child) if !child.is_empty() => flatten_into(child, &path, out),
            leaf => {
                out.insert(path, leaf.clone());
            }
        }
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
