//! Recursive plugin option values.
//!
//! A plugin instance is an ordered table of option name → `Value`, where a
//! value is a scalar, an array, or another table. Tables keep insertion
//! order; rendering relies on it.

use crate::error::{ProvisionError, Result};

/// A single plugin option value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Table(Table),
}

impl Value {
    /// Human-readable name of the value shape, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Table(_) => "table",
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, Self::Array(_) | Self::Table(_))
    }

    /// Convert a JSON value, reporting unrepresentable shapes at `path`.
    pub fn from_json(value: &serde_json::Value, path: &str) -> Result<Self> {
        match value {
            serde_json::Value::Null => Err(ProvisionError::unsupported_value(
                path,
                "null has no configuration representation",
            )),
            serde_json::Value::Bool(b) => Ok(Self::Boolean(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Integer(i))
                } else if n.is_u64() {
                    Err(ProvisionError::unsupported_value(
                        path,
                        format!("integer {n} does not fit in a signed 64-bit integer"),
                    ))
                } else {
                    n.as_f64().map(Self::Float).ok_or_else(|| {
                        ProvisionError::unsupported_value(path, format!("unrepresentable number {n}"))
                    })
                }
            }
            serde_json::Value::String(s) => Ok(Self::String(s.clone())),
            serde_json::Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| Self::from_json(item, &index_path(path, i)))
                .collect::<Result<Vec<_>>>()
                .map(Self::Array),
            serde_json::Value::Object(_) => Table::from_json(value, path).map(Self::Table),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::Array(v)
    }
}

impl From<Table> for Value {
    fn from(v: Table) -> Self {
        Self::Table(v)
    }
}

/// Insertion-ordered map of option name → value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    entries: Vec<(String, Value)>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value. An existing key keeps its position and takes the new value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Convert a JSON object; anything else is an unsupported value at `path`.
    pub fn from_json(value: &serde_json::Value, path: &str) -> Result<Self> {
        let serde_json::Value::Object(map) = value else {
            return Err(ProvisionError::unsupported_value(
                path,
                format!("expected a table, found {}", json_type_name(value)),
            ));
        };

        let mut table = Self::new();
        for (key, item) in map {
            table.insert(key.clone(), Value::from_json(item, &key_path(path, key))?);
        }
        Ok(table)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Table {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (k, v) in iter {
            table.insert(k, v);
        }
        table
    }
}

// ============================================================================
// Key paths
// ============================================================================

/// `parent.key`, or just `key` at the root.
pub fn key_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// `parent[index]`
pub fn index_path(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_table_preserves_insertion_order() {
        let table = Table::new()
            .with("zeta", 1)
            .with("alpha", 2)
            .with("mid", 3);
        let keys: Vec<&str> = table.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_table_insert_replaces_in_place() {
        let mut table = Table::new().with("a", 1).with("b", 2);
        table.insert("a", "replaced");
        let keys: Vec<&str> = table.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(table.get("a"), Some(&Value::String("replaced".into())));
    }

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(Value::from_json(&json!(true), "x").unwrap(), Value::Boolean(true));
        assert_eq!(Value::from_json(&json!(10000), "x").unwrap(), Value::Integer(10000));
        assert_eq!(Value::from_json(&json!(1.0), "x").unwrap(), Value::Float(1.0));
        assert_eq!(
            Value::from_json(&json!("60s"), "x").unwrap(),
            Value::String("60s".into())
        );
    }

    #[test]
    fn test_from_json_object_keeps_order() {
        let value = json!({"percpu": true, "totalcpu": true, "fielddrop": ["time_*"]});
        let table = Table::from_json(&value, "inputs.cpu[0]").unwrap();
        let keys: Vec<&str> = table.keys().collect();
        assert_eq!(keys, vec!["percpu", "totalcpu", "fielddrop"]);
    }

    #[test]
    fn test_from_json_null_reports_path() {
        let value = json!({"tags": {"env": null}});
        let err = Table::from_json(&value, "inputs.cpu[0]").unwrap_err();
        match err {
            ProvisionError::UnsupportedValueType { path, .. } => {
                assert_eq!(path, "inputs.cpu[0].tags.env");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_json_u64_overflow() {
        let value = json!(u64::MAX);
        let err = Value::from_json(&value, "outputs.file[0].limit").unwrap_err();
        assert_eq!(err.kind(), "UnsupportedValueType");
    }

    #[test]
    fn test_from_json_array_index_path() {
        let value = json!(["a", null]);
        let err = Value::from_json(&value, "inputs.net[0].interfaces").unwrap_err();
        assert!(err.to_string().contains("inputs.net[0].interfaces[1]"));
    }

    #[test]
    fn test_table_from_non_object() {
        let err = Table::from_json(&json!([1, 2]), "inputs.cpu[0]").unwrap_err();
        assert!(err.to_string().contains("expected a table, found array"));
    }
}
