//! Typed configuration values
//!
//! Every setting is one of a closed set of variants. JSON is only the
//! on-disk representation; conversion happens at the store boundary.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde_json::{Map, Number, Value};

use super::error::ConfigError;

/// A nested mapping of settings
pub type ConfigTree = BTreeMap<String, ConfigValue>;

/// A single configuration value
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    Float(f64),
    List(Vec<String>),
    Table(ConfigTree),
}

impl ConfigValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Floats and integers both read as `f64`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Float(f) => Some(*f),
            ConfigValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            ConfigValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&ConfigTree> {
        match self {
            ConfigValue::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self, ConfigValue::Table(_))
    }

    /// Name of the variant, used in log and error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::String(_) => "string",
            ConfigValue::Integer(_) => "integer",
            ConfigValue::Boolean(_) => "boolean",
            ConfigValue::Float(_) => "float",
            ConfigValue::List(_) => "list",
            ConfigValue::Table(_) => "table",
        }
    }

    /// Convert a JSON value, reporting the dotted path of anything unsupported.
    ///
    /// `null` members of an object are dropped so the merge with defaults
    /// restores them. A `null` anywhere else is rejected.
    pub fn from_json(value: Value, path: &str) -> Result<Self, ConfigError> {
        match value {
            Value::String(s) => Ok(ConfigValue::String(s)),
            Value::Bool(b) => Ok(ConfigValue::Boolean(b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(ConfigValue::Integer(i))
                } else if n.is_f64() {
                    n.as_f64()
                        .map(ConfigValue::Float)
                        .ok_or_else(|| unsupported(path, "number out of range"))
                } else {
                    Err(unsupported(path, "integer does not fit in i64"))
                }
            }
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::String(s) => Ok(s),
                    other => Err(unsupported(
                        &format!("{}[{}]", path, i),
                        &format!("lists may only hold strings, found {}", json_type(&other)),
                    )),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(ConfigValue::List),
            Value::Object(map) => tree_from_json(map, path).map(ConfigValue::Table),
            Value::Null => Err(unsupported(path, "null is not a configuration value")),
        }
    }

    /// Convert to JSON. Non-finite floats have no JSON form and become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            ConfigValue::String(s) => Value::String(s.clone()),
            ConfigValue::Integer(i) => Value::Number((*i).into()),
            ConfigValue::Boolean(b) => Value::Bool(*b),
            ConfigValue::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            ConfigValue::List(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
            ConfigValue::Table(table) => tree_to_json(table),
        }
    }
}

/// Reject non-finite floats anywhere under `value`; they cannot survive a
/// save and reload. The error names the offending dotted path.
pub fn ensure_finite(value: &ConfigValue, key_path: &str) -> Result<(), ConfigError> {
    match value {
        ConfigValue::Float(f) if !f.is_finite() => Err(ConfigError::NonFiniteFloat {
            key_path: key_path.to_string(),
        }),
        ConfigValue::Table(table) => ensure_tree_finite(table, key_path),
        _ => Ok(()),
    }
}

/// [`ensure_finite`] over every value in a tree rooted at `path`
pub fn ensure_tree_finite(tree: &ConfigTree, path: &str) -> Result<(), ConfigError> {
    for (key, value) in tree {
        let child_path = if path.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", path, key)
        };
        ensure_finite(value, &child_path)?;
    }
    Ok(())
}

/// Convert a JSON object into a tree
pub fn tree_from_json(map: Map<String, Value>, path: &str) -> Result<ConfigTree, ConfigError> {
    let mut tree = ConfigTree::new();
    for (key, value) in map {
        if value.is_null() {
            continue;
        }
        let child_path = if path.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", path, key)
        };
        tree.insert(key, ConfigValue::from_json(value, &child_path)?);
    }
    Ok(tree)
}

/// Convert a tree into a JSON object
pub fn tree_to_json(tree: &ConfigTree) -> Value {
    Value::Object(
        tree.iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

fn unsupported(path: &str, reason: &str) -> ConfigError {
    ConfigError::Parse(format!("unsupported value at '{}': {}", path, reason))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::String(s) => write!(f, "{}", s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

impl From<PathBuf> for ConfigValue {
    fn from(value: PathBuf) -> Self {
        ConfigValue::String(value.to_string_lossy().into_owned())
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Integer(value)
    }
}

impl From<i32> for ConfigValue {
    fn from(value: i32) -> Self {
        ConfigValue::Integer(value.into())
    }
}

impl From<u16> for ConfigValue {
    fn from(value: u16) -> Self {
        ConfigValue::Integer(value.into())
    }
}

impl From<u32> for ConfigValue {
    fn from(value: u32) -> Self {
        ConfigValue::Integer(value.into())
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Boolean(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Float(value)
    }
}

impl From<Vec<String>> for ConfigValue {
    fn from(value: Vec<String>) -> Self {
        ConfigValue::List(value)
    }
}

impl From<Vec<&str>> for ConfigValue {
    fn from(value: Vec<&str>) -> Self {
        ConfigValue::List(value.into_iter().map(str::to_string).collect())
    }
}

impl From<ConfigTree> for ConfigValue {
    fn from(value: ConfigTree) -> Self {
        ConfigValue::Table(value)
    }
}
