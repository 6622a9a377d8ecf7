//! Runtime values visible to templates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A value in the render scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Convert a JSON value into a template value.
    pub fn from_json(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(arr) => Value::Array(arr.into_iter().map(Value::from_json).collect()),
            JsonValue::Object(obj) => Value::Object(
                obj.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// String form for substitution. Arrays and objects have none.
    pub fn stringify(&self) -> Option<String> {
        match self {
            Value::Null => Some(String::new()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Integer(n) => Some(n.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Walk object properties along `path`.
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        path.iter().try_fold(self, |value, segment| match value {
            Value::Object(obj) => obj.get(segment.as_ref()),
            _ => None,
        })
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Top-level entries of an object; empty for anything else.
    pub fn into_entries(self) -> Vec<(String, Value)> {
        match self {
            Value::Object(obj) => obj.into_iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        Value::from_json(json)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stringify_scalars() {
        assert_eq!(Value::from("hello").stringify().unwrap(), "hello");
        assert_eq!(Value::Integer(-42).stringify().unwrap(), "-42");
        assert_eq!(Value::Float(2.5).stringify().unwrap(), "2.5");
        assert_eq!(Value::Bool(true).stringify().unwrap(), "true");
        assert_eq!(Value::Null.stringify().unwrap(), "");
    }

    #[test]
    fn test_compound_values_do_not_stringify() {
        assert!(Value::Array(vec![]).stringify().is_none());
        assert!(Value::Object(BTreeMap::new()).stringify().is_none());
    }

    #[test]
    fn test_from_json_and_path() {
        let value = Value::from_json(json!({"user": {"name": "Dana", "age": 30}}));
        assert_eq!(
            value.get_path(&["user", "name"]),
            Some(&Value::String("Dana".to_string()))
        );
        assert_eq!(value.get_path(&["user", "age"]), Some(&Value::Integer(30)));
        assert_eq!(value.get_path(&["user", "name", "first"]), None);
        assert_eq!(value.get_path(&["missing"]), None);
        assert_eq!(value.get_path::<&str>(&[]), Some(&value));
    }

    #[test]
    fn test_float_from_json() {
        assert_eq!(Value::from_json(json!(1.5)), Value::Float(1.5));
        assert_eq!(Value::from_json(json!(7)), Value::Integer(7));
    }
}
