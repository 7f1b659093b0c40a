//! The dynamically-typed value domain shared by the environment, the evaluator and the
//! serializer.

use std::collections::BTreeMap;
use std::fmt;

use hcl::edit::Number;
use serde_json::Value as JsonValue;

/// A value produced by evaluating an HCL expression.
///
/// Lists, sets and tuples are kept distinct at the type level because HCL distinguishes them,
/// but they collapse to the same JSON array shape on output.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Value>),
    Set(Vec<Value>),
    Tuple(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Object(Vec<(String, Value)>),
    /// A value whose concrete contents could not be determined statically.
    Unknown,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) | Value::Set(v) | Value::Tuple(v) => Some(v),
            _ => None,
        }
    }

    /// Converts to an ordered sequence of `(key, value)` pairs for map/object-shaped values.
    pub fn as_entries(&self) -> Option<Vec<(String, Value)>> {
        match self {
            Value::Map(m) => Some(m.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
            Value::Object(o) => Some(o.clone()),
            _ => None,
        }
    }

    pub fn string(s: impl Into<String>) -> Value {
        Value::String(s.into())
    }

    pub fn int(n: i64) -> Value {
        Value::Number(Number::from(n))
    }

    /// Renders the value the way Terraform's string conversion would: numbers without trailing
    /// zeroes, booleans as `true`/`false`, `null` as the empty string is NOT produced here (the
    /// caller decides whether null is valid in a string context).
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(n),
            Value::String(s) => s.clone(),
            _ => self.to_json().to_string(),
        }
    }

    /// Converts into a `serde_json::Value`, the representation used by the body serializer.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Number(n) => number_to_json(n),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::List(v) | Value::Set(v) | Value::Tuple(v) => {
                JsonValue::Array(v.iter().map(Value::to_json).collect())
            }
            Value::Map(m) => {
                JsonValue::Object(m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
            }
            Value::Object(o) => {
                JsonValue::Object(o.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
            }
            Value::Unknown => JsonValue::Null,
        }
    }

    pub fn from_json(json: &JsonValue) -> Value {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Number(Number::from(i))
                } else if let Some(f) = n.as_f64() {
                    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
                } else {
                    Value::Null
                }
            }
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(a) => Value::Tuple(a.iter().map(Value::from_json).collect()),
            JsonValue::Object(o) => Value::Object(
                o.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

pub fn format_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else if let Some(f) = n.as_f64() {
        // Terraform numbers never print a trailing ".0" for whole floats.
        if f.fract() == 0.0 && f.is_finite() {
            format!("{}", f as i64)
        } else {
            let mut s = format!("{f}");
            if !s.contains('.') && !s.contains('e') {
                s.push_str(".0");
            }
            s
        }
    } else {
        String::new()
    }
}

fn number_to_json(n: &Number) -> JsonValue {
    if let Some(i) = n.as_i64() {
        JsonValue::Number(i.into())
    } else if let Some(u) = n.as_u64() {
        JsonValue::Number(u.into())
    } else if let Some(f) = n.as_f64() {
        serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null)
    } else {
        JsonValue::Null
    }
}
