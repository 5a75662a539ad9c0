//! Dynamic attribute values.
//!
//! # Responsibility
//! - Hold one scalar (or id list) attribute of an entity.
//! - Convert values to a declared `FieldType`, or refuse.
//! - Render values in the python-literal style used by display strings.

use crate::model::kind::FieldType;
use serde::{Deserialize, Serialize};

/// One attribute value. Serialized untagged so JSON stays schema-free.
///
/// Variant order matters for deserialization: integers must be tried
/// before floats so that `4` stays an integer and `4.0` stays a float.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
}

impl AttrValue {
    /// Converts this value to `ty`, or returns `None` when it does not fit.
    ///
    /// - Integers widen to floats; floats never narrow to integers.
    /// - Text fields take numbers in their text form, so ids and names
    ///   read back the same from either backend.
    pub fn conform(self, ty: FieldType) -> Option<AttrValue> {
        match (ty, self) {
            (FieldType::Integer, value @ AttrValue::Int(_)) => Some(value),
            (FieldType::Float, value @ AttrValue::Float(_)) => Some(value),
            (FieldType::Float, AttrValue::Int(number)) => Some(AttrValue::Float(number as f64)),
            (FieldType::IdList, value @ AttrValue::List(_)) => Some(value),
            (FieldType::Text, value @ AttrValue::Text(_)) => Some(value),
            (FieldType::Text, AttrValue::Int(number)) => Some(AttrValue::Text(number.to_string())),
            (FieldType::Text, AttrValue::Float(number)) => {
                Some(AttrValue::Text(python_float(number)))
            }
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Converts to a JSON value. Non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Int(value) => serde_json::Value::from(*value),
            Self::Float(value) => serde_json::Number::from_f64(*value)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::Text(value) => serde_json::Value::String(value.clone()),
            Self::List(values) => serde_json::Value::Array(
                values
                    .iter()
                    .map(|item| serde_json::Value::String(item.clone()))
                    .collect(),
            ),
        }
    }

    /// Renders the value the way a python `repr` would.
    pub fn to_python_literal(&self) -> String {
        match self {
            Self::Int(value) => value.to_string(),
            Self::Float(value) => python_float(*value),
            Self::Text(value) => python_str(value),
            Self::List(values) => {
                let items: Vec<String> = values.iter().map(|item| python_str(item)).collect();
                format!("[{}]", items.join(", "))
            }
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Quotes `value` like python's `repr(str)`.
///
/// Single quotes are preferred; double quotes are used when the text
/// contains a single quote but no double quote.
pub fn python_str(value: &str) -> String {
    let quote = if value.contains('\'') && !value.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn python_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}
