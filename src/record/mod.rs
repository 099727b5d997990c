//! # Record Module
//!
//! Materialized items produced by an import.
//!
//! A [`DynamicRecord`] stores the values the generator emitted for one item,
//! tagged with the profile and item type it was generated against. Values are
//! kept as emitted and coerced on read: `try_*` accessors return a
//! [`CoerceError`], the plain accessors fall back to a caller default.

pub mod items;

pub use items::*;

use crate::tokenizer::RawFields;
use crate::{ForgeError, ForgeResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Failure to read a stored value as a given type.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CoerceError {
    #[error("field '{0}' is missing")]
    Missing(String),

    #[error("field '{field}' value '{value}' is not a valid {expected}")]
    Invalid {
        field: String,
        value: String,
        expected: &'static str,
    },
}

/// A single field value.
///
/// Imported values arrive as [`Value::Text`]; typed variants are used when a
/// record is built or edited programmatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// The value rendered as text, the form the tokenizer produces.
    pub fn as_text(&self) -> String {
        match self {
            Value::Text(text) => text.clone(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Bool(b) => b.to_string(),
        }
    }

    /// True for text that is empty or only whitespace.
    pub fn is_blank(&self) -> bool {
        matches!(self, Value::Text(text) if text.trim().is_empty())
    }

    pub fn to_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            Value::Text(text) => parse_int(text),
            _ => None,
        }
    }

    pub fn to_float(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(text) => parse_float(text),
            Value::Bool(_) => None,
        }
    }

    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Text(text) => parse_bool(text),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Parses an integer, accepting integral float text such as `"10.0"`.
pub fn parse_int(text: &str) -> Option<i64> {
    let text = text.trim();
    text.parse::<i64>().ok().or_else(|| {
        let f = text.parse::<f64>().ok()?;
        (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then(|| f as i64)
    })
}

/// Parses a finite float.
pub fn parse_float(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Parses `true`/`false` in any letter case.
pub fn parse_bool(text: &str) -> Option<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Field values of one record, keyed by field name.
pub type FieldMap = BTreeMap<String, Value>;

/// One generated item, tagged with the profile it was generated against.
///
/// # Examples
///
/// ```
/// use itemforge::{parse_object_fragment, DynamicRecord};
///
/// let fields = parse_object_fragment(r#"{"id":"food_1","hungerRestore":"10"}"#);
/// let record = DynamicRecord::build(fields, "survival_food", "Food").unwrap();
/// assert_eq!(record.id(), "food_1");
/// assert_eq!(record.get_int("hungerRestore", 0), 10);
/// assert_eq!(record.get_int("thirstRestore", 5), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicRecord {
    pub profile_id: String,
    pub item_type_name: String,
    pub fields: FieldMap,
}

impl DynamicRecord {
    /// Builds a record from tokenizer output.
    ///
    /// Fails with [`ForgeError::MissingIdentity`] unless the fields contain a
    /// non-empty `id`. Values are copied verbatim, nothing is coerced.
    pub fn build(
        raw: RawFields,
        profile_id: impl Into<String>,
        item_type_name: impl Into<String>,
    ) -> ForgeResult<Self> {
        let has_id = raw.get("id").is_some_and(|id| !id.trim().is_empty());
        if !has_id {
            return Err(ForgeError::MissingIdentity("id".to_string()));
        }

        Ok(Self {
            profile_id: profile_id.into(),
            item_type_name: item_type_name.into(),
            fields: raw.into_iter().map(|(k, v)| (k, Value::Text(v))).collect(),
        })
    }

    /// The record's `id`, empty if absent.
    pub fn id(&self) -> String {
        self.get_string("id", "")
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn try_get_string(&self, key: &str) -> Result<String, CoerceError> {
        self.get(key)
            .map(Value::as_text)
            .ok_or_else(|| CoerceError::Missing(key.to_string()))
    }

    pub fn try_get_int(&self, key: &str) -> Result<i64, CoerceError> {
        self.coerce(key, "integer", Value::to_int)
    }

    pub fn try_get_float(&self, key: &str) -> Result<f64, CoerceError> {
        self.coerce(key, "float", Value::to_float)
    }

    pub fn try_get_bool(&self, key: &str) -> Result<bool, CoerceError> {
        self.coerce(key, "boolean", Value::to_bool)
    }

    /// String value or `default` when the key is absent.
    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.try_get_string(key)
            .unwrap_or_else(|_| default.to_string())
    }

    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.try_get_int(key).unwrap_or(default)
    }

    pub fn get_float(&self, key: &str, default: f64) -> f64 {
        self.try_get_float(key).unwrap_or(default)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.try_get_bool(key).unwrap_or(default)
    }

    fn coerce<T>(
        &self,
        key: &str,
        expected: &'static str,
        convert: impl Fn(&Value) -> Option<T>,
    ) -> Result<T, CoerceError> {
        let value = self
            .get(key)
            .ok_or_else(|| CoerceError::Missing(key.to_string()))?;

        convert(value).ok_or_else(|| CoerceError::Invalid {
            field: key.to_string(),
            value: value.as_text(),
            expected,
        })
    }
}
