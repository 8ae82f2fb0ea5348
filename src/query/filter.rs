//! Filter/values pairs
//!
//! `CompiledFilter` is the unit every search is composed from: a predicate
//! string with named placeholders (`:uid`, `:dq0`, ...) and the ordered list
//! of values bound to them. Only column names, JSON paths and the fixed
//! operator set are ever written into `filter`; everything the caller
//! supplied travels through `values`.

use rusqlite::types::{Null, ToSql, ToSqlOutput};
use serde_json::Value;

/// A value bound to a named placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl BindValue {
    /// Bind a JSON value the way `json_extract` would return it, so that
    /// comparisons against payload fields line up type-for-type.
    /// Arrays and objects are bound as their JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Integer(i64::from(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Real(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => Self::Text(value.to_string()),
        }
    }
}

impl From<&str> for BindValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for BindValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl ToSql for BindValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::from(Null),
            Self::Integer(i) => ToSqlOutput::from(*i),
            Self::Real(f) => ToSqlOutput::from(*f),
            Self::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

/// A parameterized predicate and its ordered bound values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledFilter {
    /// Predicate text, empty when nothing constrains the search
    pub filter: String,
    /// `(placeholder name, value)` pairs in binding order; names carry no `:` prefix
    pub values: Vec<(String, BindValue)>,
}

impl CompiledFilter {
    /// True when no predicate was produced
    pub fn is_empty(&self) -> bool {
        self.filter.is_empty()
    }

    /// Placeholder names in binding order
    pub fn value_names(&self) -> Vec<&str> {
        self.values.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Look up the value bound to a placeholder
    pub fn value(&self, name: &str) -> Option<&BindValue> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    /// Placeholder names prefixed for rusqlite's named parameter binding
    pub fn sql_parameter_names(&self) -> Vec<String> {
        self.values
            .iter()
            .map(|(name, _)| format!(":{}", name))
            .collect()
    }
}
