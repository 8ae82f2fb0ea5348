//! Data Query Expression AST
//!
//! A boolean tree of comparisons over record payload fields:
//!
//! ```text
//!             OR
//!           /    \
//!        AND      currency = 'EUR'
//!       /   \
//! amount > 10   status LIKE 'SETTLE%'
//! ```
//!
//! Leaves compare one payload field with one value. Internal nodes join two
//! subtrees with `AND` or `OR`. Only the operators enumerated here can ever
//! reach a filter string.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use crate::query::error::{QueryError, QueryResult};

/// Comparison operators permitted on a leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    /// Equal to
    Eq,
    /// Greater than
    Gt,
    /// Less than
    Lt,
    /// SQL pattern match
    Like,
    /// Inclusive range, value is a `[low, high]` pair
    Between,
}

impl ComparisonOperator {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "=" => Some(Self::Eq),
            ">" => Some(Self::Gt),
            "<" => Some(Self::Lt),
            "LIKE" => Some(Self::Like),
            "BETWEEN" => Some(Self::Between),
            _ => None,
        }
    }

    /// SQL text for this operator
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Like => "LIKE",
            Self::Between => "BETWEEN",
        }
    }
}

impl std::fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Boolean combinators joining two subexpressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "AND" => Some(Self::And),
            "OR" => Some(Self::Or),
            _ => None,
        }
    }

    /// SQL text for this combinator
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

impl std::fmt::Display for Combinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

fn field_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*|\[[0-9]+\])*$")
            .expect("field pattern is a valid regex")
    })
}

/// A validated path into the record payload, e.g. `amount` or `payer.accounts[0].id`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataField(String);

impl DataField {
    /// Validate a field path. Returns `None` if it contains anything besides
    /// identifiers, dots and array indexes.
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.strip_prefix("$.").unwrap_or(path);
        if field_pattern().is_match(path) {
            Some(Self(path.to_string()))
        } else {
            None
        }
    }

    /// The field path as supplied (without a leading `$.`)
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// JSON path understood by SQLite's `json_extract`
    pub fn json_path(&self) -> String {
        format!("$.{}", self.0)
    }
}

impl std::fmt::Display for DataField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A leaf comparison: `field operator value`
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub field: DataField,
    pub operator: ComparisonOperator,
    pub value: Value,
}

impl Comparison {
    /// Check that the value has a shape the operator can bind.
    ///
    /// Returns the reason on failure; the caller adds expression context.
    pub fn check_value(operator: ComparisonOperator, value: &Value) -> Result<(), String> {
        match operator {
            ComparisonOperator::Between => match value {
                Value::Array(bounds) if bounds.len() == 2 && bounds.iter().all(is_scalar) => {
                    Ok(())
                }
                _ => Err("expected a [low, high] pair of scalars".to_string()),
            },
            ComparisonOperator::Like => match value {
                Value::String(_) => Ok(()),
                _ => Err("expected a string pattern".to_string()),
            },
            _ if is_scalar(value) => Ok(()),
            _ => Err("expected a string, number or boolean".to_string()),
        }
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

/// A boolean expression over payload fields
#[derive(Debug, Clone, PartialEq)]
pub enum DataQueryExpression {
    /// Leaf comparison
    Comparison(Comparison),
    /// Two subexpressions joined by `AND` / `OR`
    Combination {
        lhs: Box<DataQueryExpression>,
        combinator: Combinator,
        rhs: Box<DataQueryExpression>,
    },
}

impl DataQueryExpression {
    /// Build a leaf comparison, validating the field path and value shape
    pub fn compare(
        field: &str,
        operator: ComparisonOperator,
        value: impl Into<Value>,
    ) -> QueryResult<Self> {
        let value = value.into();
        let context = || format!("{} {} {}", field, operator, value);

        let field = DataField::parse(field).ok_or_else(|| QueryError::InvalidField {
            field: field.to_string(),
            expression: context(),
        })?;

        Comparison::check_value(operator, &value).map_err(|reason| QueryError::InvalidValue {
            operator: operator.to_string(),
            reason,
            expression: context(),
        })?;

        Ok(Self::Comparison(Comparison {
            field,
            operator,
            value,
        }))
    }

    /// Join two expressions with `AND`
    pub fn and(lhs: Self, rhs: Self) -> Self {
        Self::combine(lhs, Combinator::And, rhs)
    }

    /// Join two expressions with `OR`
    pub fn or(lhs: Self, rhs: Self) -> Self {
        Self::combine(lhs, Combinator::Or, rhs)
    }

    /// Join two expressions with a combinator
    pub fn combine(lhs: Self, combinator: Combinator, rhs: Self) -> Self {
        Self::Combination {
            lhs: Box::new(lhs),
            combinator,
            rhs: Box::new(rhs),
        }
    }

    /// Number of leaf comparisons in the tree
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Comparison(_) => 1,
            Self::Combination { lhs, rhs, .. } => lhs.leaf_count() + rhs.leaf_count(),
        }
    }

    /// Leaf comparisons in left-to-right, depth-first order
    pub fn leaves(&self) -> Vec<&Comparison> {
        let mut out = Vec::with_capacity(self.leaf_count());
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Comparison>) {
        match self {
            Self::Comparison(c) => out.push(c),
            Self::Combination { lhs, rhs, .. } => {
                lhs.collect_leaves(out);
                rhs.collect_leaves(out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operator_parse() {
        assert_eq!(ComparisonOperator::from_str("="), Some(ComparisonOperator::Eq));
        assert_eq!(ComparisonOperator::from_str("like"), Some(ComparisonOperator::Like));
        assert_eq!(
            ComparisonOperator::from_str("BETWEEN"),
            Some(ComparisonOperator::Between)
        );
        assert_eq!(ComparisonOperator::from_str("!="), None);
        assert_eq!(ComparisonOperator::from_str(">="), None);
        assert_eq!(ComparisonOperator::from_str("AND"), None);

        assert_eq!(Combinator::from_str("or"), Some(Combinator::Or));
        assert_eq!(Combinator::from_str("XOR"), None);
        assert_eq!(Combinator::from_str("="), None);
    }

    #[test]
    fn test_field_validation() {
        assert!(DataField::parse("amount").is_some());
        assert!(DataField::parse("payer.partyId").is_some());
        assert!(DataField::parse("fees[0].amount").is_some());
        assert_eq!(DataField::parse("$.amount").unwrap().as_str(), "amount");

        assert!(DataField::parse("").is_none());
        assert!(DataField::parse("amount'); DROP TABLE transactionRecord; --").is_none());
        assert!(DataField::parse("a b").is_none());
        assert!(DataField::parse("1abc").is_none());
    }

    #[test]
    fn test_json_path() {
        let field = DataField::parse("payer.partyId").unwrap();
        assert_eq!(field.json_path(), "$.payer.partyId");
    }

    #[test]
    fn test_compare_rejects_bad_values() {
        let err = DataQueryExpression::compare("amount", ComparisonOperator::Between, json!(5))
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidValue { .. }));

        let err = DataQueryExpression::compare("amount", ComparisonOperator::Like, json!(5))
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidValue { .. }));

        let err =
            DataQueryExpression::compare("amount", ComparisonOperator::Eq, json!({"a": 1}))
                .unwrap_err();
        assert!(matches!(err, QueryError::InvalidValue { .. }));

        let err = DataQueryExpression::compare("bad field", ComparisonOperator::Eq, json!(1))
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidField { .. }));
    }

    #[test]
    fn test_leaves_depth_first() {
        let a = DataQueryExpression::compare("a", ComparisonOperator::Eq, 1).unwrap();
        let b = DataQueryExpression::compare("b", ComparisonOperator::Gt, 2).unwrap();
        let c = DataQueryExpression::compare("c", ComparisonOperator::Lt, 3).unwrap();
        let tree = DataQueryExpression::or(DataQueryExpression::and(a, b), c);

        assert_eq!(tree.leaf_count(), 3);
        let fields: Vec<&str> = tree.leaves().iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["a", "b", "c"]);
    }
}
