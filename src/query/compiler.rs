//! Data Query Expression Compiler
//!
//! Lowers a `DataQueryExpression` tree into a `CompiledFilter`.
//!
//! # Rendering
//!
//! ```text
//! leaf:     json_extract(data, '$.<field>') <op> :dqN
//! BETWEEN:  json_extract(data, '$.<field>') BETWEEN json_extract(:dqN, '$[0]')
//!                                               AND json_extract(:dqN, '$[1]')
//! node:     <lhs> AND|OR <rhs>      (a side that is itself a node is parenthesized)
//! ```
//!
//! Every leaf binds exactly one value, in left-to-right depth-first order.
//! A `BETWEEN` pair is bound once as JSON text and unpacked by SQLite.
//! Placeholder names come from a counter scoped to one compilation, so a
//! field that appears twice in the tree still gets two distinct binds.

use crate::query::ast::{Comparison, ComparisonOperator, DataQueryExpression};
use crate::query::filter::{BindValue, CompiledFilter};
use crate::storage::schema::RecordColumn;

/// Prefix for data-expression placeholders; distinct from the record
/// query builder's own names
const PLACEHOLDER_PREFIX: &str = "dq";

/// Compile an optional expression. `None` yields an empty filter.
pub fn compile(expression: Option<&DataQueryExpression>) -> CompiledFilter {
    match expression {
        Some(expression) => ExpressionCompiler::default().run(expression),
        None => CompiledFilter::default(),
    }
}

/// Single-use compilation state
#[derive(Default)]
struct ExpressionCompiler {
    next_placeholder: usize,
    values: Vec<(String, BindValue)>,
}

impl ExpressionCompiler {
    fn run(mut self, expression: &DataQueryExpression) -> CompiledFilter {
        let filter = self.render(expression);
        CompiledFilter {
            filter,
            values: self.values,
        }
    }

    fn render(&mut self, expression: &DataQueryExpression) -> String {
        match expression {
            DataQueryExpression::Comparison(comparison) => self.render_comparison(comparison),
            DataQueryExpression::Combination {
                lhs,
                combinator,
                rhs,
            } => {
                let lhs = self.render_side(lhs);
                let rhs = self.render_side(rhs);
                format!("{} {} {}", lhs, combinator.as_sql(), rhs)
            }
        }
    }

    fn render_side(&mut self, side: &DataQueryExpression) -> String {
        match side {
            DataQueryExpression::Comparison(comparison) => self.render_comparison(comparison),
            DataQueryExpression::Combination { .. } => format!("({})", self.render(side)),
        }
    }

    fn render_comparison(&mut self, comparison: &Comparison) -> String {
        let column = format!(
            "json_extract({}, '{}')",
            RecordColumn::Data.name(),
            comparison.field.json_path()
        );
        let name = self.bind(BindValue::from_json(&comparison.value));

        match comparison.operator {
            ComparisonOperator::Between => format!(
                "{} BETWEEN json_extract(:{name}, '$[0]') AND json_extract(:{name}, '$[1]')",
                column
            ),
            operator => format!("{} {} :{}", column, operator.as_sql(), name),
        }
    }

    fn bind(&mut self, value: BindValue) -> String {
        let name = format!("{}{}", PLACEHOLDER_PREFIX, self.next_placeholder);
        self.next_placeholder += 1;
        self.values.push((name.clone(), value));
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::ComparisonOperator::*;
    use serde_json::json;

    fn leaf(field: &str, op: ComparisonOperator, value: serde_json::Value) -> DataQueryExpression {
        DataQueryExpression::compare(field, op, value).unwrap()
    }

    #[test]
    fn test_absent_expression_is_empty() {
        let compiled = compile(None);
        assert!(compiled.is_empty());
        assert!(compiled.values.is_empty());
    }

    #[test]
    fn test_single_leaf() {
        let compiled = compile(Some(&leaf("amount", Gt, json!(10))));

        assert_eq!(compiled.filter, "json_extract(data, '$.amount') > :dq0");
        assert_eq!(
            compiled.values,
            vec![("dq0".to_string(), BindValue::Integer(10))]
        );
    }

    #[test]
    fn test_combination_of_leaves() {
        let expr = DataQueryExpression::and(
            leaf("amount", Gt, json!(10)),
            leaf("currency", Eq, json!("EUR")),
        );
        let compiled = compile(Some(&expr));

        assert_eq!(
            compiled.filter,
            "json_extract(data, '$.amount') > :dq0 AND json_extract(data, '$.currency') = :dq1"
        );
        assert_eq!(compiled.value_names(), vec!["dq0", "dq1"]);
    }

    #[test]
    fn test_nested_nodes_are_parenthesized() {
        let expr = DataQueryExpression::or(
            DataQueryExpression::and(leaf("a", Eq, json!(1)), leaf("b", Eq, json!(2))),
            DataQueryExpression::and(leaf("c", Eq, json!(3)), leaf("d", Lt, json!(4))),
        );
        let compiled = compile(Some(&expr));

        assert_eq!(
            compiled.filter,
            "(json_extract(data, '$.a') = :dq0 AND json_extract(data, '$.b') = :dq1) OR \
             (json_extract(data, '$.c') = :dq2 AND json_extract(data, '$.d') < :dq3)"
        );
    }

    #[test]
    fn test_value_count_and_order_match_leaves() {
        // ((a AND (b OR c)) OR d)
        let expr = DataQueryExpression::or(
            DataQueryExpression::and(
                leaf("a", Eq, json!("first")),
                DataQueryExpression::or(leaf("b", Gt, json!(2)), leaf("c", Like, json!("%3%"))),
            ),
            leaf("d", Eq, json!(true)),
        );
        let compiled = compile(Some(&expr));

        assert_eq!(compiled.values.len(), expr.leaf_count());
        let expected: Vec<BindValue> = expr
            .leaves()
            .iter()
            .map(|c| BindValue::from_json(&c.value))
            .collect();
        let actual: Vec<BindValue> = compiled.values.iter().map(|(_, v)| v.clone()).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_repeated_field_gets_distinct_placeholders() {
        let expr = DataQueryExpression::and(
            leaf("amount", Gt, json!(10)),
            leaf("amount", Lt, json!(100)),
        );
        let compiled = compile(Some(&expr));

        assert_eq!(compiled.value_names(), vec!["dq0", "dq1"]);
    }

    #[test]
    fn test_between_binds_one_value() {
        let compiled = compile(Some(&leaf("amount", Between, json!([5, 15]))));

        assert_eq!(
            compiled.filter,
            "json_extract(data, '$.amount') BETWEEN json_extract(:dq0, '$[0]') \
             AND json_extract(:dq0, '$[1]')"
        );
        assert_eq!(
            compiled.values,
            vec![("dq0".to_string(), BindValue::Text("[5,15]".to_string()))]
        );
    }

    #[test]
    fn test_compilation_is_repeatable() {
        let expr = DataQueryExpression::or(
            leaf("status", Like, json!("SETTLE%")),
            leaf("payer.partyId", Eq, json!("p-1")),
        );

        assert_eq!(compile(Some(&expr)), compile(Some(&expr)));
    }

    #[test]
    fn test_caller_values_never_reach_filter_text() {
        let hostile = "x' OR 1=1; --";
        let compiled = compile(Some(&leaf("note", Eq, json!(hostile))));

        assert!(!compiled.filter.contains(hostile));
        assert_eq!(compiled.value("dq0"), Some(&BindValue::Text(hostile.to_string())));
    }
}
