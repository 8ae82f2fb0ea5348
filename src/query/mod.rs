//! Record search compilation
//!
//! Turns typed search criteria into a parameterized SQL filter:
//!
//! - **AST**: Data query expression tree over the JSON payload
//! - **Compiler**: Lower an expression tree to a filter fragment
//! - **Builder**: Combine the record query fields with the compiled expression
//! - **Filter**: The compiled `(filter, values)` pair
//!
//! Caller-supplied values never appear in filter text; they travel as
//! named bind values.
//!
//! # Example
//!
//! ```rust,ignore
//! use payments_sor::query::{build_filter, ComparisonOperator, DataQueryExpression};
//! use payments_sor::storage::TransactionRecordQuery;
//!
//! let expr = DataQueryExpression::and(
//!     DataQueryExpression::compare("amount", ComparisonOperator::Gt, 10)?,
//!     DataQueryExpression::compare("currency", ComparisonOperator::Eq, "EUR")?,
//! );
//! let compiled = build_filter(&TransactionRecordQuery::all().event_types(["CREATED"]).data_query(expr));
//!
//! // eventType IN (:et0) AND (json_extract(data, '$.amount') > :dq0 AND ...)
//! println!("{}", compiled.filter);
//! ```

mod ast;
mod builder;
mod compiler;
mod error;
mod filter;

pub use ast::{Combinator, Comparison, ComparisonOperator, DataField, DataQueryExpression};
pub use builder::build_filter;
pub use compiler::compile;
pub use error::{QueryError, QueryResult};
pub use filter::{BindValue, CompiledFilter};
