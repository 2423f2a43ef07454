//! OQL Feature - the select/from/where query language
//!
//! A query string enters the parser, the executor walks candidate
//! instances through the heap graph, and projected values flow to a
//! cancellable visitor. Predicates and projections are evaluated through
//! the pluggable expression capability in `ports`; `infrastructure`
//! carries the built-in evaluator.

pub mod executor;
pub mod infrastructure;
pub mod parser;
pub mod ports;

pub use executor::{QueryExecutor, Visitor};
pub use infrastructure::HeapExprEvaluator;
pub use parser::{parse_query, Query};
pub use ports::{Bindings, ExpressionEvaluator};
