//! OQL Ports - the expression-evaluation capability
//!
//! The query language's predicates and projections are textual
//! expressions in an embeddable language this engine does not define. The
//! executor only needs variable binding and values it can classify as
//! null, sequence, or scalar.
//!
//! Implementors:
//! - `infrastructure::HeapExprEvaluator` (the built-in expression
//!   language)
//! - any embeddable evaluator the host application plugs in

use rustc_hash::FxHashMap;

use crate::errors::EvalError;
use crate::shared::models::Value;

/// Identifier-to-value environment for one evaluation.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: FxHashMap<String, Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, replacing any previous binding.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

/// The pluggable evaluation capability.
pub trait ExpressionEvaluator {
    /// Evaluate `expr` under `env`, or fail with a human-readable message.
    fn evaluate(&self, expr: &str, env: &Bindings) -> Result<Value, EvalError>;
}
