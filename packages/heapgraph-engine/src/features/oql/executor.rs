// QueryExecutor - runs parsed queries against the heap graph
//
// Scoped queries bind the identifier per candidate instance, filter
// through the where expression, and feed projected values to a
// cancellable visitor. The executor mutates nothing and caches nothing
// across calls.

use tracing::debug;

use crate::errors::{QueryError, Result};
use crate::features::heap_graph::HeapGraph;
use crate::shared::cancel::CancelToken;
use crate::shared::models::Value;

use super::parser::{parse_query, Query};
use super::ports::{Bindings, ExpressionEvaluator};

/// Receives projected values. Returning `true` stops the whole query.
pub type Visitor<'v> = dyn FnMut(Value) -> bool + 'v;

pub struct QueryExecutor<'h, E> {
    graph: &'h HeapGraph<'h>,
    evaluator: E,
    cancel: CancelToken,
}

impl<'h, E: ExpressionEvaluator> QueryExecutor<'h, E> {
    pub fn new(graph: &'h HeapGraph<'h>, evaluator: E) -> Self {
        Self {
            graph,
            evaluator,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(graph: &'h HeapGraph<'h>, evaluator: E, cancel: CancelToken) -> Self {
        Self {
            graph,
            evaluator,
            cancel,
        }
    }

    /// Execute query text. Text that is not a structured query is
    /// evaluated as a single raw expression and its result dispatched.
    pub fn execute(&self, text: &str, visitor: &mut Visitor<'_>) -> Result<()> {
        match parse_query(text)? {
            Some(query) => self.execute_parsed(&query, visitor),
            None => {
                let value = self.evaluator.evaluate(text, &Bindings::new())?;
                dispatch_value(value, visitor);
                Ok(())
            }
        }
    }

    /// Execute an already parsed query.
    pub fn execute_parsed(&self, query: &Query, visitor: &mut Visitor<'_>) -> Result<()> {
        let Some(class_name) = &query.class_name else {
            // unscoped: one evaluation, no bound identifier
            let value = self.evaluator.evaluate(&query.select_expr, &Bindings::new())?;
            dispatch_value(value, visitor);
            return Ok(());
        };

        let class = self
            .graph
            .find_class(class_name)
            .ok_or_else(|| QueryError::UnknownClass(class_name.clone()))?;
        let identifier = query
            .identifier
            .as_deref()
            .ok_or(QueryError::NoIdentifier)?;

        let mut env = Bindings::new();
        let mut candidates: u64 = 0;
        for instance in self.graph.instances_of(&class, query.is_instanceof) {
            if self.cancel.is_cancelled() {
                debug!(candidates, "query cancelled, stopping candidate scan");
                break;
            }
            candidates += 1;
            env.bind(identifier, Value::Instance(instance));
            if let Some(where_expr) = &query.where_expr {
                let keep = self.evaluator.evaluate(where_expr, &env)?;
                if !keep.is_truthy() {
                    continue;
                }
            }
            let value = self.evaluator.evaluate(&query.select_expr, &env)?;
            if dispatch_value(value, visitor) {
                break;
            }
        }
        Ok(())
    }
}

/// Feed a projected value to the visitor: null vanishes, a sequence is
/// flattened recursively with short-circuiting, anything else is passed
/// through. Returns `true` when the visitor asked to stop.
fn dispatch_value(value: Value, visitor: &mut Visitor<'_>) -> bool {
    match value {
        Value::Null => false,
        Value::List(items) => {
            for item in items {
                if dispatch_value(item, visitor) {
                    return true;
                }
            }
            false
        }
        scalar => visitor(scalar),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EvalError;
    use crate::features::heap_graph::infrastructure::HeapBuilder;
    use pretty_assertions::assert_eq;

    /// Canned evaluator: answers fixed values, no heap needed.
    struct FixedEvaluator(Value);

    impl ExpressionEvaluator for FixedEvaluator {
        fn evaluate(&self, _expr: &str, _env: &Bindings) -> std::result::Result<Value, EvalError> {
            Ok(self.0.clone())
        }
    }

    fn collect(value: Value) -> (Vec<Value>, bool) {
        let mut seen = Vec::new();
        let stopped = dispatch_value(value, &mut |v| {
            seen.push(v);
            false
        });
        (seen, stopped)
    }

    #[test]
    fn dispatch_flattens_nested_sequences_in_order() {
        let nested = Value::List(vec![
            Value::List(vec![Value::Int(1), Value::Int(2)]),
            Value::List(vec![Value::Int(3)]),
        ]);
        let (seen, stopped) = collect(nested);
        assert_eq!(seen, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert!(!stopped);
    }

    #[test]
    fn dispatch_skips_nulls_and_honors_stop() {
        let nested = Value::List(vec![
            Value::Null,
            Value::Int(1),
            Value::List(vec![Value::Int(2), Value::Int(3)]),
        ]);
        let mut seen = Vec::new();
        let stopped = dispatch_value(nested, &mut |v| {
            let stop = v == Value::Int(2);
            seen.push(v);
            stop
        });
        assert!(stopped);
        assert_eq!(seen, vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn null_alone_dispatches_nothing() {
        let (seen, stopped) = collect(Value::Null);
        assert!(seen.is_empty());
        assert!(!stopped);
    }

    #[test]
    fn unscoped_select_and_raw_fallback_both_reach_the_evaluator() {
        let snapshot = HeapBuilder::new().build();
        let graph = HeapGraph::new(&snapshot);
        let executor = QueryExecutor::new(&graph, FixedEvaluator(Value::Int(7)));

        let mut seen = Vec::new();
        executor
            .execute("select anything", &mut |v| {
                seen.push(v);
                false
            })
            .unwrap();
        executor
            .execute("anything at all", &mut |v| {
                seen.push(v);
                false
            })
            .unwrap();
        assert_eq!(seen, vec![Value::Int(7), Value::Int(7)]);
    }
}
