// HeapQueryEngine - the caller-facing entry point
//
// One engine per snapshot. Long-running operations observe the engine's
// cancellation token; a cancelled call returns cleanly with whatever it
// produced. The snapshot is read-only, so one logical analysis runs at a
// time from the caller's perspective while lookups stay safe to share.

use crate::errors::Result;
use crate::features::heap_graph::{HeapGraph, SnapshotReader};
use crate::features::oql::{
    parse_query, HeapExprEvaluator, Query, QueryExecutor, Visitor,
};
use crate::features::root_paths::{RootPathFinder, RootPathIter};
use crate::features::traversal::{ExclusionPolicy, ReachabilitySet};
use crate::shared::cancel::CancelToken;
use crate::shared::models::Instance;

pub struct HeapQueryEngine<'h> {
    graph: HeapGraph<'h>,
    cancel: CancelToken,
}

impl<'h> HeapQueryEngine<'h> {
    pub fn new(reader: &'h dyn SnapshotReader) -> Self {
        Self {
            graph: HeapGraph::new(reader),
            cancel: CancelToken::new(),
        }
    }

    /// The heap graph facade, for direct lookups.
    pub fn graph(&self) -> &HeapGraph<'h> {
        &self.graph
    }

    /// A handle other threads use to stop long-running calls. The token
    /// stays set until [`CancelToken::reset`].
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Parse query text; `Ok(None)` means raw-expression fallback.
    pub fn parse_query(&self, text: &str) -> Result<Option<Query>> {
        parse_query(text)
    }

    /// Parse and execute query text with the built-in evaluator,
    /// auto-detecting the raw-expression fallback.
    pub fn execute_query(&self, text: &str, visitor: &mut Visitor<'_>) -> Result<()> {
        let evaluator = HeapExprEvaluator::new(&self.graph);
        QueryExecutor::with_cancel(&self.graph, evaluator, self.cancel.clone())
            .execute(text, visitor)
    }

    /// Execute with a host-supplied expression evaluator instead of the
    /// built-in one.
    pub fn execute_query_with<E>(
        &self,
        evaluator: E,
        text: &str,
        visitor: &mut Visitor<'_>,
    ) -> Result<()>
    where
        E: crate::features::oql::ExpressionEvaluator,
    {
        QueryExecutor::with_cancel(&self.graph, evaluator, self.cancel.clone())
            .execute(text, visitor)
    }

    /// Lazy enumeration of everything reachable from `root` under
    /// `policy`, the root included.
    pub fn reachable_from<P>(&self, root: Instance, policy: P) -> impl Iterator<Item = Instance> + '_
    where
        P: ExclusionPolicy + 'h,
    {
        ReachabilitySet::new(&self.graph).reachable(root, policy)
    }

    /// One reference chain per exploitable GC root path to `target`.
    pub fn rootset_references_to(
        &self,
        target: &Instance,
        include_weak: bool,
    ) -> RootPathIter<'_> {
        RootPathFinder::with_cancel(&self.graph, self.cancel.clone())
            .rootset_references_to(target, include_weak)
    }

    /// Instances waiting on the finalizer queue.
    pub fn finalizer_pending(&self) -> Vec<Instance> {
        self.graph.finalizer_pending_instances()
    }
}
