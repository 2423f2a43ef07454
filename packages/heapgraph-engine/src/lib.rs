/*
 * heapgraph-engine - Heap Snapshot Query & Graph-Analysis Engine
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Common models (Instance, ClassDescriptor, Value)
 * - features/    : Vertical slices (traversal → heap_graph → root_paths / oql)
 * - api/         : Engine entry point for host UI/CLI layers
 *
 * The engine executes select/from/where queries over a previously
 * captured heap snapshot and runs graph analyses on the instance graph:
 * lazy reachability enumeration, weak-reference-aware referrer/referee
 * traversal, and shortest-chain search from the GC root set with dead-end
 * memoization. Capturing snapshots and rendering results belong to the
 * host application.
 */

pub mod api;
pub mod errors;
pub mod features;
pub mod shared;

// Re-exports for the public API
pub use api::HeapQueryEngine;
pub use errors::{EmptyIteration, EvalError, QueryError};
pub use features::heap_graph::{HeapBuilder, HeapGraph, InMemorySnapshot, SnapshotReader};
pub use features::oql::{
    parse_query, Bindings, ExpressionEvaluator, HeapExprEvaluator, Query, QueryExecutor, Visitor,
};
pub use features::root_paths::{PathResult, RootPathFinder, RootPathIter};
pub use features::traversal::{
    ExclusionPolicy, FieldExclusions, GraphExpander, GraphIterator, NoExclusions,
    ReachabilitySet, TOTAL_SIZE_UNSUPPORTED,
};
pub use shared::cancel::CancelToken;
pub use shared::models::{
    ClassDescriptor, ClassId, FieldData, FieldDescriptor, FieldValue, GraphNode, Instance,
    InstanceId, NodeKey, PrimitiveValue, Value,
};
