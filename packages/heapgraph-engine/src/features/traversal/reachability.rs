// ReachabilitySet - transitive closure from a root, with field exclusions
//
// Candidate edges per node are its instance-valued fields plus, for an
// object array, its element values. Only ordinary fields are subject to
// the exclusion policy; array-element edges are never excluded by name.

use rustc_hash::FxHashSet;

use crate::features::heap_graph::{HeapGraph, SnapshotReader};
use crate::shared::models::Instance;

use super::graph_iterator::{GraphExpander, GraphIterator};

/// Sentinel: total-size reporting needs a second full pass the caller may
/// not want; callers fold over the sequence themselves.
pub const TOTAL_SIZE_UNSUPPORTED: i64 = -1;

/// Decides whether an edge named `Declaring.Class.fieldName` is
/// traversable.
pub trait ExclusionPolicy {
    fn excludes(&self, qualified_field: &str) -> bool;
}

/// Every edge is traversable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExclusions;

impl ExclusionPolicy for NoExclusions {
    fn excludes(&self, _qualified_field: &str) -> bool {
        false
    }
}

/// Excludes a fixed set of fully-qualified field names.
#[derive(Debug, Clone, Default)]
pub struct FieldExclusions {
    names: FxHashSet<String>,
}

impl FieldExclusions {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl ExclusionPolicy for FieldExclusions {
    fn excludes(&self, qualified_field: &str) -> bool {
        self.names.contains(qualified_field)
    }
}

/// Reachable-instance enumeration over a heap graph.
pub struct ReachabilitySet<'h> {
    graph: &'h HeapGraph<'h>,
}

impl<'h> ReachabilitySet<'h> {
    pub fn new(graph: &'h HeapGraph<'h>) -> Self {
        Self { graph }
    }

    /// All instances reachable from `root` under `policy`, the root itself
    /// included. Lazy and finite; each call produces a fresh traversal.
    pub fn reachable<P>(
        &self,
        root: Instance,
        policy: P,
    ) -> GraphIterator<'h, ReachableExpander<'h, P>>
    where
        P: ExclusionPolicy + 'h,
    {
        GraphIterator::new(
            ReachableExpander {
                reader: self.graph.reader(),
                policy,
            },
            root,
        )
    }

    /// Unsupported by design; see [`TOTAL_SIZE_UNSUPPORTED`].
    pub fn total_size(&self) -> i64 {
        TOTAL_SIZE_UNSUPPORTED
    }
}

/// Expands an instance into the instances its fields and elements point
/// at, honoring the exclusion policy for named fields.
pub struct ReachableExpander<'h, P> {
    reader: &'h dyn SnapshotReader,
    policy: P,
}

impl<'h, P> ReachableExpander<'h, P>
where
    P: ExclusionPolicy,
{
    fn neighbors(&self, node: &Instance) -> Vec<Instance> {
        let mut out = Vec::new();
        for fv in self.reader.field_values(node.id) {
            if self.policy.excludes(&fv.field.qualified_name()) {
                continue;
            }
            if let Some(target) = fv.referenced() {
                if let Some(instance) = self.reader.instance_by_id(target) {
                    out.push(instance);
                }
            }
        }
        if node.is_array {
            for element in self.reader.array_elements(node.id).into_iter().flatten() {
                if let Some(instance) = self.reader.instance_by_id(element) {
                    out.push(instance);
                }
            }
        }
        out
    }
}

impl<'h, P> GraphExpander<'h> for ReachableExpander<'h, P>
where
    P: ExclusionPolicy + 'h,
{
    type Node = Instance;
    type Item = Instance;

    fn same_level(&self, node: &Instance) -> Box<dyn Iterator<Item = Instance> + 'h> {
        Box::new(std::iter::once(*node))
    }

    fn traversing(&self, node: &Instance) -> Box<dyn Iterator<Item = Instance> + 'h> {
        Box::new(self.neighbors(node).into_iter())
    }
}
