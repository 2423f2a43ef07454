// RootPathFinder - backtracking DFS from the root set to a target
//
// Explicit stack of search frames (no recursion, bounded memory on deep
// chains). Each frame holds the partial chain as a parent-linked
// persistent list, the remaining candidate iterator at that depth, and a
// hit counter. When a frame exhausts with zero hits below it, its node
// enters a per-call "ignored" set and is never explored again anywhere in
// the search; shared dead-end subgraphs are visited once instead of
// exponentially.

use std::rc::Rc;

use rustc_hash::FxHashSet;
use serde::Serialize;
use tracing::debug;

use crate::features::heap_graph::HeapGraph;
use crate::shared::cancel::CancelToken;
use crate::shared::models::{GraphNode, Instance, InstanceId, NodeKey};

/// One reference chain from a GC root to the target, both ends included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathResult {
    /// The root that produced this chain; always `chain[0]`.
    pub root: GraphNode,
    pub chain: Vec<GraphNode>,
}

/// Parent-linked chain node: O(1) extension, one reconstruction per
/// recorded result.
struct ChainLink {
    node: GraphNode,
    parent: Option<Rc<ChainLink>>,
}

impl ChainLink {
    fn contains(&self, key: NodeKey) -> bool {
        let mut current = Some(self);
        while let Some(link) = current {
            if link.node.key() == key {
                return true;
            }
            current = link.parent.as_deref();
        }
        false
    }

    fn reconstruct(&self) -> Vec<GraphNode> {
        let mut chain = Vec::new();
        let mut current = Some(self);
        while let Some(link) = current {
            chain.push(link.node.clone());
            current = link.parent.as_deref();
        }
        chain.reverse();
        chain
    }
}

struct Frame {
    link: Rc<ChainLink>,
    candidates: std::vec::IntoIter<GraphNode>,
    hits: u64,
}

/// Search entry point; per-call state lives in the iterator it returns.
pub struct RootPathFinder<'h> {
    graph: &'h HeapGraph<'h>,
    cancel: CancelToken,
}

impl<'h> RootPathFinder<'h> {
    pub fn new(graph: &'h HeapGraph<'h>) -> Self {
        Self {
            graph,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(graph: &'h HeapGraph<'h>, cancel: CancelToken) -> Self {
        Self { graph, cancel }
    }

    /// One reference chain per distinct exploitable root path to `target`.
    ///
    /// Lazy: results surface as the search reaches them. Weak edges are
    /// invisible to the whole search unless `include_weak`; filtering
    /// happens inside referee enumeration, so hit counting never credits
    /// paths that are supposed to be invisible. Cancellation ends the
    /// sequence after whatever was already produced.
    pub fn rootset_references_to(
        &self,
        target: &Instance,
        include_weak: bool,
    ) -> RootPathIter<'h> {
        RootPathIter {
            graph: self.graph,
            cancel: self.cancel.clone(),
            target: target.id,
            include_weak,
            roots: self.graph.roots().into_iter(),
            stack: Vec::new(),
            ignored: FxHashSet::default(),
            pulled: 0,
        }
    }
}

/// Lazy sequence of [`PathResult`]s.
pub struct RootPathIter<'h> {
    graph: &'h HeapGraph<'h>,
    cancel: CancelToken,
    target: InstanceId,
    include_weak: bool,
    roots: std::vec::IntoIter<GraphNode>,
    stack: Vec<Frame>,
    /// Nodes whose whole subtree failed to reach the target.
    ignored: FxHashSet<NodeKey>,
    pulled: u64,
}

impl RootPathIter<'_> {
    /// Pop the exhausted top frame, crediting its hits to the parent. A
    /// frame that never saw a hit anywhere below it marks its node as a
    /// dead end for the remainder of the search.
    fn pop_frame(&mut self) {
        let Some(popped) = self.stack.pop() else {
            return;
        };
        if popped.hits == 0 {
            self.ignored.insert(popped.link.node.key());
        } else if let Some(parent) = self.stack.last_mut() {
            parent.hits += popped.hits;
        }
    }

    fn finish(&mut self) -> Option<PathResult> {
        debug!(
            candidates = self.pulled,
            dead_ends = self.ignored.len(),
            "root-path search drained"
        );
        None
    }
}

impl Iterator for RootPathIter<'_> {
    type Item = PathResult;

    fn next(&mut self) -> Option<PathResult> {
        loop {
            // checked once per candidate pulled; a cancelled search keeps
            // everything already produced
            if self.cancel.is_cancelled() {
                debug!(candidates = self.pulled, "root-path search cancelled");
                return None;
            }
            let candidate = match self.stack.last_mut() {
                Some(frame) => match frame.candidates.next() {
                    Some(candidate) => candidate,
                    None => {
                        self.pop_frame();
                        continue;
                    }
                },
                None => match self.roots.next() {
                    Some(root) => root,
                    None => return self.finish(),
                },
            };
            self.pulled += 1;

            let key = candidate.key();
            if self.ignored.contains(&key) {
                continue;
            }
            // same-path cycle check; cross-path dedup is the ignored set
            if let Some(frame) = self.stack.last() {
                if frame.link.contains(key) {
                    continue;
                }
            }

            if key == NodeKey::Instance(self.target) {
                // record the hit on the current frontier and keep
                // searching its siblings; do not descend into the target
                let link = ChainLink {
                    node: candidate,
                    parent: self.stack.last().map(|f| Rc::clone(&f.link)),
                };
                let chain = link.reconstruct();
                if let Some(frame) = self.stack.last_mut() {
                    frame.hits += 1;
                }
                return Some(PathResult {
                    root: chain[0].clone(),
                    chain,
                });
            }

            let candidates = self.graph.referees(&candidate, self.include_weak).into_iter();
            let link = Rc::new(ChainLink {
                node: candidate,
                parent: self.stack.last().map(|f| Rc::clone(&f.link)),
            });
            self.stack.push(Frame {
                link,
                candidates,
                hits: 0,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::heap_graph::infrastructure::HeapBuilder;
    use pretty_assertions::assert_eq;

    fn chain_ids(result: &PathResult) -> Vec<InstanceId> {
        result
            .chain
            .iter()
            .filter_map(|n| n.as_instance().map(|i| i.id))
            .collect()
    }

    #[test]
    fn finds_the_single_chain_and_prunes_the_dead_end() {
        let mut heap = HeapBuilder::new();
        let object = heap.class("java.lang.Object");
        let root = heap.instance(object);
        let dead = heap.instance(object);
        let dead_child = heap.instance(object);
        let via = heap.instance(object);
        let target = heap.instance(object);
        heap.gc_root(root);
        heap.field(root, "d", Some(dead));
        heap.field(root, "p", Some(via));
        heap.field(dead, "child", Some(dead_child));
        heap.field(via, "t", Some(target));
        let snapshot = heap.build();
        let graph = HeapGraph::new(&snapshot);

        let target_instance = graph.find_instance(target).unwrap();
        let finder = RootPathFinder::new(&graph);
        let results: Vec<PathResult> = finder
            .rootset_references_to(&target_instance, true)
            .collect();

        assert_eq!(results.len(), 1);
        assert_eq!(chain_ids(&results[0]), vec![root, via, target]);
        assert_eq!(
            results[0].root.as_instance().map(|i| i.id),
            Some(root)
        );
        // the dead branch was expanded exactly once
        assert_eq!(snapshot.expansion_count(dead), 1);
        assert_eq!(snapshot.expansion_count(dead_child), 1);
    }

    #[test]
    fn shared_dead_subtree_is_expanded_once_across_roots() {
        let mut heap = HeapBuilder::new();
        let object = heap.class("java.lang.Object");
        let root_a = heap.instance(object);
        let root_b = heap.instance(object);
        let dead = heap.instance(object);
        let via = heap.instance(object);
        let target = heap.instance(object);
        heap.gc_root(root_a);
        heap.gc_root(root_b);
        heap.field(root_a, "d", Some(dead));
        heap.field(root_b, "d", Some(dead));
        heap.field(root_b, "p", Some(via));
        heap.field(via, "t", Some(target));
        let snapshot = heap.build();
        let graph = HeapGraph::new(&snapshot);

        let target_instance = graph.find_instance(target).unwrap();
        let finder = RootPathFinder::new(&graph);
        let results: Vec<PathResult> = finder
            .rootset_references_to(&target_instance, true)
            .collect();

        assert_eq!(results.len(), 1);
        assert_eq!(chain_ids(&results[0]), vec![root_b, via, target]);
        assert_eq!(snapshot.expansion_count(dead), 1);
    }

    #[test]
    fn a_target_that_is_itself_a_root_yields_a_one_element_chain() {
        let mut heap = HeapBuilder::new();
        let object = heap.class("java.lang.Object");
        let target = heap.instance(object);
        heap.gc_root(target);
        let snapshot = heap.build();
        let graph = HeapGraph::new(&snapshot);

        let target_instance = graph.find_instance(target).unwrap();
        let finder = RootPathFinder::new(&graph);
        let results: Vec<PathResult> = finder
            .rootset_references_to(&target_instance, true)
            .collect();

        assert_eq!(results.len(), 1);
        assert_eq!(chain_ids(&results[0]), vec![target]);
    }

    #[test]
    fn unreachable_target_yields_nothing_and_terminates() {
        let mut heap = HeapBuilder::new();
        let object = heap.class("java.lang.Object");
        let root = heap.instance(object);
        let other = heap.instance(object);
        let target = heap.instance(object);
        heap.gc_root(root);
        heap.field(root, "o", Some(other));
        // cycle below the root must not hang the search
        heap.field(other, "back", Some(root));
        let snapshot = heap.build();
        let graph = HeapGraph::new(&snapshot);

        let target_instance = graph.find_instance(target).unwrap();
        let finder = RootPathFinder::new(&graph);
        let results: Vec<PathResult> = finder
            .rootset_references_to(&target_instance, true)
            .collect();
        assert!(results.is_empty());
    }

    #[test]
    fn weak_only_chains_are_invisible_unless_requested() {
        let mut heap = HeapBuilder::new();
        let reference = heap.class("java.lang.ref.Reference");
        let weak = heap.class_extending("java.lang.ref.WeakReference", reference);
        let object = heap.class("java.lang.Object");
        let root = heap.instance(object);
        let wrapper = heap.instance(weak);
        let target = heap.instance(object);
        heap.gc_root(root);
        heap.field(root, "w", Some(wrapper));
        heap.field_declared(wrapper, reference, "referent", Some(target));
        let snapshot = heap.build();
        let graph = HeapGraph::new(&snapshot);

        let target_instance = graph.find_instance(target).unwrap();
        let finder = RootPathFinder::new(&graph);
        let hidden: Vec<PathResult> = finder
            .rootset_references_to(&target_instance, false)
            .collect();
        assert!(hidden.is_empty());

        let visible: Vec<PathResult> = finder
            .rootset_references_to(&target_instance, true)
            .collect();
        assert_eq!(visible.len(), 1);
        assert_eq!(chain_ids(&visible[0]), vec![root, wrapper, target]);
    }

    #[test]
    fn cancellation_keeps_partial_results() {
        let mut heap = HeapBuilder::new();
        let object = heap.class("java.lang.Object");
        let root_a = heap.instance(object);
        let root_b = heap.instance(object);
        let target = heap.instance(object);
        heap.gc_root(root_a);
        heap.gc_root(root_b);
        heap.field(root_a, "t", Some(target));
        heap.field(root_b, "t", Some(target));
        let snapshot = heap.build();
        let graph = HeapGraph::new(&snapshot);

        let target_instance = graph.find_instance(target).unwrap();
        let cancel = CancelToken::new();
        let finder = RootPathFinder::with_cancel(&graph, cancel.clone());
        let mut results = Vec::new();
        for result in finder.rootset_references_to(&target_instance, true) {
            results.push(result);
            cancel.cancel();
        }
        // both roots reach the target, but only the pre-cancellation
        // result survives
        assert_eq!(results.len(), 1);
    }
}
