// GraphIterator - lazy DFS over a typed node graph with revisit suppression
//
// Separates "what is yielded" (same_level payload) from "what is traversed"
// (child nodes), so a caller can enumerate items for a node while walking a
// different node type. Used with Node = Item for plain reachability, and
// with Node != Item when yielding a class's instances while walking its
// subclass tree.

use std::hash::Hash;

use rustc_hash::FxHashSet;

use crate::errors::EmptyIteration;

/// Expansion seam for [`GraphIterator`].
///
/// Returned sequences may borrow snapshot data for `'h` but never the
/// expander itself; the iterator interleaves expansion with its own
/// bookkeeping.
pub trait GraphExpander<'h> {
    type Node: Clone + Eq + Hash;
    type Item;

    /// Payload emitted when `node` is expanded.
    fn same_level(&self, node: &Self::Node) -> Box<dyn Iterator<Item = Self::Item> + 'h>;

    /// Child nodes the walk continues through.
    fn traversing(&self, node: &Self::Node) -> Box<dyn Iterator<Item = Self::Node> + 'h>;
}

/// Restartable-per-call lazy traversal: construct a fresh one per walk.
///
/// Maintains a LIFO work stack of frontier nodes, a visited set seeded with
/// the root, and the same-level sequence currently being drained. A node
/// already inspected in this traversal is never re-emitted or re-scheduled;
/// the visited set is per-traversal state, never snapshot state.
pub struct GraphIterator<'h, E: GraphExpander<'h>> {
    expander: E,
    stack: Vec<E::Node>,
    visited: FxHashSet<E::Node>,
    current: Option<Box<dyn Iterator<Item = E::Item> + 'h>>,
    lookahead: Option<E::Item>,
}

impl<'h, E: GraphExpander<'h>> GraphIterator<'h, E> {
    pub fn new(expander: E, root: E::Node) -> Self {
        let mut visited = FxHashSet::default();
        visited.insert(root.clone());
        Self {
            expander,
            stack: vec![root],
            visited,
            current: None,
            lookahead: None,
        }
    }

    /// Whether another item can be produced.
    pub fn has_next(&mut self) -> bool {
        self.fill_lookahead();
        self.lookahead.is_some()
    }

    /// Next item, or [`EmptyIteration`] when called past exhaustion.
    ///
    /// Exhaustion is a programming error under this entry point; callers
    /// must check [`has_next`](Self::has_next) first. The `Iterator` impl
    /// maps exhaustion to `None` instead.
    pub fn try_next(&mut self) -> Result<E::Item, EmptyIteration> {
        self.fill_lookahead();
        self.lookahead.take().ok_or(EmptyIteration)
    }

    fn fill_lookahead(&mut self) {
        while self.lookahead.is_none() {
            if let Some(current) = self.current.as_mut() {
                if let Some(item) = current.next() {
                    self.lookahead = Some(item);
                    return;
                }
                self.current = None;
            }
            let Some(popped) = self.stack.pop() else {
                return;
            };
            // Unseen children are marked visited at push time so a node
            // reachable over two edges is scheduled only once.
            let children = self.expander.traversing(&popped);
            for child in children {
                if self.visited.insert(child.clone()) {
                    self.stack.push(child);
                }
            }
            self.current = Some(self.expander.same_level(&popped));
        }
    }
}

impl<'h, E: GraphExpander<'h>> Iterator for GraphIterator<'h, E> {
    type Item = E::Item;

    fn next(&mut self) -> Option<E::Item> {
        self.try_next().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rustc_hash::FxHashMap;

    /// Adjacency-map graph emitting each node as its own payload.
    struct MapExpander<'h> {
        edges: &'h FxHashMap<char, Vec<char>>,
    }

    impl<'h> GraphExpander<'h> for MapExpander<'h> {
        type Node = char;
        type Item = char;

        fn same_level(&self, node: &char) -> Box<dyn Iterator<Item = char> + 'h> {
            Box::new(std::iter::once(*node))
        }

        fn traversing(&self, node: &char) -> Box<dyn Iterator<Item = char> + 'h> {
            Box::new(self.edges.get(node).cloned().unwrap_or_default().into_iter())
        }
    }

    /// Node != Item case: walks group keys, yields their members.
    struct GroupExpander<'h> {
        children: &'h FxHashMap<u32, Vec<u32>>,
        members: &'h FxHashMap<u32, Vec<String>>,
    }

    impl<'h> GraphExpander<'h> for GroupExpander<'h> {
        type Node = u32;
        type Item = String;

        fn same_level(&self, node: &u32) -> Box<dyn Iterator<Item = String> + 'h> {
            Box::new(self.members.get(node).cloned().unwrap_or_default().into_iter())
        }

        fn traversing(&self, node: &u32) -> Box<dyn Iterator<Item = u32> + 'h> {
            Box::new(self.children.get(node).cloned().unwrap_or_default().into_iter())
        }
    }

    fn graph(edges: &[(char, Vec<char>)]) -> FxHashMap<char, Vec<char>> {
        edges.iter().cloned().collect()
    }

    #[test]
    fn cycle_is_visited_at_most_once() {
        let edges = graph(&[('a', vec!['b']), ('b', vec!['a'])]);
        let expander = MapExpander { edges: &edges };
        let mut seen: Vec<char> = GraphIterator::new(expander, 'a').collect();
        seen.sort_unstable();
        assert_eq!(seen, vec!['a', 'b']);
    }

    #[test]
    fn diamond_emits_shared_node_once() {
        let edges = graph(&[('a', vec!['b', 'c']), ('b', vec!['d']), ('c', vec!['d'])]);
        let expander = MapExpander { edges: &edges };
        let mut seen: Vec<char> = GraphIterator::new(expander, 'a').collect();
        seen.sort_unstable();
        assert_eq!(seen, vec!['a', 'b', 'c', 'd']);
    }

    #[test]
    fn try_next_past_exhaustion_is_an_error() {
        let edges = FxHashMap::default();
        let expander = MapExpander { edges: &edges };
        let mut it = GraphIterator::new(expander, 'a');
        assert!(it.has_next());
        assert_eq!(it.try_next(), Ok('a'));
        assert!(!it.has_next());
        assert_eq!(it.try_next(), Err(EmptyIteration));
        // repeated misuse keeps failing, it does not wrap around
        assert_eq!(it.try_next(), Err(EmptyIteration));
    }

    #[test]
    fn has_next_is_idempotent() {
        let edges = graph(&[('a', vec!['b'])]);
        let expander = MapExpander { edges: &edges };
        let mut it = GraphIterator::new(expander, 'a');
        assert!(it.has_next());
        assert!(it.has_next());
        assert_eq!(it.try_next(), Ok('a'));
    }

    #[test]
    fn payload_and_walk_types_can_differ() {
        let children: FxHashMap<u32, Vec<u32>> = [(1, vec![2, 3]), (2, vec![]), (3, vec![])]
            .into_iter()
            .collect();
        let members: FxHashMap<u32, Vec<String>> = [
            (1, vec!["one".to_string()]),
            (2, vec!["two-a".to_string(), "two-b".to_string()]),
            (3, vec![]),
        ]
        .into_iter()
        .collect();
        let expander = GroupExpander {
            children: &children,
            members: &members,
        };
        let mut seen: Vec<String> = GraphIterator::new(expander, 1).collect();
        seen.sort();
        assert_eq!(seen, vec!["one", "two-a", "two-b"]);
    }
}
