//! Root Paths Feature - reference chains from the GC root set
//!
//! Finds, per GC root, one reference chain to a target instance. Dead-end
//! subtrees are memoized so they are explored at most once across the
//! whole search.

pub mod finder;

pub use finder::{PathResult, RootPathFinder, RootPathIter};
