//! Heap Graph Infrastructure - snapshot adapters

pub mod in_memory;

pub use in_memory::{HeapBuilder, InMemorySnapshot};
