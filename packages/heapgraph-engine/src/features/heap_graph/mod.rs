//! Heap Graph Feature - traversal-friendly view of a captured snapshot
//!
//! ```text
//! callers (oql, root_paths, traversal)
//!           ↓
//! facade (HeapGraph)
//!           ↓
//! ports (SnapshotReader) ← infrastructure (InMemorySnapshot)
//! ```

pub mod class_names;
pub mod facade;
pub mod infrastructure;
pub mod ports;

pub use facade::HeapGraph;
pub use infrastructure::{HeapBuilder, InMemorySnapshot};
pub use ports::SnapshotReader;
