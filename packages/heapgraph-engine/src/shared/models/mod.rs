//! Data model for a captured heap snapshot
//!
//! All types here are plain data. The snapshot itself is owned by the
//! external reader (see `features::heap_graph::ports`); these records are
//! cheap handles resolved through it on demand.

pub mod heap;
pub mod node;
pub mod value;

pub use heap::{
    ClassDescriptor, ClassId, FieldData, FieldDescriptor, FieldValue, Instance, InstanceId,
    PrimitiveValue,
};
pub use node::{GraphNode, NodeKey};
pub use value::Value;
