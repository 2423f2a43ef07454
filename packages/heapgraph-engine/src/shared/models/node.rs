// GraphNode - tagged union over the two node kinds of the heap graph
//
// Traversals that cross a `Class` object walk "up" into the class itself,
// so referee/root enumeration yields either kind. Exhaustive matching at
// each call site replaces runtime type tests.

use serde::{Deserialize, Serialize};

use super::heap::{ClassDescriptor, ClassId, Instance, InstanceId};

/// A node of the heap graph: an instance, or a class acting as a node
/// (static fields as outgoing edges, instances as incoming ones).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GraphNode {
    Instance(Instance),
    Class(ClassDescriptor),
}

/// Lightweight identity key for visited/ignored sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKey {
    Instance(InstanceId),
    Class(ClassId),
}

impl GraphNode {
    pub fn key(&self) -> NodeKey {
        match self {
            GraphNode::Instance(instance) => NodeKey::Instance(instance.id),
            GraphNode::Class(class) => NodeKey::Class(class.id),
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            GraphNode::Instance(instance) => Some(instance),
            GraphNode::Class(_) => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassDescriptor> {
        match self {
            GraphNode::Instance(_) => None,
            GraphNode::Class(class) => Some(class),
        }
    }
}

impl From<Instance> for GraphNode {
    fn from(instance: Instance) -> Self {
        GraphNode::Instance(instance)
    }
}

impl From<ClassDescriptor> for GraphNode {
    fn from(class: ClassDescriptor) -> Self {
        GraphNode::Class(class)
    }
}
