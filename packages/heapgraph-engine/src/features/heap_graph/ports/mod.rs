//! Heap Graph Ports - the snapshot reader capability
//!
//! The engine never captures a heap itself; it consumes a previously
//! captured snapshot through this port. Every operation is read-only and
//! deterministic for a fixed snapshot, and may be called any number of
//! times.
//!
//! Implementors:
//! - `infrastructure::InMemorySnapshot` (synthetic heaps for tests/tools)
//! - the out-of-scope capture subsystem's reader, in the host application

use crate::shared::models::{ClassDescriptor, ClassId, FieldValue, Instance, InstanceId};

/// Read-only access to the raw captured snapshot.
///
/// The snapshot owns all instances, classes, and roots; the engine only
/// ever hands out cheap record copies resolved through this trait.
pub trait SnapshotReader {
    /// All classes in the snapshot, in a stable order.
    fn classes<'a>(&'a self) -> Box<dyn Iterator<Item = ClassDescriptor> + 'a>;

    fn class_by_id(&self, id: ClassId) -> Option<ClassDescriptor>;

    /// Resolution by normalized source-form name (`java.lang.String`,
    /// `int[]`).
    fn class_by_name(&self, name: &str) -> Option<ClassDescriptor>;

    fn instance_by_id(&self, id: InstanceId) -> Option<Instance>;

    /// Instances of exactly this class, in a stable order.
    fn instances_of<'a>(&'a self, class: ClassId) -> Box<dyn Iterator<Item = Instance> + 'a>;

    /// Direct subclasses only; the subclass closure is walked by callers.
    fn subclasses_of(&self, class: ClassId) -> Vec<ClassId>;

    /// Ordered field values of an instance, inherited fields included,
    /// each tagged primitive/reference with declaring field metadata.
    fn field_values(&self, instance: InstanceId) -> Vec<FieldValue>;

    fn static_field_values(&self, class: ClassId) -> Vec<FieldValue>;

    /// Element values of an object-array instance; empty for anything
    /// else. `None` entries are null elements.
    fn array_elements(&self, instance: InstanceId) -> Vec<Option<InstanceId>>;

    /// Element count of an object-array instance.
    fn array_length(&self, instance: InstanceId) -> Option<usize>;

    /// Known back-references: instances holding a reference to this one.
    fn referrers_of(&self, instance: InstanceId) -> Vec<InstanceId>;

    /// The designated GC-root instances, reachable without traversal.
    fn gc_roots(&self) -> Vec<InstanceId>;

    /// When `instance` is a class object (its dynamic class is the
    /// meta-class type), the class it denotes.
    fn meta_class_of(&self, instance: InstanceId) -> Option<ClassId>;
}
