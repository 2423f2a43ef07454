// InMemorySnapshot - synthetic snapshot adapter
//
// Implements the snapshot reader port over hand-built heaps, for tests and
// tooling that need a heap without a capture file. Field reads are counted
// per instance so tests can assert how often a traversal expanded a node.

use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;

use crate::shared::models::{
    ClassDescriptor, ClassId, FieldData, FieldDescriptor, FieldValue, Instance, InstanceId,
    PrimitiveValue,
};

use super::super::ports::SnapshotReader;

#[derive(Debug)]
struct ClassRecord {
    descriptor: ClassDescriptor,
    subclasses: Vec<ClassId>,
    statics: Vec<FieldValue>,
    instances: Vec<InstanceId>,
}

#[derive(Debug)]
struct InstanceRecord {
    instance: Instance,
    fields: Vec<FieldValue>,
    elements: Option<Vec<Option<InstanceId>>>,
    referrers: Vec<InstanceId>,
    expansions: AtomicU64,
}

/// A fully in-memory snapshot built with [`HeapBuilder`].
#[derive(Debug, Default)]
pub struct InMemorySnapshot {
    classes: FxHashMap<ClassId, ClassRecord>,
    class_names: FxHashMap<String, ClassId>,
    instances: FxHashMap<InstanceId, InstanceRecord>,
    roots: Vec<InstanceId>,
    meta_objects: FxHashMap<InstanceId, ClassId>,
}

impl InMemorySnapshot {
    /// How many times a traversal expanded this instance (field or element
    /// reads). Used to assert dead-end memoization.
    pub fn expansion_count(&self, instance: InstanceId) -> u64 {
        self.instances
            .get(&instance)
            .map(|r| r.expansions.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

impl SnapshotReader for InMemorySnapshot {
    fn classes<'a>(&'a self) -> Box<dyn Iterator<Item = ClassDescriptor> + 'a> {
        let mut all: Vec<ClassDescriptor> = self
            .classes
            .values()
            .map(|r| r.descriptor.clone())
            .collect();
        all.sort_by_key(|c| c.id);
        Box::new(all.into_iter())
    }

    fn class_by_id(&self, id: ClassId) -> Option<ClassDescriptor> {
        self.classes.get(&id).map(|r| r.descriptor.clone())
    }

    fn class_by_name(&self, name: &str) -> Option<ClassDescriptor> {
        self.class_names
            .get(name)
            .and_then(|id| self.class_by_id(*id))
    }

    fn instance_by_id(&self, id: InstanceId) -> Option<Instance> {
        self.instances.get(&id).map(|r| r.instance)
    }

    fn instances_of<'a>(&'a self, class: ClassId) -> Box<dyn Iterator<Item = Instance> + 'a> {
        let ids = self
            .classes
            .get(&class)
            .map(|r| r.instances.clone())
            .unwrap_or_default();
        Box::new(ids.into_iter().filter_map(move |id| self.instance_by_id(id)))
    }

    fn subclasses_of(&self, class: ClassId) -> Vec<ClassId> {
        self.classes
            .get(&class)
            .map(|r| r.subclasses.clone())
            .unwrap_or_default()
    }

    fn field_values(&self, instance: InstanceId) -> Vec<FieldValue> {
        match self.instances.get(&instance) {
            Some(record) => {
                record.expansions.fetch_add(1, Ordering::Relaxed);
                record.fields.clone()
            }
            None => Vec::new(),
        }
    }

    fn static_field_values(&self, class: ClassId) -> Vec<FieldValue> {
        self.classes
            .get(&class)
            .map(|r| r.statics.clone())
            .unwrap_or_default()
    }

    fn array_elements(&self, instance: InstanceId) -> Vec<Option<InstanceId>> {
        match self.instances.get(&instance) {
            Some(record) => {
                record.expansions.fetch_add(1, Ordering::Relaxed);
                record.elements.clone().unwrap_or_default()
            }
            None => Vec::new(),
        }
    }

    fn array_length(&self, instance: InstanceId) -> Option<usize> {
        self.instances
            .get(&instance)
            .and_then(|r| r.elements.as_ref())
            .map(|e| e.len())
    }

    fn referrers_of(&self, instance: InstanceId) -> Vec<InstanceId> {
        self.instances
            .get(&instance)
            .map(|r| r.referrers.clone())
            .unwrap_or_default()
    }

    fn gc_roots(&self) -> Vec<InstanceId> {
        self.roots.clone()
    }

    fn meta_class_of(&self, instance: InstanceId) -> Option<ClassId> {
        self.meta_objects.get(&instance).copied()
    }
}

/// Fluent builder for synthetic heaps.
#[derive(Debug, Default)]
pub struct HeapBuilder {
    snapshot: InMemorySnapshot,
    next_class: u64,
    next_instance: u64,
}

impl HeapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class with no superclass.
    pub fn class(&mut self, name: &str) -> ClassId {
        self.add_class(name, None)
    }

    /// Register a class extending `super_class`.
    pub fn class_extending(&mut self, name: &str, super_class: ClassId) -> ClassId {
        let id = self.add_class(name, Some(super_class));
        if let Some(record) = self.snapshot.classes.get_mut(&super_class) {
            record.subclasses.push(id);
        }
        id
    }

    /// Create an instance of `class` with a default shallow size.
    pub fn instance(&mut self, class: ClassId) -> InstanceId {
        self.instance_sized(class, 16)
    }

    pub fn instance_sized(&mut self, class: ClassId, size: u64) -> InstanceId {
        self.add_instance(class, size, false, None)
    }

    /// Create an object-array instance with the given elements.
    pub fn array(&mut self, class: ClassId, elements: &[Option<InstanceId>]) -> InstanceId {
        let id = self.add_instance(class, 16 + 8 * elements.len() as u64, true, Some(elements.to_vec()));
        for element in elements.iter().flatten() {
            self.add_referrer(*element, id);
        }
        id
    }

    /// Add a reference field declared on the instance's own class.
    pub fn field(&mut self, from: InstanceId, name: &str, to: Option<InstanceId>) {
        let declaring = match self.snapshot.instances.get(&from) {
            Some(record) => record.instance.class_id,
            None => return,
        };
        self.field_declared(from, declaring, name, to);
    }

    /// Add a reference field with an explicit declaring class (inherited
    /// fields).
    pub fn field_declared(
        &mut self,
        from: InstanceId,
        declaring: ClassId,
        name: &str,
        to: Option<InstanceId>,
    ) {
        let descriptor = self.field_descriptor(declaring, name, false);
        if let Some(record) = self.snapshot.instances.get_mut(&from) {
            record.fields.push(FieldValue {
                field: descriptor,
                data: FieldData::Reference(to),
            });
        }
        if let Some(to) = to {
            self.add_referrer(to, from);
        }
    }

    pub fn primitive_field(&mut self, from: InstanceId, name: &str, value: PrimitiveValue) {
        let declaring = match self.snapshot.instances.get(&from) {
            Some(record) => record.instance.class_id,
            None => return,
        };
        let descriptor = self.field_descriptor(declaring, name, false);
        if let Some(record) = self.snapshot.instances.get_mut(&from) {
            record.fields.push(FieldValue {
                field: descriptor,
                data: FieldData::Primitive(value),
            });
        }
    }

    /// Add a static reference field on a class.
    pub fn static_field(&mut self, class: ClassId, name: &str, to: Option<InstanceId>) {
        let descriptor = self.field_descriptor(class, name, true);
        if let Some(record) = self.snapshot.classes.get_mut(&class) {
            record.statics.push(FieldValue {
                field: descriptor,
                data: FieldData::Reference(to),
            });
        }
    }

    /// Mark an instance as a GC root.
    pub fn gc_root(&mut self, instance: InstanceId) {
        self.snapshot.roots.push(instance);
    }

    /// Set the captured nearest-GC-root pointer of an instance.
    pub fn nearest_root_pointer(&mut self, instance: InstanceId, towards: InstanceId) {
        if let Some(record) = self.snapshot.instances.get_mut(&instance) {
            record.instance.nearest_gc_root = Some(towards);
        }
    }

    /// Mark an instance as the class object denoting `class`.
    pub fn meta_object(&mut self, instance: InstanceId, class: ClassId) {
        self.snapshot.meta_objects.insert(instance, class);
    }

    /// Attach a class-loader instance to a class.
    pub fn class_loader(&mut self, class: ClassId, loader: InstanceId) {
        if let Some(record) = self.snapshot.classes.get_mut(&class) {
            record.descriptor.class_loader = Some(loader);
        }
    }

    pub fn build(self) -> InMemorySnapshot {
        self.snapshot
    }

    fn add_class(&mut self, name: &str, super_class: Option<ClassId>) -> ClassId {
        self.next_class += 1;
        let id = ClassId(self.next_class);
        let descriptor = ClassDescriptor {
            id,
            name: name.to_string(),
            super_class,
            class_loader: None,
        };
        self.snapshot.class_names.insert(name.to_string(), id);
        self.snapshot.classes.insert(
            id,
            ClassRecord {
                descriptor,
                subclasses: Vec::new(),
                statics: Vec::new(),
                instances: Vec::new(),
            },
        );
        id
    }

    fn add_instance(
        &mut self,
        class: ClassId,
        size: u64,
        is_array: bool,
        elements: Option<Vec<Option<InstanceId>>>,
    ) -> InstanceId {
        self.next_instance += 1;
        let id = InstanceId(self.next_instance);
        let instance = Instance {
            id,
            class_id: class,
            size,
            is_array,
            nearest_gc_root: None,
        };
        self.snapshot.instances.insert(
            id,
            InstanceRecord {
                instance,
                fields: Vec::new(),
                elements,
                referrers: Vec::new(),
                expansions: AtomicU64::new(0),
            },
        );
        if let Some(record) = self.snapshot.classes.get_mut(&class) {
            record.instances.push(id);
        }
        id
    }

    fn add_referrer(&mut self, target: InstanceId, referrer: InstanceId) {
        if let Some(record) = self.snapshot.instances.get_mut(&target) {
            if !record.referrers.contains(&referrer) {
                record.referrers.push(referrer);
            }
        }
    }

    fn field_descriptor(&self, declaring: ClassId, name: &str, is_static: bool) -> FieldDescriptor {
        let declaring_class_name = self
            .snapshot
            .classes
            .get(&declaring)
            .map(|r| r.descriptor.name.clone())
            .unwrap_or_default();
        FieldDescriptor {
            declaring_class: declaring,
            declaring_class_name,
            name: name.to_string(),
            is_static,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builder_wires_referrers_both_for_fields_and_elements() {
        let mut heap = HeapBuilder::new();
        let object = heap.class("java.lang.Object");
        let array_class = heap.class("java.lang.Object[]");
        let holder = heap.instance(object);
        let target = heap.instance(object);
        heap.field(holder, "ref", Some(target));
        let array = heap.array(array_class, &[Some(target), None]);
        let snapshot = heap.build();

        let mut referrers = snapshot.referrers_of(target);
        referrers.sort_unstable();
        assert_eq!(referrers, vec![holder, array]);
        assert_eq!(snapshot.array_length(array), Some(2));
    }

    #[test]
    fn expansion_counter_tracks_field_reads() {
        let mut heap = HeapBuilder::new();
        let object = heap.class("java.lang.Object");
        let instance = heap.instance(object);
        let snapshot = heap.build();

        assert_eq!(snapshot.expansion_count(instance), 0);
        let _ = snapshot.field_values(instance);
        let _ = snapshot.field_values(instance);
        assert_eq!(snapshot.expansion_count(instance), 2);
    }
}
