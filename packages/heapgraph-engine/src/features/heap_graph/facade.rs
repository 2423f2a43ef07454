// HeapGraph - query-oriented facade over the raw snapshot
//
// Translates snapshot primitives into traversal-friendly operations:
// class/instance lookup, referrer/referee edges, GC-root enumeration,
// weak-reference classification. The snapshot is externally produced and
// may contain artifacts (dangling references, broken root chains); every
// anomaly degrades to "no further data" instead of failing.

use once_cell::sync::OnceCell;
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::features::traversal::{GraphExpander, GraphIterator};
use crate::shared::models::{
    ClassDescriptor, ClassId, FieldDescriptor, FieldValue, GraphNode, Instance, InstanceId,
};

use super::class_names::{normalize_class_name, parse_numeric_id};
use super::ports::SnapshotReader;

/// Ancestor class marking weak/soft reference wrappers.
const REFERENCE_ANCESTOR: &str = "java.lang.ref.Reference";
/// The referent field declared on the reference ancestor.
const REFERENT_FIELD: &str = "referent";
/// Holder of the pending-finalization queue.
const FINALIZER_CLASS: &str = "java.lang.ref.Finalizer";

/// Facade over a [`SnapshotReader`].
///
/// Holds only lazily resolved per-snapshot metadata (the weak-reference
/// ancestor, the GC-root id set); all traversal state lives in the calls
/// that need it, so one graph can serve concurrent read-only lookups.
pub struct HeapGraph<'h> {
    reader: &'h dyn SnapshotReader,
    reference_ancestor: OnceCell<Option<ClassId>>,
    root_ids: OnceCell<FxHashSet<InstanceId>>,
}

impl<'h> HeapGraph<'h> {
    pub fn new(reader: &'h dyn SnapshotReader) -> Self {
        Self {
            reader,
            reference_ancestor: OnceCell::new(),
            root_ids: OnceCell::new(),
        }
    }

    /// The underlying snapshot reader.
    pub fn reader(&self) -> &'h dyn SnapshotReader {
        self.reader
    }

    /// Resolve a class by raw numeric id (decimal or `0x` hex) or by
    /// (possibly JVM-encoded) name.
    pub fn find_class(&self, name_or_id: &str) -> Option<ClassDescriptor> {
        if let Some(raw) = parse_numeric_id(name_or_id) {
            return self.reader.class_by_id(ClassId(raw));
        }
        self.reader.class_by_name(&normalize_class_name(name_or_id))
    }

    pub fn find_instance(&self, id: InstanceId) -> Option<Instance> {
        self.reader.instance_by_id(id)
    }

    pub fn class_of(&self, instance: &Instance) -> Option<ClassDescriptor> {
        self.reader.class_by_id(instance.class_id)
    }

    /// Ordered field values of an instance, inherited fields included.
    pub fn fields_of(&self, instance: &Instance) -> Vec<FieldValue> {
        self.reader.field_values(instance.id)
    }

    pub fn statics_of(&self, class: &ClassDescriptor) -> Vec<FieldValue> {
        self.reader.static_field_values(class.id)
    }

    pub fn array_elements_of(&self, instance: &Instance) -> Vec<Option<InstanceId>> {
        self.reader.array_elements(instance.id)
    }

    pub fn array_length_of(&self, instance: &Instance) -> Option<usize> {
        self.reader.array_length(instance.id)
    }

    /// First instance field with this name, if any.
    pub fn field_named(&self, instance: &Instance, name: &str) -> Option<FieldValue> {
        self.reader
            .field_values(instance.id)
            .into_iter()
            .find(|fv| fv.field.name == name)
    }

    /// Resolve an instance id to a graph node. A value whose dynamic class
    /// is the meta-class type resolves back to the class it denotes, so
    /// walking "up" through a class object yields the class itself.
    pub fn node_for(&self, id: InstanceId) -> Option<GraphNode> {
        if let Some(class_id) = self.reader.meta_class_of(id) {
            if let Some(class) = self.reader.class_by_id(class_id) {
                return Some(GraphNode::Class(class));
            }
        }
        self.reader.instance_by_id(id).map(GraphNode::Instance)
    }

    /// The GC-root set, meta-class resolution applied.
    pub fn roots(&self) -> Vec<GraphNode> {
        self.reader
            .gc_roots()
            .into_iter()
            .filter_map(|id| {
                let node = self.node_for(id);
                if node.is_none() {
                    debug!(root = id.0, "GC root resolves to no instance, skipping");
                }
                node
            })
            .collect()
    }

    pub fn is_gc_root(&self, instance: &Instance) -> bool {
        self.root_id_set().contains(&instance.id)
    }

    /// Follow nearest-GC-root pointers until a root is reached. Broken or
    /// looping chains (the snapshot is externally produced) yield `None`.
    pub fn nearest_root_of(&self, instance: &Instance) -> Option<Instance> {
        let mut seen: FxHashSet<InstanceId> = FxHashSet::default();
        let mut current = *instance;
        loop {
            if self.root_id_set().contains(&current.id) {
                return Some(current);
            }
            if !seen.insert(current.id) {
                warn!(
                    instance = current.id.0,
                    "nearest-GC-root chain loops, treating as unrooted"
                );
                return None;
            }
            let next = current.nearest_gc_root?;
            match self.reader.instance_by_id(next) {
                Some(instance) => current = instance,
                None => {
                    debug!(
                        instance = current.id.0,
                        target = next.0,
                        "nearest-GC-root pointer dangles, treating as unrooted"
                    );
                    return None;
                }
            }
        }
    }

    /// Whether the instance's class is assignable to the snapshot's
    /// reference ancestor. Resolved once per snapshot; snapshots without
    /// such an ancestor degrade to `false`.
    pub fn is_weak_reference(&self, instance: &Instance) -> bool {
        match self.reference_ancestor_id() {
            Some(ancestor) => self.is_assignable_to(instance.class_id, ancestor),
            None => false,
        }
    }

    /// Known back-references of a node. For an instance these are its
    /// recorded referrers; for a class, its instances plus its class
    /// loader. Weak-reference candidates are dropped unless `include_weak`.
    pub fn referrers(&self, node: &GraphNode, include_weak: bool) -> Vec<GraphNode> {
        let candidates: Vec<InstanceId> = match node {
            GraphNode::Instance(instance) => self.reader.referrers_of(instance.id),
            GraphNode::Class(class) => {
                let mut ids: Vec<InstanceId> =
                    self.reader.instances_of(class.id).map(|i| i.id).collect();
                if let Some(loader) = class.class_loader {
                    ids.push(loader);
                }
                ids
            }
        };
        let mut out = Vec::new();
        for id in candidates {
            let Some(instance) = self.reader.instance_by_id(id) else {
                debug!(referrer = id.0, "referrer resolves to no instance, skipping");
                continue;
            };
            if !include_weak && self.is_weak_reference(&instance) {
                continue;
            }
            if let Some(node) = self.node_for(id) {
                out.push(node);
            }
        }
        out
    }

    /// Outgoing edges of a node: reference-valued instance fields, static
    /// fields for a class, element values for an object array. The
    /// referent edge of a weak reference is suppressed here, inside the
    /// enumeration, unless `include_weak`.
    pub fn referees(&self, node: &GraphNode, include_weak: bool) -> Vec<GraphNode> {
        let mut out = Vec::new();
        match node {
            GraphNode::Instance(instance) if instance.is_array => {
                for element in self.reader.array_elements(instance.id).into_iter().flatten() {
                    if let Some(node) = self.node_for(element) {
                        out.push(node);
                    }
                }
            }
            GraphNode::Instance(instance) => {
                let suppress_referent = !include_weak && self.is_weak_reference(instance);
                for fv in self.reader.field_values(instance.id) {
                    if suppress_referent && self.is_referent_field(&fv.field) {
                        continue;
                    }
                    if let Some(target) = fv.referenced() {
                        if let Some(node) = self.node_for(target) {
                            out.push(node);
                        }
                    }
                }
            }
            GraphNode::Class(class) => {
                for fv in self.reader.static_field_values(class.id) {
                    if let Some(target) = fv.referenced() {
                        if let Some(node) = self.node_for(target) {
                            out.push(node);
                        }
                    }
                }
            }
        }
        out
    }

    /// Whether `from` holds a direct reference to `to`, weak edges
    /// included.
    pub fn refers(&self, from: &GraphNode, to: &GraphNode) -> bool {
        let target = to.key();
        self.referees(from, true).iter().any(|n| n.key() == target)
    }

    /// Super-chain of a class, nearest first.
    pub fn superclasses_of(&self, class: &ClassDescriptor) -> Vec<ClassDescriptor> {
        let mut seen: FxHashSet<ClassId> = FxHashSet::default();
        seen.insert(class.id);
        let mut chain = Vec::new();
        let mut current = class.super_class;
        while let Some(id) = current {
            if !seen.insert(id) {
                warn!(class = id.0, "superclass chain loops, truncating");
                break;
            }
            let Some(descriptor) = self.reader.class_by_id(id) else {
                break;
            };
            current = descriptor.super_class;
            chain.push(descriptor);
        }
        chain
    }

    /// Instances of a class, optionally including its whole subclass
    /// closure. The closure walk yields instances while traversing class
    /// nodes, so a fresh lazy iterator is produced per call.
    pub fn instances_of(
        &self,
        class: &ClassDescriptor,
        include_subclasses: bool,
    ) -> Box<dyn Iterator<Item = Instance> + 'h> {
        if include_subclasses {
            Box::new(GraphIterator::new(
                SubclassInstancesExpander {
                    reader: self.reader,
                },
                class.id,
            ))
        } else {
            self.reader.instances_of(class.id)
        }
    }

    /// Instances waiting on the well-known finalizer queue: follows the
    /// static queue head and its next links, yielding each referent. The
    /// walk terminates on a missing link, and defends against a cyclic
    /// list by detecting a self-loop.
    pub fn finalizer_pending_instances(&self) -> Vec<Instance> {
        let mut pending = Vec::new();
        let Some(finalizer) = self.reader.class_by_name(FINALIZER_CLASS) else {
            return pending;
        };
        let queue = self
            .reader
            .static_field_values(finalizer.id)
            .into_iter()
            .find(|fv| fv.field.name == "queue")
            .and_then(|fv| fv.referenced());
        let Some(queue_id) = queue else {
            return pending;
        };
        let Some(queue_instance) = self.reader.instance_by_id(queue_id) else {
            return pending;
        };
        let mut current = self
            .field_named(&queue_instance, "head")
            .and_then(|fv| fv.referenced());
        while let Some(id) = current {
            let Some(entry) = self.reader.instance_by_id(id) else {
                break;
            };
            if let Some(referent) = self
                .field_named(&entry, REFERENT_FIELD)
                .and_then(|fv| fv.referenced())
            {
                if let Some(instance) = self.reader.instance_by_id(referent) {
                    pending.push(instance);
                }
            }
            match self.field_named(&entry, "next").and_then(|fv| fv.referenced()) {
                Some(next) if next == id => {
                    debug!(entry = id.0, "finalizer queue entry links to itself, stopping");
                    break;
                }
                next => current = next,
            }
        }
        pending
    }

    fn reference_ancestor_id(&self) -> Option<ClassId> {
        *self.reference_ancestor.get_or_init(|| {
            let found = self.reader.class_by_name(REFERENCE_ANCESTOR).map(|c| c.id);
            if found.is_none() {
                debug!("snapshot has no reference ancestor class, weak-reference detection disabled");
            }
            found
        })
    }

    fn is_referent_field(&self, field: &FieldDescriptor) -> bool {
        field.name == REFERENT_FIELD && Some(field.declaring_class) == self.reference_ancestor_id()
    }

    fn is_assignable_to(&self, class: ClassId, ancestor: ClassId) -> bool {
        let mut seen: FxHashSet<ClassId> = FxHashSet::default();
        let mut current = Some(class);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            if !seen.insert(id) {
                return false;
            }
            current = self.reader.class_by_id(id).and_then(|c| c.super_class);
        }
        false
    }

    fn root_id_set(&self) -> &FxHashSet<InstanceId> {
        self.root_ids
            .get_or_init(|| self.reader.gc_roots().into_iter().collect())
    }
}

/// Walks the subclass tree while yielding each class's instances; the
/// Node != Item shape of the traversal iterator.
struct SubclassInstancesExpander<'h> {
    reader: &'h dyn SnapshotReader,
}

impl<'h> GraphExpander<'h> for SubclassInstancesExpander<'h> {
    type Node = ClassId;
    type Item = Instance;

    fn same_level(&self, class: &ClassId) -> Box<dyn Iterator<Item = Instance> + 'h> {
        self.reader.instances_of(*class)
    }

    fn traversing(&self, class: &ClassId) -> Box<dyn Iterator<Item = ClassId> + 'h> {
        Box::new(self.reader.subclasses_of(*class).into_iter())
    }
}
