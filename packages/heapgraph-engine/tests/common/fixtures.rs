//! Synthetic heap fixtures

use heapgraph_engine::{HeapBuilder, InMemorySnapshot, InstanceId, PrimitiveValue};

/// A small application-shaped heap: a class hierarchy with counted
/// instances, rooted through a holder object.
pub struct SampleHeap {
    pub snapshot: InMemorySnapshot,
    pub holder: InstanceId,
    /// Base instance, count = 1
    pub b1: InstanceId,
    /// Base instance, count = 3
    pub b2: InstanceId,
    /// Derived instance, count = 5
    pub d1: InstanceId,
}

pub fn sample_heap() -> SampleHeap {
    let mut heap = HeapBuilder::new();
    let object = heap.class("java.lang.Object");
    let base_class = heap.class("example.Base");
    let derived_class = heap.class_extending("example.Derived", base_class);

    let holder = heap.instance(object);
    let b1 = heap.instance(base_class);
    let b2 = heap.instance(base_class);
    let d1 = heap.instance(derived_class);
    heap.primitive_field(b1, "count", PrimitiveValue::Int(1));
    heap.primitive_field(b2, "count", PrimitiveValue::Int(3));
    heap.primitive_field(d1, "count", PrimitiveValue::Int(5));
    heap.field(holder, "first", Some(b1));
    heap.field(holder, "second", Some(b2));
    heap.field(holder, "third", Some(d1));
    heap.gc_root(holder);

    SampleHeap {
        snapshot: heap.build(),
        holder,
        b1,
        b2,
        d1,
    }
}
