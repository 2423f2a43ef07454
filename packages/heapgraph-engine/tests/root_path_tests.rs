//! Root-path search over richer heap shapes

mod common;

use heapgraph_engine::{GraphNode, HeapBuilder, HeapQueryEngine, NodeKey, PathResult};
use pretty_assertions::assert_eq;

fn chain_keys(result: &PathResult) -> Vec<NodeKey> {
    result.chain.iter().map(GraphNode::key).collect()
}

#[test]
fn one_chain_per_root_that_reaches_the_target() {
    let mut heap = HeapBuilder::new();
    let object = heap.class("java.lang.Object");
    let root_a = heap.instance(object);
    let root_b = heap.instance(object);
    let shared = heap.instance(object);
    let target = heap.instance(object);
    heap.gc_root(root_a);
    heap.gc_root(root_b);
    heap.field(root_a, "s", Some(shared));
    heap.field(root_b, "s", Some(shared));
    heap.field(shared, "t", Some(target));
    let snapshot = heap.build();
    let engine = HeapQueryEngine::new(&snapshot);

    let target_instance = engine.graph().find_instance(target).unwrap();
    let results: Vec<PathResult> = engine.rootset_references_to(&target_instance, true).collect();

    // both roots exploit the shared interior node
    assert_eq!(results.len(), 2);
    let roots: Vec<NodeKey> = results.iter().map(|r| r.root.key()).collect();
    assert!(roots.contains(&NodeKey::Instance(root_a)));
    assert!(roots.contains(&NodeKey::Instance(root_b)));
    for result in &results {
        assert_eq!(result.chain.len(), 3);
        assert_eq!(result.chain[0].key(), result.root.key());
        assert_eq!(
            result.chain.last().map(GraphNode::key),
            Some(NodeKey::Instance(target))
        );
    }
}

#[test]
fn chains_pass_through_array_elements() {
    let mut heap = HeapBuilder::new();
    let object = heap.class("java.lang.Object");
    let array_class = heap.class("java.lang.Object[]");
    let root = heap.instance(object);
    let target = heap.instance(object);
    let filler = heap.instance(object);
    let array = heap.array(array_class, &[Some(filler), None, Some(target)]);
    heap.gc_root(root);
    heap.field(root, "table", Some(array));
    let snapshot = heap.build();
    let engine = HeapQueryEngine::new(&snapshot);

    let target_instance = engine.graph().find_instance(target).unwrap();
    let results: Vec<PathResult> = engine.rootset_references_to(&target_instance, true).collect();

    assert_eq!(results.len(), 1);
    assert_eq!(
        chain_keys(&results[0]),
        vec![
            NodeKey::Instance(root),
            NodeKey::Instance(array),
            NodeKey::Instance(target)
        ]
    );
}

#[test]
fn chains_pass_through_class_statics() {
    let mut heap = HeapBuilder::new();
    let meta = heap.class("java.lang.Class");
    let singleton_holder = heap.class("example.Singletons");
    let object = heap.class("java.lang.Object");
    let class_object = heap.instance(meta);
    heap.meta_object(class_object, singleton_holder);
    let target = heap.instance(object);
    heap.static_field(singleton_holder, "INSTANCE", Some(target));
    heap.gc_root(class_object);
    let snapshot = heap.build();
    let engine = HeapQueryEngine::new(&snapshot);

    let target_instance = engine.graph().find_instance(target).unwrap();
    let results: Vec<PathResult> = engine.rootset_references_to(&target_instance, true).collect();

    // the class object resolves to the class node, whose static points at
    // the target
    assert_eq!(results.len(), 1);
    assert_eq!(
        chain_keys(&results[0]),
        vec![NodeKey::Class(singleton_holder), NodeKey::Instance(target)]
    );
}

#[test]
fn multiple_hits_at_one_frontier_are_all_recorded() {
    let mut heap = HeapBuilder::new();
    let object = heap.class("java.lang.Object");
    let array_class = heap.class("java.lang.Object[]");
    let root = heap.instance(object);
    let target = heap.instance(object);
    // two distinct element edges to the same target from one frontier
    let array = heap.array(array_class, &[Some(target), Some(target)]);
    heap.gc_root(root);
    heap.field(root, "table", Some(array));
    let snapshot = heap.build();
    let engine = HeapQueryEngine::new(&snapshot);

    let target_instance = engine.graph().find_instance(target).unwrap();
    let results: Vec<PathResult> = engine.rootset_references_to(&target_instance, true).collect();

    assert_eq!(results.len(), 2);
    for result in &results {
        assert_eq!(
            chain_keys(result),
            vec![
                NodeKey::Instance(root),
                NodeKey::Instance(array),
                NodeKey::Instance(target)
            ]
        );
    }
}

#[test]
fn deep_chains_do_not_recurse() {
    // a thousand-link chain exercises the explicit frame stack
    let mut heap = HeapBuilder::new();
    let object = heap.class("java.lang.Object");
    let root = heap.instance(object);
    heap.gc_root(root);
    let mut current = root;
    let mut last = root;
    for _ in 0..1000 {
        let next = heap.instance(object);
        heap.field(current, "next", Some(next));
        current = next;
        last = next;
    }
    let snapshot = heap.build();
    let engine = HeapQueryEngine::new(&snapshot);

    let target_instance = engine.graph().find_instance(last).unwrap();
    let results: Vec<PathResult> = engine.rootset_references_to(&target_instance, true).collect();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chain.len(), 1001);
}

#[test]
fn common_sample_heap_routes_through_the_holder() {
    let heap = common::sample_heap();
    let engine = HeapQueryEngine::new(&heap.snapshot);

    let target_instance = engine.graph().find_instance(heap.d1).unwrap();
    let results: Vec<PathResult> = engine.rootset_references_to(&target_instance, true).collect();

    assert_eq!(results.len(), 1);
    assert_eq!(
        chain_keys(&results[0]),
        vec![NodeKey::Instance(heap.holder), NodeKey::Instance(heap.d1)]
    );
}

#[test]
fn search_state_is_per_call() {
    let heap = common::sample_heap();
    let engine = HeapQueryEngine::new(&heap.snapshot);
    let target_instance = engine.graph().find_instance(heap.b1).unwrap();

    let first: Vec<PathResult> = engine.rootset_references_to(&target_instance, true).collect();
    let second: Vec<PathResult> = engine.rootset_references_to(&target_instance, true).collect();
    assert_eq!(first, second);
}
