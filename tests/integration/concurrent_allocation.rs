#![allow(missing_docs)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

use classgraph::{MemoryGraph, Schema};

const THREADS: usize = 8;
const PER_THREAD: usize = 50;

#[test]
fn concurrent_reservations_are_unique_and_dense() {
    let schema = Schema::new(MemoryGraph::new());
    schema.create_namespace("orders", Some("ord-"), None).unwrap();

    let uris: Vec<String> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    (0..PER_THREAD)
                        .map(|_| schema.reserve_next_uri("orders", None, None).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().expect("allocator thread panicked"))
            .collect()
    });

    let numbers: BTreeSet<usize> = uris
        .iter()
        .map(|uri| uri.strip_prefix("ord-").unwrap().parse().unwrap())
        .collect();
    assert_eq!(numbers.len(), THREADS * PER_THREAD);
    assert_eq!(numbers, (1..=THREADS * PER_THREAD).collect());
}

#[test]
fn concurrent_class_creation_has_one_winner() {
    let schema = Arc::new(Schema::new(MemoryGraph::new()));
    let outcomes: Vec<bool> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let schema = Arc::clone(&schema);
                scope.spawn(move || schema.create_class("Shared", true).is_ok())
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("creator thread panicked"))
            .collect()
    });

    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    assert_eq!(schema.list_classes().unwrap().len(), 1);
    let uris: BTreeSet<String> = schema
        .list_namespaces()
        .unwrap()
        .into_iter()
        .map(|ns| ns.name)
        .collect();
    assert!(uris.contains("schema_node"));
}
