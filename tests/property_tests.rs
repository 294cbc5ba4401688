#![allow(missing_docs)]

use std::collections::{BTreeSet, HashSet};

use classgraph::{
    DuplicatePolicy, MemoryGraph, NodeImportOptions, PropertyMap, Schema, SortOrder, Table, Value,
};
use proptest::prelude::*;

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::Int),
        any::<bool>().prop_map(Value::Bool),
        "[a-z]{1,6}".prop_map(Value::String),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn allocations_follow_advances(advances in prop::collection::vec(1i64..50, 1..20)) {
        let schema = Schema::new(MemoryGraph::new());
        schema.create_namespace("seq", None, None).unwrap();
        let mut expected = 1;
        for advance in advances {
            let allocation = schema.advance_autoincrement("seq", advance).unwrap();
            prop_assert_eq!(allocation.count, expected);
            expected += advance;
        }
        let info = schema.list_namespaces().unwrap();
        prop_assert_eq!(info[0].next_count, expected);
    }

    #[test]
    fn strict_filter_keeps_only_declared_keys(
        declared in prop::collection::btree_set("[a-f]", 0..4),
        requested in prop::collection::btree_map("[a-h]", arb_value(), 0..6),
    ) {
        let schema = Schema::new(MemoryGraph::new());
        schema
            .create_class_with_properties("T", declared.iter().cloned(), true)
            .unwrap();
        let requested: PropertyMap = requested.into_iter().collect();
        let kept = schema.allowable_props("T", &requested, true).unwrap();

        for (key, value) in &kept {
            prop_assert!(declared.contains(key));
            prop_assert_eq!(requested.get(key), Some(value));
        }
        let undeclared = requested.keys().any(|k| !declared.contains(k));
        prop_assert_eq!(
            schema.allowable_props("T", &requested, false).is_err(),
            undeclared
        );
    }

    #[test]
    fn keyed_import_creates_one_node_per_distinct_key(
        keys in prop::collection::vec(prop::option::of("k[0-5]"), 1..24),
        batch in 1usize..8,
    ) {
        let schema = Schema::new(MemoryGraph::new());
        schema.create_class_with_properties("Item", ["key", "n"], true).unwrap();
        let mut table = Table::new(["key", "n"]).unwrap();
        for (n, key) in keys.iter().enumerate() {
            let key = key.clone().map_or(Value::Null, Value::String);
            table.push_row([key, Value::Int(n as i64)]).unwrap();
        }
        let report = schema
            .import_nodes(
                "Item",
                &table,
                &NodeImportOptions::keyed("key", DuplicatePolicy::Merge).batch_size(batch),
            )
            .unwrap();

        let distinct: BTreeSet<&String> = keys.iter().flatten().collect();
        let keyless = keys.iter().filter(|k| k.is_none()).count();
        prop_assert_eq!(report.created, distinct.len());
        prop_assert_eq!(report.skipped, keyless);
        prop_assert_eq!(schema.count_data_nodes_of_class("Item").unwrap(), distinct.len());
        prop_assert_eq!(report.batches, (keys.len() - keyless).div_ceil(batch));
    }

    #[test]
    fn resolved_property_names_are_unique(
        layers in prop::collection::vec(prop::collection::vec("[a-e]", 0..4), 1..5),
        desc in any::<bool>(),
    ) {
        let schema = Schema::new(MemoryGraph::new());
        for (depth, props) in layers.iter().enumerate() {
            let own: BTreeSet<&String> = props.iter().collect();
            schema
                .create_class_with_properties(&format!("L{depth}"), own, false)
                .unwrap();
            if depth > 0 {
                schema
                    .add_ancestor(format!("L{depth}"), format!("L{}", depth - 1))
                    .unwrap();
            }
        }
        let leaf = format!("L{}", layers.len() - 1);
        let sort = if desc { SortOrder::Desc } else { SortOrder::Asc };
        let names = schema.get_class_properties(leaf, true, sort, false).unwrap();

        let unique: HashSet<&String> = names.iter().collect();
        prop_assert_eq!(unique.len(), names.len());
        let all: HashSet<&String> = layers.iter().flatten().collect();
        prop_assert_eq!(unique, all);
    }
}
