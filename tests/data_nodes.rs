#![allow(missing_docs)]

use classgraph::{
    props, CreateOptions, DataNodeFilter, GraphStore, MatchSpec, MemoryGraph, MergeStatus,
    PropertyMap, Schema, SchemaError, Statement, Value,
};

fn cities() -> Schema<MemoryGraph> {
    let schema = Schema::new(MemoryGraph::new());
    schema
        .create_class_with_properties("City", ["name", "pop"], true)
        .unwrap();
    schema
        .create_class_with_properties("State", ["name", "code"], true)
        .unwrap();
    schema
        .create_class_relationship("City", "State", "IS_IN")
        .unwrap();
    schema
}

fn city(schema: &Schema<MemoryGraph>, name: &str, pop: i64) -> classgraph::NodeId {
    schema
        .create_data_node(
            "City",
            &props([("name", Value::from(name)), ("pop", Value::from(pop))]),
            &CreateOptions::default(),
        )
        .unwrap()
}

#[test]
fn data_node_carries_class_label_and_reference() {
    let schema = cities();
    let id = city(&schema, "Berkeley", 120_000);

    let node = schema.store().node(id).unwrap();
    assert!(node.has_label("City"));
    assert_eq!(node.get("_CLASS"), Some(&Value::from("City")));
    assert_eq!(node.props.keys().next().map(String::as_str), Some("_CLASS"));
    assert_eq!(schema.class_of_data_node(id).unwrap(), "City");
}

#[test]
fn strict_class_rejects_undeclared_properties() {
    let schema = cities();
    let err = schema
        .create_data_node(
            "City",
            &props([("name", "Berkeley"), ("mayor", "Arreguín")]),
            &CreateOptions::default(),
        )
        .unwrap_err();
    assert_eq!(err.code(), "SchemaViolation");
    assert_eq!(schema.count_data_nodes_of_class("City").unwrap(), 0);

    let id = schema
        .create_data_node(
            "City",
            &props([("name", "Berkeley"), ("mayor", "Arreguín")]),
            &CreateOptions {
                silently_drop: true,
                ..CreateOptions::default()
            },
        )
        .unwrap();
    assert!(schema.store().node(id).unwrap().get("mayor").is_none());
}

#[test]
fn class_reference_cannot_be_supplied() {
    let schema = cities();
    let err = schema
        .create_data_node(
            "City",
            &props([("_CLASS", "State")]),
            &CreateOptions::default(),
        )
        .unwrap_err();
    assert_eq!(err.code(), "ArgumentError");
}

#[test]
fn extra_labels_and_uri() {
    let schema = cities();
    schema.create_namespace("cities", Some("city-"), None).unwrap();
    let id = schema
        .create_data_node(
            "City",
            &props([("name", "Oakland")]),
            &CreateOptions {
                extra_labels: vec!["Place".into()],
                uri_namespace: Some("cities".into()),
                ..CreateOptions::default()
            },
        )
        .unwrap();

    let node = schema.store().node(id).unwrap();
    assert!(node.has_label("Place"));
    assert_eq!(node.get("uri"), Some(&Value::from("city-1")));
    let found = schema
        .get_data_node(&DataNodeFilter::Uri("city-1".into()))
        .unwrap()
        .unwrap();
    assert_eq!(found.id, id);
}

#[test]
fn unknown_class_is_reported() {
    let schema = cities();
    let err = schema
        .create_data_node("Town", &props([("name", "x")]), &CreateOptions::default())
        .unwrap_err();
    assert!(matches!(err, SchemaError::UnknownClass(name) if name == "Town"));
}

#[test]
fn merge_reuses_identical_nodes_only() {
    let schema = cities();
    let berkeley = props([("name", "Berkeley")]);
    let (first, status) = schema.add_data_node_merge("City", &berkeley).unwrap();
    assert_eq!(status, MergeStatus::Created);

    let (again, status) = schema.add_data_node_merge("City", &berkeley).unwrap();
    assert_eq!(status, MergeStatus::Existing);
    assert_eq!(again, first);

    let richer = props([("name", Value::from("Berkeley")), ("pop", Value::from(1))]);
    let (other, status) = schema.add_data_node_merge("City", &richer).unwrap();
    assert_eq!(status, MergeStatus::Created);
    assert_ne!(other, first);
    assert_eq!(schema.count_data_nodes_of_class("City").unwrap(), 2);
}

#[test]
fn update_counts_every_write_and_drops_blanks() {
    let schema = cities();
    let id = city(&schema, "Berkeley", 120_000);

    let written = schema
        .update_data_node(
            id,
            &props([("name", Value::from("Berkeley")), ("pop", Value::from(121_000))]),
            false,
        )
        .unwrap();
    assert_eq!(written, 2);

    schema
        .update_data_node(id, &props([("pop", "  ")]), true)
        .unwrap();
    let node = schema.store().node(id).unwrap();
    assert!(node.get("pop").is_none());
    assert_eq!(node.get("name"), Some(&Value::from("Berkeley")));

    let err = schema
        .update_data_node(id, &props([("mayor", "x")]), false)
        .unwrap_err();
    assert_eq!(err.code(), "SchemaViolation");
    let err = schema
        .update_data_node(id, &props([("_CLASS", "State")]), false)
        .unwrap_err();
    assert_eq!(err.code(), "ArgumentError");
}

#[test]
fn lookups_by_filter() {
    let schema = cities();
    let berkeley = city(&schema, "Berkeley", 120_000);
    city(&schema, "Oakland", 430_000);

    assert!(schema
        .data_node_exists(&DataNodeFilter::Key("name".into(), "Oakland".into()))
        .unwrap());
    assert!(!schema
        .data_node_exists(&DataNodeFilter::Key("name".into(), "Fresno".into()))
        .unwrap());
    assert_eq!(
        schema
            .find_data_nodes(&DataNodeFilter::Class("City".into()))
            .unwrap()
            .len(),
        2
    );
    assert_eq!(
        schema
            .get_data_node(&DataNodeFilter::Id(berkeley))
            .unwrap()
            .map(|n| n.id),
        Some(berkeley)
    );
    let err = schema
        .get_data_node(&DataNodeFilter::Class("City".into()))
        .unwrap_err();
    assert_eq!(err.code(), "IntegrityConflict");

    let big = MatchSpec::builder()
        .label("City")
        .filter(|p| {
            p.gt("pop", 200_000);
        })
        .build()
        .unwrap();
    let found = schema
        .find_data_nodes(&DataNodeFilter::Matching(big))
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("name"), Some(&Value::from("Oakland")));

    let hits = schema
        .search_data_nodes("City", &props([("name", "Berkeley")]))
        .unwrap();
    assert_eq!(hits.len(), 1);
}

#[test]
fn class_nodes_are_not_data_nodes() {
    let schema = cities();
    let class = schema.get_class_id("City").unwrap();
    assert_eq!(
        schema.class_of_data_node(class).unwrap_err().code(),
        "UnknownNode"
    );
    assert!(!schema
        .data_node_exists(&DataNodeFilter::Key("name".into(), "City".into()))
        .unwrap());
}

#[test]
fn node_with_several_class_references_is_rejected() {
    let schema = cities();
    let node = schema
        .store()
        .execute(Statement::CreateNode {
            labels: vec!["City".into(), "State".into()],
            props: props([("_CLASS", Value::from(vec!["City", "State"]))]),
        })
        .unwrap()
        .into_nodes()
        .remove(0);

    let err = schema.class_of_data_node(node.id).unwrap_err();
    assert_eq!(err.code(), "IntegrityConflict");
}

#[test]
fn data_node_filters_never_reach_schema_nodes() {
    let schema = cities();
    city(&schema, "Berkeley", 120_000);
    let class = schema.get_class_id("City").unwrap();
    let property = schema
        .store()
        .find_nodes(MatchSpec::label("PROPERTY").unwrap())
        .unwrap()[0]
        .id;
    let counter = schema
        .store()
        .find_nodes(MatchSpec::label("NAMESPACE").unwrap())
        .unwrap()[0]
        .id;

    for id in [class, property, counter] {
        assert_eq!(schema.delete_data_nodes(&DataNodeFilter::Id(id)).unwrap(), 0);
        assert!(!schema.delete_data_node(id).unwrap());
        assert!(schema.get_data_node(&DataNodeFilter::Id(id)).unwrap().is_none());
        assert!(!schema.data_node_exists(&DataNodeFilter::Id(id)).unwrap());
    }
    let every_class = MatchSpec::label("CLASS").unwrap();
    assert_eq!(
        schema
            .delete_data_nodes(&DataNodeFilter::Matching(every_class))
            .unwrap(),
        0
    );

    assert!(schema.class_exists("City").unwrap());
    assert_eq!(schema.count_data_nodes_of_class("City").unwrap(), 1);
    assert_eq!(
        schema.delete_class("City", true).unwrap_err().code(),
        "ClassInUse"
    );
    assert_eq!(schema.list_classes().unwrap().len(), 2);
    assert_eq!(
        schema.get_class_uri("State").unwrap().as_deref(),
        Some("schema-2")
    );
    let region = schema.create_class("Region", false).unwrap();
    assert_eq!(
        schema.get_class_uri(region).unwrap().as_deref(),
        Some("schema-3")
    );
}

#[test]
fn delete_removes_nodes_and_relationships() {
    let schema = cities();
    let berkeley = city(&schema, "Berkeley", 120_000);
    let ca = schema
        .create_data_node("State", &props([("name", "California")]), &CreateOptions::default())
        .unwrap();
    let before = schema.store().edge_count();
    schema
        .add_data_relationship(berkeley, ca, "IS_IN", &PropertyMap::new())
        .unwrap();
    assert_eq!(schema.store().edge_count(), before + 1);

    assert!(schema.delete_data_node(berkeley).unwrap());
    assert!(!schema.delete_data_node(berkeley).unwrap());
    assert_eq!(schema.store().edge_count(), before);
    assert_eq!(
        schema
            .delete_data_nodes(&DataNodeFilter::Key("name".into(), "Nowhere".into()))
            .unwrap(),
        0
    );
}

#[test]
fn data_relationships_follow_declarations() {
    let schema = cities();
    let berkeley = city(&schema, "Berkeley", 120_000);
    let ca = schema
        .create_data_node("State", &props([("name", "California")]), &CreateOptions::default())
        .unwrap();
    let no_props = PropertyMap::new();

    let err = schema
        .add_data_relationship(ca, berkeley, "IS_IN", &no_props)
        .unwrap_err();
    assert_eq!(err.code(), "SchemaViolation");
    let err = schema
        .add_data_relationship(berkeley, ca, "NEAR", &no_props)
        .unwrap_err();
    assert_eq!(err.code(), "SchemaViolation");

    schema
        .add_data_relationship(berkeley, ca, "IS_IN", &props([("since", 1850)]))
        .unwrap();
    assert_eq!(
        schema
            .remove_data_relationship(berkeley, ca, "IS_IN")
            .unwrap(),
        1
    );
    assert_eq!(
        schema
            .remove_data_relationship(berkeley, ca, "IS_IN")
            .unwrap(),
        0
    );
}

#[test]
fn relationships_are_inherited() {
    let schema = cities();
    schema
        .create_class_with_properties("Capital", ["name"], true)
        .unwrap();
    schema.add_ancestor("Capital", "City").unwrap();
    let sacramento = schema
        .create_data_node("Capital", &props([("name", "Sacramento")]), &CreateOptions::default())
        .unwrap();
    let ca = schema
        .create_data_node("State", &props([("name", "California")]), &CreateOptions::default())
        .unwrap();
    schema
        .add_data_relationship(sacramento, ca, "IS_IN", &PropertyMap::new())
        .unwrap();
}

#[test]
fn compensate_deletes_listed_nodes() {
    let schema = cities();
    let ids = vec![city(&schema, "A", 1), city(&schema, "B", 2)];
    assert_eq!(schema.compensate(&ids).unwrap(), 2);
    assert_eq!(schema.count_data_nodes_of_class("City").unwrap(), 0);
    assert_eq!(schema.compensate(&ids).unwrap(), 0);
}
