#![allow(missing_docs)]

use classgraph::{
    props, store::EdgePattern, DataNodeFilter, DuplicatePolicy, GraphStore, LinkEnd,
    LinkImportOptions, MemoryGraph, NodeImportOptions, Schema, Table, Value,
};
use tempfile::TempDir;

fn geography() -> Schema<MemoryGraph> {
    let schema = Schema::new(MemoryGraph::new());
    schema
        .create_class_with_properties("City", ["city_id", "name"], true)
        .unwrap();
    schema
        .create_class_with_properties("State", ["state_id", "name", "code"], true)
        .unwrap();
    schema
        .create_class_relationship("City", "State", "IS_IN")
        .unwrap();

    let cities = Table::from_columns([
        ("city_id", vec![Value::from(1), 2.into(), 3.into(), 4.into()]),
        (
            "name",
            vec![
                "Berkeley".into(),
                "Chicago".into(),
                "Oakland".into(),
                "Austin".into(),
            ],
        ),
    ])
    .unwrap();
    let states = Table::from_columns([
        ("state_id", vec![Value::from(1), 2.into(), 3.into()]),
        ("name", vec!["California".into(), "Illinois".into(), "Texas".into()]),
        ("code", vec!["CA".into(), "IL".into(), "TX".into()]),
    ])
    .unwrap();
    let options = NodeImportOptions::keyed("city_id", DuplicatePolicy::Merge);
    assert_eq!(schema.import_nodes("City", &cities, &options).unwrap().created, 4);
    let options = NodeImportOptions::keyed("state_id", DuplicatePolicy::Merge);
    assert_eq!(schema.import_nodes("State", &states, &options).unwrap().created, 3);
    schema
}

fn link_table() -> Table {
    Table::from_columns([
        ("city_id", vec![Value::from(1), 3.into(), 2.into(), 4.into()]),
        ("state_id", vec![Value::from(1), 1.into(), 2.into(), 3.into()]),
    ])
    .unwrap()
}

fn is_in() -> LinkImportOptions {
    LinkImportOptions::new(
        LinkEnd::new("City", "city_id"),
        LinkEnd::new("State", "state_id"),
        "IS_IN",
    )
}

fn state_of(schema: &Schema<MemoryGraph>, city: &str) -> String {
    let node = schema
        .get_data_node(&DataNodeFilter::Key("name".into(), city.into()))
        .unwrap()
        .unwrap();
    let edges = schema
        .store()
        .find_edges(EdgePattern::outbound(node.id, Some("IS_IN")))
        .unwrap();
    assert_eq!(edges.len(), 1, "{city} should be in exactly one state");
    let state = schema.store().node(edges[0].dst).unwrap();
    state.get("code").and_then(Value::as_str).unwrap().to_string()
}

#[test]
fn cities_are_linked_to_their_states() {
    let schema = geography();
    let report = schema.import_links(&link_table(), &is_in()).unwrap();
    assert_eq!(report.created, 4);
    assert_eq!(report.skipped, 0);

    assert_eq!(state_of(&schema, "Berkeley"), "CA");
    assert_eq!(state_of(&schema, "Oakland"), "CA");
    assert_eq!(state_of(&schema, "Chicago"), "IL");
    assert_eq!(state_of(&schema, "Austin"), "TX");
}

#[test]
fn reverse_direction_is_not_declared() {
    let schema = geography();
    let reversed = LinkImportOptions::new(
        LinkEnd::new("State", "state_id"),
        LinkEnd::new("City", "city_id"),
        "IS_IN",
    );
    let err = schema.import_links(&link_table(), &reversed).unwrap_err();
    assert_eq!(err.code(), "SchemaViolation");
}

#[test]
fn renamed_class_keeps_relationships() {
    let schema = geography();
    schema.import_links(&link_table(), &is_in()).unwrap();
    schema.rename_class("City", "Town").unwrap();

    assert!(schema
        .class_relationship_allowed("Town", "State", "IS_IN")
        .unwrap());
    assert_eq!(schema.count_data_nodes_of_class("Town").unwrap(), 4);
    assert_eq!(state_of(&schema, "Austin"), "TX");
}

#[test]
fn snapshot_survives_reopen() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("geo.json");
    {
        let schema = geography();
        schema.import_links(&link_table(), &is_in()).unwrap();
        schema.store().persist(&path).unwrap();
    }

    let schema = Schema::new(MemoryGraph::open(&path).unwrap());
    assert_eq!(schema.list_classes().unwrap().len(), 2);
    assert_eq!(state_of(&schema, "Oakland"), "CA");

    let sf = schema
        .create_data_node(
            "City",
            &props([("city_id", Value::from(5)), ("name", "San Francisco".into())]),
            &Default::default(),
        )
        .unwrap();
    let ca = schema
        .get_data_node(&DataNodeFilter::Key("code".into(), "CA".into()))
        .unwrap()
        .unwrap();
    schema
        .add_data_relationship(sf, ca.id, "IS_IN", &Default::default())
        .unwrap();
    assert_eq!(state_of(&schema, "San Francisco"), "CA");
    assert_eq!(
        schema.get_class_uri("State").unwrap().as_deref(),
        Some("schema-2")
    );
}
