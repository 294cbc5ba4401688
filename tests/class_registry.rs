#![allow(missing_docs)]

use classgraph::{
    props, ClassOptions, CreateOptions, GraphStore, MatchSpec, MemoryGraph, Schema, SchemaError,
};

fn schema() -> Schema<MemoryGraph> {
    Schema::new(MemoryGraph::new())
}

#[test]
fn create_class_reserves_schema_uri() {
    let schema = schema();
    let city = schema.create_class("City", true).unwrap();
    let state = schema.create_class("State", false).unwrap();

    let city = schema.get_class(city).unwrap();
    assert_eq!(city.name, "City");
    assert_eq!(city.uri.as_deref(), Some("schema-1"));
    assert!(city.is_strict());
    assert_eq!(schema.get_class_uri(state).unwrap().as_deref(), Some("schema-2"));
    assert!(!schema.get_class("State").unwrap().is_strict());
}

#[test]
fn duplicate_and_blank_names_are_rejected() {
    let schema = schema();
    schema.create_class("City", false).unwrap();

    let err = schema.create_class("City", true).unwrap_err();
    assert_eq!(err.code(), "IntegrityConflict");
    let err = schema.create_class("  ", false).unwrap_err();
    assert_eq!(err.code(), "ArgumentError");
    assert_eq!(schema.list_classes().unwrap().len(), 1);
}

#[test]
fn unknown_class_lookups_fail() {
    let schema = schema();
    assert!(!schema.class_exists("Ghost").unwrap());
    assert!(matches!(
        schema.get_class("Ghost"),
        Err(SchemaError::UnknownClass(_))
    ));
    assert_eq!(
        schema.get_class_id("Ghost").unwrap_err().code(),
        "UnknownClass"
    );
}

#[test]
fn list_classes_is_sorted_by_name() {
    let schema = schema();
    for name in ["Vehicle", "City", "Person"] {
        schema.create_class(name, false).unwrap();
    }
    let names: Vec<String> = schema
        .list_classes()
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, ["City", "Person", "Vehicle"]);
}

#[test]
fn set_strict_toggles_policy() {
    let schema = schema();
    schema
        .create_class_with_properties("City", ["name"], false)
        .unwrap();
    assert!(schema.is_property_allowed("pop", "City").unwrap());

    schema.set_strict("City", true).unwrap();
    assert!(!schema.is_property_allowed("pop", "City").unwrap());
    assert!(schema.is_property_allowed("name", "City").unwrap());
}

#[test]
fn properties_append_after_existing_positions() {
    let schema = schema();
    schema
        .create_class_with_properties("Car", ["VID", "make"], true)
        .unwrap();
    assert_eq!(schema.add_properties_to_class("Car", ["year"]).unwrap(), 1);

    let info = schema.get_class_property_info("Car").unwrap();
    let positions: Vec<(String, i64)> = info.into_iter().map(|p| (p.name, p.index)).collect();
    assert_eq!(
        positions,
        [("VID".into(), 0), ("make".into(), 1), ("year".into(), 2)]
    );

    let err = schema.add_properties_to_class("Car", ["make"]).unwrap_err();
    assert_eq!(err.code(), "IntegrityConflict");
}

#[test]
fn remove_property_from_class() {
    let schema = schema();
    schema
        .create_class_with_properties("Car", ["VID", "make"], true)
        .unwrap();
    assert!(schema.remove_property_from_class("Car", "make").unwrap());
    assert!(!schema.remove_property_from_class("Car", "make").unwrap());
    assert!(!schema.is_property_allowed("make", "Car").unwrap());
}

#[test]
fn relationships_are_declared_once() {
    let schema = schema();
    schema.create_class("City", false).unwrap();
    schema.create_class("State", false).unwrap();
    schema
        .create_class_relationship("City", "State", "IS_IN")
        .unwrap();

    assert!(schema
        .class_relationship_exists("City", "State", "IS_IN")
        .unwrap());
    assert!(!schema
        .class_relationship_exists("State", "City", "IS_IN")
        .unwrap());
    let err = schema
        .create_class_relationship("City", "State", "IS_IN")
        .unwrap_err();
    assert_eq!(err.code(), "IntegrityConflict");

    let links = schema.get_class_relationships("City").unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].target_name, "State");
    assert_eq!(links[0].link_node, None);
}

#[test]
fn reserved_relationship_name_is_rejected() {
    let schema = schema();
    schema.create_class("A", false).unwrap();
    schema.create_class("B", false).unwrap();
    let err = schema
        .create_class_relationship("A", "B", "HAS_PROPERTY")
        .unwrap_err();
    assert_eq!(err.code(), "ArgumentError");
}

#[test]
fn relationship_with_properties_uses_link_node() {
    let schema = schema();
    schema.create_class("Person", false).unwrap();
    schema.create_class("Company", false).unwrap();
    let link = schema
        .create_class_relationship_with_properties("Person", "Company", "EMPLOYED_BY", ["since"])
        .unwrap();

    let links = schema.get_class_relationships("Person").unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].name, "EMPLOYED_BY");
    assert_eq!(links[0].target_name, "Company");
    assert_eq!(links[0].link_node, Some(link));
    assert!(schema
        .class_relationship_allowed("Person", "Company", "EMPLOYED_BY")
        .unwrap());

    assert_eq!(
        schema
            .delete_class_relationship("Person", "Company", "EMPLOYED_BY")
            .unwrap(),
        1
    );
    assert!(schema.get_class_relationships("Person").unwrap().is_empty());
    assert!(schema.store().node(link).is_none());
}

#[test]
fn relationship_allowed_through_ancestry() {
    let schema = schema();
    for name in ["Vehicle", "Car", "Person", "Driver"] {
        schema.create_class(name, false).unwrap();
    }
    schema.add_ancestor("Car", "Vehicle").unwrap();
    schema.add_ancestor("Driver", "Person").unwrap();
    schema
        .create_class_relationship("Person", "Vehicle", "OWNS")
        .unwrap();

    assert!(schema
        .class_relationship_allowed("Driver", "Car", "OWNS")
        .unwrap());
    assert!(!schema
        .class_relationship_allowed("Car", "Driver", "OWNS")
        .unwrap());
    assert_eq!(
        schema.relationship_target("Driver", "OWNS").unwrap().name,
        "Vehicle"
    );
    assert_eq!(
        schema.relationship_target("Car", "OWNS").unwrap_err().code(),
        "SchemaViolation"
    );
}

#[test]
fn rename_class_moves_data_nodes() {
    let schema = schema();
    schema
        .create_class_with_properties("Town", ["name"], true)
        .unwrap();
    for name in ["Berkeley", "Oakland"] {
        schema
            .create_data_node("Town", &props([("name", name)]), &CreateOptions::default())
            .unwrap();
    }

    assert_eq!(schema.rename_class("Town", "City").unwrap(), 2);
    assert!(!schema.class_exists("Town").unwrap());
    assert_eq!(schema.count_data_nodes_of_class("City").unwrap(), 2);
    let stale = schema
        .store()
        .find_nodes(MatchSpec::label("Town").unwrap())
        .unwrap();
    assert!(stale.is_empty());
    for node in schema.get_class_instances("City").unwrap() {
        assert_eq!(schema.class_of_data_node(node.id).unwrap(), "City");
    }
}

#[test]
fn rename_without_data_nodes_touches_nothing() {
    let schema = schema();
    schema.create_class_with_properties("Town", ["name"], true).unwrap();

    assert_eq!(schema.rename_class("Town", "Village").unwrap(), 0);
    assert!(schema.class_exists("Village").unwrap());
    assert!(!schema.class_exists("Town").unwrap());
    assert_eq!(
        schema.get_class_properties("Village", false, Default::default(), false).unwrap(),
        ["name"]
    );
}

#[test]
fn rename_to_existing_name_conflicts() {
    let schema = schema();
    schema.create_class("A", false).unwrap();
    schema.create_class("B", false).unwrap();
    assert_eq!(
        schema.rename_class("A", "B").unwrap_err().code(),
        "IntegrityConflict"
    );
}

#[test]
fn safe_delete_refuses_classes_in_use() {
    let schema = schema();
    schema
        .create_class_with_properties("City", ["name"], false)
        .unwrap();
    let node = schema
        .create_data_node("City", &props([("name", "Berkeley")]), &CreateOptions::default())
        .unwrap();

    match schema.delete_class("City", true) {
        Err(SchemaError::ClassInUse { class, count }) => {
            assert_eq!(class, "City");
            assert_eq!(count, 1);
        }
        other => panic!("expected ClassInUse, got {other:?}"),
    }

    assert_eq!(schema.delete_class("City", false).unwrap(), 1);
    assert!(!schema.class_exists("City").unwrap());
    assert!(schema.store().node(node).is_some());
    let props = schema
        .store()
        .find_nodes(MatchSpec::label("PROPERTY").unwrap())
        .unwrap();
    assert!(props.is_empty());
}

#[test]
fn classes_without_data_nodes_refuse_instances() {
    let schema = schema();
    schema
        .create_class_with_options(
            "Abstract",
            &ClassOptions {
                no_datanodes: true,
                code: Some("ABS".into()),
                ..ClassOptions::default()
            },
        )
        .unwrap();
    let attrs = schema.get_class("Abstract").unwrap();
    assert_eq!(attrs.code.as_deref(), Some("ABS"));

    let err = schema
        .create_data_node("Abstract", &props([("x", 1)]), &CreateOptions::default())
        .unwrap_err();
    assert_eq!(err.code(), "SchemaViolation");
}

#[test]
fn cache_is_invalidated_by_schema_writes() {
    let schema = schema();
    schema
        .create_class_with_properties("City", ["name"], true)
        .unwrap();
    assert!(!schema.is_property_allowed("pop", "City").unwrap());
    assert!(!schema.is_property_allowed("pop", "City").unwrap());
    assert!(schema.cache_stats().hits > 0);

    schema.add_properties_to_class("City", ["pop"]).unwrap();
    assert!(schema.is_property_allowed("pop", "City").unwrap());
}
