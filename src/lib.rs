//! Typed, inheritance-aware schema layer over a schema-less property graph.
//!
//! The crate imposes Classes, Properties, and typed relationships on a
//! property graph and uses them to validate, create, update, import, and
//! delete data nodes. Storage is reached only through the [`GraphStore`]
//! trait; [`MemoryGraph`] is the bundled in-process implementation and
//! [`store::cypher`] renders statements for an external Cypher service.
//!
//! ```
//! use classgraph::{props, CreateOptions, MemoryGraph, Schema};
//!
//! let schema = Schema::new(MemoryGraph::new());
//! schema.create_class_with_properties("City", ["name", "pop"], true)?;
//! let id = schema.create_data_node(
//!     "City",
//!     &props([("name", "Berkeley")]),
//!     &CreateOptions::default(),
//! )?;
//! assert_eq!(schema.class_of_data_node(id)?, "City");
//! # Ok::<(), classgraph::SchemaError>(())
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod import;
pub mod logging;
pub mod namespace;
pub mod query;
pub mod schema;
pub mod store;
pub mod types;

pub use config::{Config, ConfigError, SchemaOptions};
pub use error::{Result, SchemaError, SchemaErrorWithCode};
pub use import::{
    LinkEnd, LinkImportOptions, LinkImportReport, NodeImportOptions, NodeImportReport, Table,
    TreeImportOptions,
};
pub use namespace::{Allocation, NamespaceInfo};
pub use query::{MatchSpec, MatchSpecBuilder};
pub use schema::{
    ClassAttributes, ClassLink, ClassOptions, ClassRef, CreateOptions, DataNodeFilter,
    MergeStatus, PropertyDef, PropertyInfo, Schema, SortOrder,
};
pub use store::{
    DuplicatePolicy, GraphStore, MemoryGraph, NodeRecord, QueryOutput, Statement, WriteStats,
};
pub use types::{props, EdgeId, NodeId, PropertyMap, Value};
