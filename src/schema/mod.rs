#![forbid(unsafe_code)]

//! The schema engine.
//!
//! [`Schema`] is the context object every operation goes through. It owns a
//! [`GraphStore`], the [`SchemaOptions`] naming the persisted layout, and a
//! per-instance [`SchemaCache`]. There is no global state: callers create one
//! `Schema` per request, test, or process and drop it when done.
//!
//! The operations are split by concern:
//! - `class`: the Class Registry (Classes, Properties, Class relationships).
//! - `property`: the Property Resolver (inheritance and strictness).
//! - `data_node`: the Data Node Manager.
//! - `crate::import`: tree and tabular importers.
//! - `crate::namespace`: the Namespace Allocator.
//!
//! Persisted layout (labels and relationship types come from
//! [`SchemaOptions`]):
//!
//! ```text
//! (:CLASS {name, uri, strict, code?, no_datanodes?})
//!     -[:HAS_PROPERTY]-> (:PROPERTY {name, index, dtype?, system?})
//!     -[:INSTANCE_OF]-> (:CLASS)                 ancestry
//!     -[:<rel>]-> (:CLASS)                       plain relationship
//!     -[:<rel>]-> (:LINK {name}) -[:<rel>]-> (:CLASS)
//!                  (:LINK) -[:HAS_PROPERTY]-> (:PROPERTY)
//! (:<ClassName>:<extra labels> {_CLASS: <ClassName>, uri?, ...})   data node
//! ```

mod cache;
mod class;
mod data_node;
mod property;

use std::fmt;

use parking_lot::Mutex;
use serde::Serialize;

use crate::config::SchemaOptions;
use crate::error::{Result, SchemaError};
use crate::store::{GraphStore, NodeRecord, QueryOutput, Statement};
use crate::types::{NodeId, Value};

pub use cache::{CacheStats, SchemaCache};
pub use class::ClassOptions;
pub use data_node::{CreateOptions, DataNodeFilter, MergeStatus};
pub use property::SortOrder;

/// Identifies a Class by name or by internal identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClassRef {
    /// Internal identity of the Class node.
    Id(NodeId),
    /// Class name.
    Name(String),
}

impl fmt::Display for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassRef::Id(id) => write!(f, "#{id}"),
            ClassRef::Name(name) => f.write_str(name),
        }
    }
}

impl From<NodeId> for ClassRef {
    fn from(id: NodeId) -> Self {
        ClassRef::Id(id)
    }
}

impl From<&str> for ClassRef {
    fn from(name: &str) -> Self {
        ClassRef::Name(name.to_string())
    }
}

impl From<String> for ClassRef {
    fn from(name: String) -> Self {
        ClassRef::Name(name)
    }
}

impl From<&String> for ClassRef {
    fn from(name: &String) -> Self {
        ClassRef::Name(name.clone())
    }
}

impl From<&ClassRef> for ClassRef {
    fn from(class: &ClassRef) -> Self {
        class.clone()
    }
}

/// Attributes stored on a Class node.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassAttributes {
    /// Internal identity.
    pub id: NodeId,
    /// Unique name.
    pub name: String,
    /// External identifier reserved at creation.
    pub uri: Option<String>,
    /// Strictness flag; `None` when the stored node lacks a boolean flag.
    pub strict: Option<bool>,
    /// Optional short code.
    pub code: Option<String>,
    /// Forbids instantiation when set.
    pub no_datanodes: bool,
}

impl ClassAttributes {
    /// Effective strictness. A missing flag counts as lax.
    pub fn is_strict(&self) -> bool {
        self.strict.unwrap_or(false)
    }
}

/// Declaration of a Property when adding it to a Class.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PropertyDef {
    /// Property name; may contain spaces.
    pub name: String,
    /// Optional data-type tag.
    pub dtype: Option<String>,
    /// System properties can be hidden from listings.
    pub system: bool,
}

impl PropertyDef {
    /// A plain property.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the data-type tag.
    pub fn dtype(mut self, dtype: impl Into<String>) -> Self {
        self.dtype = Some(dtype.into());
        self
    }

    /// Marks the property as a system property.
    pub fn system(mut self) -> Self {
        self.system = true;
        self
    }
}

impl From<&str> for PropertyDef {
    fn from(name: &str) -> Self {
        PropertyDef::new(name)
    }
}

impl From<String> for PropertyDef {
    fn from(name: String) -> Self {
        PropertyDef::new(name)
    }
}

impl From<&String> for PropertyDef {
    fn from(name: &String) -> Self {
        PropertyDef::new(name.clone())
    }
}

/// A Property node as stored.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PropertyInfo {
    /// Internal identity of the Property node.
    pub id: NodeId,
    /// Property name.
    pub name: String,
    /// Position within the owning Class.
    pub index: i64,
    /// Optional data-type tag.
    pub dtype: Option<String>,
    /// System flag.
    pub system: bool,
}

/// An outbound relationship declared on a Class.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassLink {
    /// Relationship name.
    pub name: String,
    /// Target Class identity.
    pub target: NodeId,
    /// Target Class name.
    pub target_name: String,
    /// Intermediate Link node, when the relationship carries properties.
    pub link_node: Option<NodeId>,
}

/// Schema engine context. See the module docs.
pub struct Schema<S> {
    store: S,
    options: SchemaOptions,
    cache: Mutex<SchemaCache>,
}

impl<S: GraphStore> Schema<S> {
    /// Creates an engine over `store` with the default layout.
    pub fn new(store: S) -> Self {
        Self::with_options(store, SchemaOptions::default())
    }

    /// Creates an engine over `store` with a custom layout.
    pub fn with_options(store: S, options: SchemaOptions) -> Self {
        Self {
            store,
            options,
            cache: Mutex::new(SchemaCache::default()),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The layout options.
    pub fn options(&self) -> &SchemaOptions {
        &self.options
    }

    /// Drops every memoized Class lookup.
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    /// Cache hit/miss counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    /// Deletes the given nodes and their relationships; returns the count
    /// deleted. Intended for cleaning up after a
    /// [`SchemaError::PartialImport`].
    pub fn compensate(&self, ids: &[NodeId]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let statements = ids
            .iter()
            .map(|id| Statement::DeleteNodes {
                spec: crate::query::MatchSpec::id(*id),
            })
            .collect();
        let out = self.run(Statement::Batch(statements))?;
        tracing::info!(
            requested = ids.len(),
            deleted = out.stats.nodes_deleted,
            "schema.compensate"
        );
        Ok(out.stats.nodes_deleted)
    }

    pub(crate) fn run(&self, statement: Statement) -> Result<QueryOutput> {
        self.store.execute(statement)
    }

    pub(crate) fn fetch_node(&self, id: NodeId) -> Result<Option<NodeRecord>> {
        Ok(self
            .store
            .find_nodes(crate::query::MatchSpec::id(id))?
            .into_iter()
            .next())
    }
}

pub(crate) fn require_name(what: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        Err(SchemaError::argument(format!("{what} cannot be blank")))
    } else {
        Ok(())
    }
}

pub(crate) fn string_prop(node: &NodeRecord, key: &str) -> Option<String> {
    node.get(key).and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn bool_prop(node: &NodeRecord, key: &str) -> Option<bool> {
    node.get(key).and_then(Value::as_bool)
}
