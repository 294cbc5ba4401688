#![forbid(unsafe_code)]

//! Query execution contract between the schema engine and a graph store.
//!
//! The engine never talks to storage directly: it builds [`Statement`]s and
//! hands them to a [`GraphStore`]. Each statement is the unit of atomicity.
//! A store must apply a statement entirely or not at all, and concurrent
//! callers must never observe half of one. Nothing spans statements, so a
//! sequence of statements is only as atomic as the caller makes it.

/// Cypher rendering of statements for external Cypher services.
pub mod cypher;

/// In-process reference store.
pub mod memory;

use std::fmt;
use std::ops::AddAssign;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::query::MatchSpec;
use crate::types::{EdgeId, NodeId, PropertyMap, Value};

pub use memory::{MemoryGraph, Snapshot};

/// A node as returned by the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Internal identity.
    pub id: NodeId,
    /// Labels in insertion order.
    pub labels: Vec<String>,
    /// Properties in insertion order.
    #[serde(default)]
    pub props: PropertyMap,
}

impl NodeRecord {
    /// Property lookup.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }

    /// True if the node carries `label`.
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// A relationship as returned by the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Internal identity.
    pub id: EdgeId,
    /// Source node.
    pub src: NodeId,
    /// Destination node.
    pub dst: NodeId,
    /// Relationship type.
    pub rel_type: String,
    /// Relationship properties.
    #[serde(default)]
    pub props: PropertyMap,
}

/// How an existing node is treated when a keyed write finds it.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Leave the existing node untouched.
    Skip,
    /// Overlay the new properties; untouched properties survive.
    #[default]
    Merge,
    /// Overwrite the whole property set (reserved keys excepted).
    Replace,
}

impl FromStr for DuplicatePolicy {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(DuplicatePolicy::Skip),
            "merge" => Ok(DuplicatePolicy::Merge),
            "replace" => Ok(DuplicatePolicy::Replace),
            other => Err(SchemaError::argument(format!(
                "duplicate policy must be 'skip', 'merge', or 'replace' (got '{other}')"
            ))),
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DuplicatePolicy::Skip => "skip",
            DuplicatePolicy::Merge => "merge",
            DuplicatePolicy::Replace => "replace",
        })
    }
}

/// Field- and label-level changes applied to every matched node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeUpdate {
    /// Properties to set. A null value removes the key.
    pub set: PropertyMap,
    /// Properties to remove.
    pub remove: Vec<String>,
    /// Labels to add.
    pub add_labels: Vec<String>,
    /// Labels to remove.
    pub remove_labels: Vec<String>,
}

/// Relationship selector. Absent endpoints match any node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdgePattern {
    /// Source node constraint.
    pub from: Option<MatchSpec>,
    /// Destination node constraint.
    pub to: Option<MatchSpec>,
    /// Relationship type constraint.
    pub rel_type: Option<String>,
}

impl EdgePattern {
    /// Relationships of `rel_type` between the two given nodes.
    pub fn between(from: NodeId, to: NodeId, rel_type: impl Into<String>) -> Self {
        Self {
            from: Some(MatchSpec::id(from)),
            to: Some(MatchSpec::id(to)),
            rel_type: Some(rel_type.into()),
        }
    }

    /// Outbound relationships of a node, optionally of one type.
    pub fn outbound(from: NodeId, rel_type: Option<&str>) -> Self {
        Self {
            from: Some(MatchSpec::id(from)),
            to: None,
            rel_type: rel_type.map(str::to_string),
        }
    }

    /// Inbound relationships of a node, optionally of one type.
    pub fn inbound(to: NodeId, rel_type: Option<&str>) -> Self {
        Self {
            from: None,
            to: Some(MatchSpec::id(to)),
            rel_type: rel_type.map(str::to_string),
        }
    }
}

/// One atomic unit of work for a [`GraphStore`].
#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    /// Creates one node.
    CreateNode {
        /// Labels of the new node.
        labels: Vec<String>,
        /// Properties of the new node; null values are dropped.
        props: PropertyMap,
    },
    /// Returns matching nodes ordered by identity.
    MatchNodes {
        /// Node selector.
        spec: MatchSpec,
        /// Optional row cap.
        limit: Option<usize>,
    },
    /// Applies an update to every matching node; returns the updated nodes.
    UpdateNodes {
        /// Node selector.
        spec: MatchSpec,
        /// Changes to apply.
        update: NodeUpdate,
    },
    /// Deletes matching nodes along with their relationships.
    DeleteNodes {
        /// Node selector.
        spec: MatchSpec,
    },
    /// Returns the node whose labels include `labels` and whose property set
    /// equals `props` exactly, creating it if none exists.
    MergeNode {
        /// Labels of the node.
        labels: Vec<String>,
        /// Exact property set.
        props: PropertyMap,
    },
    /// Creates or updates the single node carrying `labels` whose `key`
    /// property equals `value`.
    UpsertNode {
        /// Labels of the node.
        labels: Vec<String>,
        /// Primary key property.
        key: String,
        /// Primary key value.
        value: Value,
        /// Properties to write.
        props: PropertyMap,
        /// Treatment of an existing node.
        policy: DuplicatePolicy,
        /// Properties that survive a [`DuplicatePolicy::Replace`].
        keep: Vec<String>,
    },
    /// Creates a relationship for every (from, to) pair of matching nodes.
    CreateEdges {
        /// Source selector.
        from: MatchSpec,
        /// Destination selector.
        to: MatchSpec,
        /// Relationship type.
        rel_type: String,
        /// Relationship properties.
        props: PropertyMap,
        /// Skip pairs already joined by a relationship of this type.
        unique: bool,
    },
    /// Returns matching relationships ordered by identity.
    MatchEdges {
        /// Relationship selector.
        pattern: EdgePattern,
    },
    /// Deletes matching relationships.
    DeleteEdges {
        /// Relationship selector.
        pattern: EdgePattern,
    },
    /// Reads an integer property of the single matching node and advances it
    /// by `by`; returns the node as it was before the increment.
    Increment {
        /// Node selector; must match at most one node.
        spec: MatchSpec,
        /// Integer property to advance.
        key: String,
        /// Increment, at least 1.
        by: i64,
    },
    /// Executes the statements in order as one atomic unit. Rows are
    /// concatenated and stats summed.
    Batch(Vec<Statement>),
}

impl Statement {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::CreateNode { .. } => "create_node",
            Statement::MatchNodes { .. } => "match_nodes",
            Statement::UpdateNodes { .. } => "update_nodes",
            Statement::DeleteNodes { .. } => "delete_nodes",
            Statement::MergeNode { .. } => "merge_node",
            Statement::UpsertNode { .. } => "upsert_node",
            Statement::CreateEdges { .. } => "create_edges",
            Statement::MatchEdges { .. } => "match_edges",
            Statement::DeleteEdges { .. } => "delete_edges",
            Statement::Increment { .. } => "increment",
            Statement::Batch(_) => "batch",
        }
    }

    /// True for statements that may mutate the graph.
    pub fn is_write(&self) -> bool {
        match self {
            Statement::MatchNodes { .. } | Statement::MatchEdges { .. } => false,
            Statement::Batch(items) => items.iter().any(Statement::is_write),
            _ => true,
        }
    }
}

/// Result of a keyed write.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    /// A new node was created.
    Created,
    /// An existing node was modified.
    Updated,
    /// An existing node was found and left unchanged.
    Existing,
}

impl UpsertOutcome {
    /// True when the node was written (created or updated).
    pub fn touched(self) -> bool {
        !matches!(self, UpsertOutcome::Existing)
    }
}

/// One result row.
#[derive(Clone, Debug, PartialEq)]
pub enum Row {
    /// A node.
    Node(NodeRecord),
    /// A relationship.
    Edge(EdgeRecord),
    /// A node returned by a keyed or merging write.
    Upserted {
        /// The node after the write.
        node: NodeRecord,
        /// What the write did.
        outcome: UpsertOutcome,
    },
}

impl Row {
    /// The node carried by the row, if any.
    pub fn node(&self) -> Option<&NodeRecord> {
        match self {
            Row::Node(node) | Row::Upserted { node, .. } => Some(node),
            Row::Edge(_) => None,
        }
    }
}

/// Write-effect counters reported by a store.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct WriteStats {
    /// Nodes created.
    pub nodes_created: usize,
    /// Nodes deleted.
    pub nodes_deleted: usize,
    /// Relationships created.
    pub relationships_created: usize,
    /// Relationships deleted.
    pub relationships_deleted: usize,
    /// Properties set or removed, counting writes of an unchanged value.
    pub properties_set: usize,
    /// Labels added.
    pub labels_added: usize,
    /// Labels removed.
    pub labels_removed: usize,
}

impl WriteStats {
    /// True when the statement changed nothing.
    pub fn is_empty(&self) -> bool {
        *self == WriteStats::default()
    }
}

impl AddAssign for WriteStats {
    fn add_assign(&mut self, rhs: Self) {
        self.nodes_created += rhs.nodes_created;
        self.nodes_deleted += rhs.nodes_deleted;
        self.relationships_created += rhs.relationships_created;
        self.relationships_deleted += rhs.relationships_deleted;
        self.properties_set += rhs.properties_set;
        self.labels_added += rhs.labels_added;
        self.labels_removed += rhs.labels_removed;
    }
}

/// Rows plus write counters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryOutput {
    /// Result rows in statement order.
    pub rows: Vec<Row>,
    /// Write-effect counters.
    pub stats: WriteStats,
}

impl QueryOutput {
    /// Iterates over the nodes carried by the rows.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.rows.iter().filter_map(Row::node)
    }

    /// Consumes the output, keeping node rows.
    pub fn into_nodes(self) -> Vec<NodeRecord> {
        self.rows
            .into_iter()
            .filter_map(|row| match row {
                Row::Node(node) | Row::Upserted { node, .. } => Some(node),
                Row::Edge(_) => None,
            })
            .collect()
    }

    /// Consumes the output, keeping relationship rows.
    pub fn into_edges(self) -> Vec<EdgeRecord> {
        self.rows
            .into_iter()
            .filter_map(|row| match row {
                Row::Edge(edge) => Some(edge),
                _ => None,
            })
            .collect()
    }
}

/// Query Execution Service: executes statements against a graph.
pub trait GraphStore: Send + Sync {
    /// Executes one statement atomically.
    fn execute(&self, statement: Statement) -> Result<QueryOutput>;

    /// Convenience read returning the nodes matched by `spec`.
    fn find_nodes(&self, spec: MatchSpec) -> Result<Vec<NodeRecord>> {
        Ok(self
            .execute(Statement::MatchNodes { spec, limit: None })?
            .into_nodes())
    }

    /// Convenience read returning the relationships matched by `pattern`.
    fn find_edges(&self, pattern: EdgePattern) -> Result<Vec<EdgeRecord>> {
        Ok(self
            .execute(Statement::MatchEdges { pattern })?
            .into_edges())
    }
}

impl<T: GraphStore + ?Sized> GraphStore for &T {
    fn execute(&self, statement: Statement) -> Result<QueryOutput> {
        (**self).execute(statement)
    }
}

impl<T: GraphStore + ?Sized> GraphStore for Arc<T> {
    fn execute(&self, statement: Statement) -> Result<QueryOutput> {
        (**self).execute(statement)
    }
}

impl<T: GraphStore + ?Sized> GraphStore for Box<T> {
    fn execute(&self, statement: Statement) -> Result<QueryOutput> {
        (**self).execute(statement)
    }
}
