#![forbid(unsafe_code)]

//! In-process graph store.
//!
//! `MemoryGraph` keeps nodes and relationships in ordered maps behind one
//! `parking_lot::RwLock`. Every statement runs under a single lock
//! acquisition, which is what makes it atomic: reads share the lock, writes
//! take it exclusively. A `Batch` is applied to a private copy of the state
//! and swapped in only if every member succeeds.
//!
//! The whole graph can be saved to and loaded from a JSON snapshot. Secondary
//! indexes (labels, adjacency) are not persisted; they are rebuilt on load.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::query::MatchSpec;
use crate::types::{EdgeId, NodeId, PropertyMap, Value};

use super::{
    DuplicatePolicy, EdgePattern, EdgeRecord, GraphStore, NodeRecord, NodeUpdate, QueryOutput,
    Row, Statement, UpsertOutcome, WriteStats,
};

/// Serialized form of a [`MemoryGraph`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Next node identity to hand out.
    pub next_node_id: u64,
    /// Next relationship identity to hand out.
    pub next_edge_id: u64,
    /// All nodes, ordered by identity.
    pub nodes: Vec<NodeRecord>,
    /// All relationships, ordered by identity.
    pub edges: Vec<EdgeRecord>,
}

#[derive(Clone, Debug, Default)]
struct GraphState {
    nodes: BTreeMap<NodeId, NodeRecord>,
    edges: BTreeMap<EdgeId, EdgeRecord>,
    by_label: FxHashMap<String, BTreeSet<NodeId>>,
    outgoing: FxHashMap<NodeId, BTreeSet<EdgeId>>,
    incoming: FxHashMap<NodeId, BTreeSet<EdgeId>>,
    next_node: u64,
    next_edge: u64,
}

/// Thread-safe in-memory graph implementing [`GraphStore`].
#[derive(Debug, Default)]
pub struct MemoryGraph {
    state: RwLock<GraphState>,
}

impl MemoryGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the snapshot at `path`, or starts empty if the file is absent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "store.memory.open.empty");
            return Ok(Self::new());
        }
        let reader = BufReader::new(File::open(path)?);
        let snapshot: Snapshot = serde_json::from_reader(reader)?;
        debug!(
            path = %path.display(),
            nodes = snapshot.nodes.len(),
            edges = snapshot.edges.len(),
            "store.memory.open.loaded"
        );
        Self::from_snapshot(snapshot)
    }

    /// Rebuilds a graph from a snapshot, validating relationship endpoints.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        let mut state = GraphState {
            next_node: snapshot.next_node_id.max(1),
            next_edge: snapshot.next_edge_id.max(1),
            ..GraphState::default()
        };
        for node in snapshot.nodes {
            if node.id.0 >= state.next_node {
                state.next_node = node.id.0 + 1;
            }
            state.index_node(&node);
            state.nodes.insert(node.id, node);
        }
        for edge in snapshot.edges {
            if !state.nodes.contains_key(&edge.src) || !state.nodes.contains_key(&edge.dst) {
                return Err(SchemaError::Store(format!(
                    "snapshot relationship {} references a missing node",
                    edge.id
                )));
            }
            if edge.id.0 >= state.next_edge {
                state.next_edge = edge.id.0 + 1;
            }
            state.index_edge(&edge);
            state.edges.insert(edge.id, edge);
        }
        Ok(Self {
            state: RwLock::new(state),
        })
    }

    /// Captures the current graph.
    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.read();
        Snapshot {
            next_node_id: state.next_node,
            next_edge_id: state.next_edge,
            nodes: state.nodes.values().cloned().collect(),
            edges: state.edges.values().cloned().collect(),
        }
    }

    /// Writes a snapshot to `path`, replacing any previous file.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let snapshot = self.snapshot();
        let tmp = path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(&mut writer, &snapshot)?;
            writer.flush()?;
        }
        fs::rename(&tmp, path)?;
        debug!(
            path = %path.display(),
            nodes = snapshot.nodes.len(),
            edges = snapshot.edges.len(),
            "store.memory.persist"
        );
        Ok(())
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.state.read().nodes.len()
    }

    /// Number of relationships.
    pub fn edge_count(&self) -> usize {
        self.state.read().edges.len()
    }

    /// Fetches one node by identity.
    pub fn node(&self, id: NodeId) -> Option<NodeRecord> {
        self.state.read().nodes.get(&id).cloned()
    }
}

impl GraphStore for MemoryGraph {
    fn execute(&self, statement: Statement) -> Result<QueryOutput> {
        let kind = statement.kind();
        let mut out = QueryOutput::default();
        if statement.is_write() {
            let mut state = self.state.write();
            state.apply(statement, &mut out)?;
        } else {
            let state = self.state.read();
            state.read(statement, &mut out)?;
        }
        debug!(
            statement = kind,
            rows = out.rows.len(),
            nodes_created = out.stats.nodes_created,
            properties_set = out.stats.properties_set,
            "store.memory.execute"
        );
        Ok(out)
    }
}

impl GraphState {
    fn index_node(&mut self, node: &NodeRecord) {
        for label in &node.labels {
            self.by_label.entry(label.clone()).or_default().insert(node.id);
        }
    }

    fn index_edge(&mut self, edge: &EdgeRecord) {
        self.outgoing.entry(edge.src).or_default().insert(edge.id);
        self.incoming.entry(edge.dst).or_default().insert(edge.id);
    }

    fn candidates(&self, spec: &MatchSpec) -> Vec<NodeId> {
        if let Some(id) = spec.node_id() {
            return if self.nodes.contains_key(&id) {
                vec![id]
            } else {
                Vec::new()
            };
        }
        let smallest = spec
            .labels()
            .iter()
            .map(|label| self.by_label.get(label))
            .min_by_key(|set| set.map_or(0, BTreeSet::len));
        match smallest {
            Some(Some(set)) => set.iter().copied().collect(),
            Some(None) => Vec::new(),
            None => self.nodes.keys().copied().collect(),
        }
    }

    fn match_nodes(&self, spec: &MatchSpec, limit: Option<usize>) -> Result<Vec<NodeId>> {
        let mut hits = Vec::new();
        for id in self.candidates(spec) {
            if limit.is_some_and(|cap| hits.len() >= cap) {
                break;
            }
            if let Some(node) = self.nodes.get(&id) {
                if spec.matches(id, &node.labels, &node.props)? {
                    hits.push(id);
                }
            }
        }
        Ok(hits)
    }

    fn match_edges(&self, pattern: &EdgePattern) -> Result<Vec<EdgeId>> {
        let from: Option<BTreeSet<NodeId>> = match &pattern.from {
            Some(spec) => Some(self.match_nodes(spec, None)?.into_iter().collect()),
            None => None,
        };
        let to: Option<BTreeSet<NodeId>> = match &pattern.to {
            Some(spec) => Some(self.match_nodes(spec, None)?.into_iter().collect()),
            None => None,
        };
        let pool: BTreeSet<EdgeId> = match (&from, &to) {
            (Some(src), _) => src
                .iter()
                .filter_map(|id| self.outgoing.get(id))
                .flatten()
                .copied()
                .collect(),
            (None, Some(dst)) => dst
                .iter()
                .filter_map(|id| self.incoming.get(id))
                .flatten()
                .copied()
                .collect(),
            (None, None) => self.edges.keys().copied().collect(),
        };
        Ok(pool
            .into_iter()
            .filter(|id| {
                self.edges.get(id).is_some_and(|edge| {
                    pattern
                        .rel_type
                        .as_deref()
                        .map_or(true, |t| edge.rel_type == t)
                        && from.as_ref().map_or(true, |s| s.contains(&edge.src))
                        && to.as_ref().map_or(true, |s| s.contains(&edge.dst))
                })
            })
            .collect())
    }

    fn node_record(&self, id: NodeId) -> Result<NodeRecord> {
        self.nodes
            .get(&id)
            .cloned()
            .ok_or_else(|| SchemaError::Store(format!("node {id} vanished during statement")))
    }

    fn read(&self, statement: Statement, out: &mut QueryOutput) -> Result<()> {
        match statement {
            Statement::MatchNodes { spec, limit } => {
                for id in self.match_nodes(&spec, limit)? {
                    out.rows.push(Row::Node(self.node_record(id)?));
                }
            }
            Statement::MatchEdges { pattern } => {
                for id in self.match_edges(&pattern)? {
                    if let Some(edge) = self.edges.get(&id) {
                        out.rows.push(Row::Edge(edge.clone()));
                    }
                }
            }
            Statement::Batch(items) => {
                for item in items {
                    self.read(item, out)?;
                }
            }
            other => {
                return Err(SchemaError::Store(format!(
                    "{} is not a read statement",
                    other.kind()
                )))
            }
        }
        Ok(())
    }

    fn apply(&mut self, statement: Statement, out: &mut QueryOutput) -> Result<()> {
        match statement {
            read @ (Statement::MatchNodes { .. } | Statement::MatchEdges { .. }) => {
                self.read(read, out)?
            }
            Statement::CreateNode { labels, props } => {
                let node = self.create_node(labels, props, &mut out.stats);
                out.rows.push(Row::Node(node));
            }
            Statement::UpdateNodes { spec, update } => {
                for id in self.match_nodes(&spec, None)? {
                    self.update_node(id, &update, &mut out.stats);
                    out.rows.push(Row::Node(self.node_record(id)?));
                }
            }
            Statement::DeleteNodes { spec } => {
                for id in self.match_nodes(&spec, None)? {
                    self.delete_node(id, &mut out.stats);
                }
            }
            Statement::MergeNode { labels, props } => {
                let props = strip_nulls(props);
                let spec = MatchSpec::builder().labels(labels.iter()).build()?;
                let existing = self
                    .match_nodes(&spec, None)?
                    .into_iter()
                    .find(|id| self.nodes.get(id).is_some_and(|n| n.props == props));
                let row = match existing {
                    Some(id) => Row::Upserted {
                        node: self.node_record(id)?,
                        outcome: UpsertOutcome::Existing,
                    },
                    None => Row::Upserted {
                        node: self.create_node(labels, props, &mut out.stats),
                        outcome: UpsertOutcome::Created,
                    },
                };
                out.rows.push(row);
            }
            Statement::UpsertNode {
                labels,
                key,
                value,
                props,
                policy,
                keep,
            } => {
                let spec = MatchSpec::builder()
                    .labels(labels.iter())
                    .key(key.clone(), value.clone())
                    .build()?;
                let hits = self.match_nodes(&spec, None)?;
                let row = match hits.as_slice() {
                    [] => {
                        let mut full = PropertyMap::new();
                        full.insert(key, value);
                        for (k, v) in props {
                            full.entry(k).or_insert(v);
                        }
                        Row::Upserted {
                            node: self.create_node(labels, full, &mut out.stats),
                            outcome: UpsertOutcome::Created,
                        }
                    }
                    [id] => {
                        let id = *id;
                        let outcome = match policy {
                            DuplicatePolicy::Skip => UpsertOutcome::Existing,
                            DuplicatePolicy::Merge => {
                                for (k, v) in props {
                                    self.set_property(id, k, v, &mut out.stats);
                                }
                                UpsertOutcome::Updated
                            }
                            DuplicatePolicy::Replace => {
                                let stale: Vec<String> = self
                                    .nodes
                                    .get(&id)
                                    .map(|n| {
                                        n.props
                                            .keys()
                                            .filter(|k| {
                                                **k != key
                                                    && !keep.contains(*k)
                                                    && !props.contains_key(k.as_str())
                                            })
                                            .cloned()
                                            .collect()
                                    })
                                    .unwrap_or_default();
                                for k in stale {
                                    self.set_property(id, k, Value::Null, &mut out.stats);
                                }
                                for (k, v) in props {
                                    self.set_property(id, k, v, &mut out.stats);
                                }
                                UpsertOutcome::Updated
                            }
                        };
                        Row::Upserted {
                            node: self.node_record(id)?,
                            outcome,
                        }
                    }
                    many => {
                        return Err(SchemaError::conflict(format!(
                            "{} nodes share {key} = {value}",
                            many.len()
                        )))
                    }
                };
                out.rows.push(row);
            }
            Statement::CreateEdges {
                from,
                to,
                rel_type,
                props,
                unique,
            } => {
                if rel_type.trim().is_empty() {
                    return Err(SchemaError::argument("relationship type cannot be blank"));
                }
                let sources = self.match_nodes(&from, None)?;
                let targets = self.match_nodes(&to, None)?;
                let props = strip_nulls(props);
                for src in &sources {
                    for dst in &targets {
                        if unique && self.edge_between(*src, *dst, &rel_type) {
                            continue;
                        }
                        let edge = self.create_edge(*src, *dst, &rel_type, props.clone());
                        out.stats.relationships_created += 1;
                        out.stats.properties_set += edge.props.len();
                        out.rows.push(Row::Edge(edge));
                    }
                }
            }
            Statement::DeleteEdges { pattern } => {
                for id in self.match_edges(&pattern)? {
                    if self.delete_edge(id) {
                        out.stats.relationships_deleted += 1;
                    }
                }
            }
            Statement::Increment { spec, key, by } => {
                if by < 1 {
                    return Err(SchemaError::argument(format!(
                        "increment must be at least 1 (got {by})"
                    )));
                }
                let hits = self.match_nodes(&spec, None)?;
                match hits.as_slice() {
                    [] => {}
                    [id] => {
                        let before = self.node_record(*id)?;
                        let current = before.get(&key).and_then(Value::as_i64).ok_or_else(|| {
                            SchemaError::argument(format!(
                                "property '{key}' of node {id} is not an integer"
                            ))
                        })?;
                        let next = current.checked_add(by).ok_or_else(|| {
                            SchemaError::argument(format!(
                                "advancing '{key}' of node {id} by {by} overflows"
                            ))
                        })?;
                        self.set_property(*id, key, Value::Int(next), &mut out.stats);
                        out.rows.push(Row::Node(before));
                    }
                    many => {
                        return Err(SchemaError::conflict(format!(
                            "increment matched {} nodes",
                            many.len()
                        )))
                    }
                }
            }
            Statement::Batch(items) => {
                let mut draft = self.clone();
                let mut staged = QueryOutput::default();
                for item in items {
                    let mut part = QueryOutput::default();
                    draft.apply(item, &mut part)?;
                    staged.rows.extend(part.rows);
                    staged.stats += part.stats;
                }
                *self = draft;
                out.rows.extend(staged.rows);
                out.stats += staged.stats;
            }
        }
        Ok(())
    }

    fn create_node(
        &mut self,
        labels: Vec<String>,
        props: PropertyMap,
        stats: &mut WriteStats,
    ) -> NodeRecord {
        let id = NodeId(self.next_node.max(1));
        self.next_node = id.0 + 1;
        let mut unique_labels: Vec<String> = Vec::with_capacity(labels.len());
        for label in labels {
            if !unique_labels.contains(&label) {
                unique_labels.push(label);
            }
        }
        let node = NodeRecord {
            id,
            labels: unique_labels,
            props: strip_nulls(props),
        };
        stats.nodes_created += 1;
        stats.labels_added += node.labels.len();
        stats.properties_set += node.props.len();
        self.index_node(&node);
        self.nodes.insert(id, node.clone());
        node
    }

    /// Sets or (for null) removes one property. Every write counts, even when
    /// the value is unchanged; removing an absent key does not.
    fn set_property(&mut self, id: NodeId, key: String, value: Value, stats: &mut WriteStats) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        if value.is_null() {
            if node.props.shift_remove(&key).is_some() {
                stats.properties_set += 1;
            }
        } else {
            node.props.insert(key, value);
            stats.properties_set += 1;
        }
    }

    fn update_node(&mut self, id: NodeId, update: &NodeUpdate, stats: &mut WriteStats) {
        for (k, v) in &update.set {
            self.set_property(id, k.clone(), v.clone(), stats);
        }
        for k in &update.remove {
            self.set_property(id, k.clone(), Value::Null, stats);
        }
        for label in &update.add_labels {
            let added = match self.nodes.get_mut(&id) {
                Some(node) if !node.has_label(label) => {
                    node.labels.push(label.clone());
                    true
                }
                _ => false,
            };
            if added {
                self.by_label.entry(label.clone()).or_default().insert(id);
                stats.labels_added += 1;
            }
        }
        for label in &update.remove_labels {
            let removed = match self.nodes.get_mut(&id) {
                Some(node) if node.has_label(label) => {
                    node.labels.retain(|l| l != label);
                    true
                }
                _ => false,
            };
            if removed {
                if let Some(set) = self.by_label.get_mut(label) {
                    set.remove(&id);
                }
                stats.labels_removed += 1;
            }
        }
    }

    fn delete_node(&mut self, id: NodeId, stats: &mut WriteStats) {
        let attached: Vec<EdgeId> = self
            .outgoing
            .get(&id)
            .into_iter()
            .chain(self.incoming.get(&id))
            .flatten()
            .copied()
            .collect();
        for edge in attached {
            if self.delete_edge(edge) {
                stats.relationships_deleted += 1;
            }
        }
        self.outgoing.remove(&id);
        self.incoming.remove(&id);
        if let Some(node) = self.nodes.remove(&id) {
            for label in &node.labels {
                if let Some(set) = self.by_label.get_mut(label) {
                    set.remove(&id);
                }
            }
            stats.nodes_deleted += 1;
        }
    }

    fn edge_between(&self, src: NodeId, dst: NodeId, rel_type: &str) -> bool {
        self.outgoing.get(&src).is_some_and(|ids| {
            ids.iter().any(|id| {
                self.edges
                    .get(id)
                    .is_some_and(|e| e.dst == dst && e.rel_type == rel_type)
            })
        })
    }

    fn create_edge(
        &mut self,
        src: NodeId,
        dst: NodeId,
        rel_type: &str,
        props: PropertyMap,
    ) -> EdgeRecord {
        let id = EdgeId(self.next_edge.max(1));
        self.next_edge = id.0 + 1;
        let edge = EdgeRecord {
            id,
            src,
            dst,
            rel_type: rel_type.to_string(),
            props,
        };
        self.index_edge(&edge);
        self.edges.insert(id, edge.clone());
        edge
    }

    fn delete_edge(&mut self, id: EdgeId) -> bool {
        let Some(edge) = self.edges.remove(&id) else {
            return false;
        };
        if let Some(set) = self.outgoing.get_mut(&edge.src) {
            set.remove(&id);
        }
        if let Some(set) = self.incoming.get_mut(&edge.dst) {
            set.remove(&id);
        }
        true
    }
}

fn strip_nulls(props: PropertyMap) -> PropertyMap {
    props.into_iter().filter(|(_, v)| !v.is_null()).collect()
}
