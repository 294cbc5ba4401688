//! Data Node Manager: instances bound to a Class.

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Result, SchemaError};
use crate::query::MatchSpec;
use crate::store::{
    EdgePattern, GraphStore, NodeRecord, NodeUpdate, Row, Statement, UpsertOutcome,
};
use crate::types::{EdgeId, NodeId, PropertyMap, Value};

use super::{ClassAttributes, ClassRef, Schema};

/// Optional knobs for [`Schema::create_data_node`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CreateOptions {
    /// Labels added next to the Class name.
    pub extra_labels: Vec<String>,
    /// Explicit uri.
    pub uri: Option<String>,
    /// Reserve the uri from this namespace (ignored when `uri` is set).
    pub uri_namespace: Option<String>,
    /// Drop disallowed properties instead of failing.
    pub silently_drop: bool,
}

/// Outcome of [`Schema::add_data_node_merge`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStatus {
    /// A new node was created.
    Created,
    /// An identical node already existed.
    Existing,
}

/// Selects data nodes.
#[derive(Clone, Debug, PartialEq)]
pub enum DataNodeFilter {
    /// By internal identity.
    Id(NodeId),
    /// By a `(key, value)` pair on any data node.
    Key(String, Value),
    /// By uri.
    Uri(String),
    /// Every data node of a Class.
    Class(String),
    /// Every data node matched by an arbitrary specification.
    Matching(MatchSpec),
}

impl<S: GraphStore> Schema<S> {
    /// Creates a data node of `class`; returns its identity.
    ///
    /// The property map is filtered by the Class policy (see
    /// [`allowable_props`](Self::allowable_props)); null values are dropped.
    pub fn create_data_node(
        &self,
        class: impl Into<ClassRef>,
        properties: &PropertyMap,
        options: &CreateOptions,
    ) -> Result<NodeId> {
        let attrs = self.instantiable(class)?;
        let mut props = self.data_props(&attrs, properties, options.silently_drop)?;
        let uri = match (&options.uri, &options.uri_namespace) {
            (Some(uri), _) => Some(uri.clone()),
            (None, Some(ns)) => Some(self.reserve_next_uri(ns, None, None)?),
            (None, None) => None,
        };
        if let Some(uri) = uri {
            props.insert(self.options.uri_key.clone(), Value::String(uri));
        }
        let node = self
            .run(Statement::CreateNode {
                labels: self.data_labels(&attrs, &options.extra_labels),
                props,
            })?
            .into_nodes()
            .into_iter()
            .next()
            .ok_or_else(|| SchemaError::Store("data node creation returned no row".into()))?;
        debug!(class = %attrs.name, id = %node.id, "schema.data_node.created");
        Ok(node.id)
    }

    /// Returns the data node of `class` whose filtered property set equals
    /// `properties` exactly, creating it when there is none.
    pub fn add_data_node_merge(
        &self,
        class: impl Into<ClassRef>,
        properties: &PropertyMap,
    ) -> Result<(NodeId, MergeStatus)> {
        let attrs = self.instantiable(class)?;
        let props = self.data_props(&attrs, properties, false)?;
        let out = self.run(Statement::MergeNode {
            labels: vec![attrs.name.clone()],
            props,
        })?;
        match out.rows.into_iter().next() {
            Some(Row::Upserted { node, outcome }) => {
                let status = if outcome == UpsertOutcome::Created {
                    MergeStatus::Created
                } else {
                    MergeStatus::Existing
                };
                debug!(class = %attrs.name, id = %node.id, status = ?status, "schema.data_node.merged");
                Ok((node.id, status))
            }
            _ => Err(SchemaError::Store("merge returned no row".into())),
        }
    }

    /// Sets fields on a data node; returns the number of properties written,
    /// counting writes of an unchanged value. With `drop_blanks`, a blank
    /// value removes the field instead.
    pub fn update_data_node(
        &self,
        node: NodeId,
        set: &PropertyMap,
        drop_blanks: bool,
    ) -> Result<usize> {
        if set.contains_key(&self.options.class_key) {
            return Err(SchemaError::argument(format!(
                "'{}' is managed by the schema and cannot be set directly",
                self.options.class_key
            )));
        }
        let class = self.class_of_data_node(node)?;
        let attrs = self.get_class(class.as_str())?;
        let allowed = self.allowable_for(&attrs, set, false)?;
        let mut update = NodeUpdate::default();
        for (key, value) in allowed {
            if value.is_null() || (drop_blanks && value.is_blank()) {
                update.remove.push(key);
            } else {
                update.set.insert(key, value);
            }
        }
        let out = self.run(Statement::UpdateNodes {
            spec: MatchSpec::id(node),
            update,
        })?;
        debug!(id = %node, properties_set = out.stats.properties_set, "schema.data_node.updated");
        Ok(out.stats.properties_set)
    }

    /// Deletes the selected data nodes and their relationships; returns the
    /// count deleted. Nothing matching is not an error.
    /// Class, Property, Link and Namespace nodes are never selected.
    pub fn delete_data_nodes(&self, filter: &DataNodeFilter) -> Result<usize> {
        let statements: Vec<Statement> = self
            .find_data_nodes(filter)?
            .into_iter()
            .map(|node| Statement::DeleteNodes {
                spec: MatchSpec::id(node.id),
            })
            .collect();
        if statements.is_empty() {
            return Ok(0);
        }
        let out = self.run(Statement::Batch(statements))?;
        info!(filter = ?filter, deleted = out.stats.nodes_deleted, "schema.data_node.deleted");
        Ok(out.stats.nodes_deleted)
    }

    /// Deletes one data node by identity; returns true if it existed.
    pub fn delete_data_node(&self, node: NodeId) -> Result<bool> {
        Ok(self.delete_data_nodes(&DataNodeFilter::Id(node))? > 0)
    }

    /// The single data node selected by `filter`, if any. A filter matching
    /// several nodes is an integrity conflict.
    pub fn get_data_node(&self, filter: &DataNodeFilter) -> Result<Option<NodeRecord>> {
        let mut nodes = self.find_data_nodes(filter)?;
        match nodes.len() {
            0 => Ok(None),
            1 => Ok(nodes.pop()),
            n => Err(SchemaError::conflict(format!(
                "{n} data nodes match {filter:?}"
            ))),
        }
    }

    /// Every data node selected by `filter`.
    pub fn find_data_nodes(&self, filter: &DataNodeFilter) -> Result<Vec<NodeRecord>> {
        let spec = self.filter_spec(filter)?;
        let mut nodes = self.store.find_nodes(spec)?;
        // Identity and caller-built specs can land on schema nodes.
        nodes.retain(|node| node.props.contains_key(&self.options.class_key));
        Ok(nodes)
    }

    /// True if `filter` selects at least one data node.
    pub fn data_node_exists(&self, filter: &DataNodeFilter) -> Result<bool> {
        Ok(!self.find_data_nodes(filter)?.is_empty())
    }

    /// Data nodes of `class` whose properties include every entry of
    /// `conditions`.
    pub fn search_data_nodes(
        &self,
        class: impl Into<ClassRef>,
        conditions: &PropertyMap,
    ) -> Result<Vec<NodeRecord>> {
        let attrs = self.get_class(class)?;
        let spec = MatchSpec::builder()
            .label(attrs.name.clone())
            .key(self.options.class_key.clone(), attrs.name.clone())
            .props(conditions)
            .build()?;
        self.store.find_nodes(spec)
    }

    /// Name of the Class a data node is bound to.
    pub fn class_of_data_node(&self, node: NodeId) -> Result<String> {
        let record = self
            .fetch_node(node)?
            .ok_or_else(|| SchemaError::UnknownNode(node.to_string()))?;
        match record.get(&self.options.class_key) {
            Some(Value::String(name)) => Ok(name.clone()),
            Some(Value::List(items)) => Err(SchemaError::conflict(format!(
                "node {node} references {} classes",
                items.len()
            ))),
            Some(other) => Err(SchemaError::Store(format!(
                "node {node} has a {} class reference",
                other.type_name()
            ))),
            None => Err(SchemaError::UnknownNode(format!(
                "node {node} is not a data node"
            ))),
        }
    }

    /// Creates a relationship between two data nodes. The name must be
    /// declared between their Classes, directly or through ancestry.
    pub fn add_data_relationship(
        &self,
        from: NodeId,
        to: NodeId,
        name: &str,
        properties: &PropertyMap,
    ) -> Result<EdgeId> {
        let from_class = self.class_of_data_node(from)?;
        let to_class = self.class_of_data_node(to)?;
        if !self.class_relationship_allowed(from_class.as_str(), to_class.as_str(), name)? {
            return Err(SchemaError::violation(format!(
                "relationship '{name}' is not declared from '{from_class}' to '{to_class}'"
            )));
        }
        let edge = self
            .run(Statement::CreateEdges {
                from: MatchSpec::id(from),
                to: MatchSpec::id(to).with_placeholder("m")?,
                rel_type: name.to_string(),
                props: properties.clone(),
                unique: false,
            })?
            .into_edges()
            .into_iter()
            .next()
            .ok_or_else(|| SchemaError::Store("relationship creation returned no row".into()))?;
        debug!(from = %from, to = %to, rel = name, "schema.data_relationship.created");
        Ok(edge.id)
    }

    /// Removes relationships named `name` from `from` to `to`; returns the
    /// count removed.
    pub fn remove_data_relationship(&self, from: NodeId, to: NodeId, name: &str) -> Result<usize> {
        let out = self.run(Statement::DeleteEdges {
            pattern: EdgePattern::between(from, to, name),
        })?;
        Ok(out.stats.relationships_deleted)
    }

    pub(crate) fn instantiable(&self, class: impl Into<ClassRef>) -> Result<ClassAttributes> {
        let attrs = self.get_class(class)?;
        if attrs.no_datanodes {
            return Err(SchemaError::violation(format!(
                "class '{}' does not allow data nodes",
                attrs.name
            )));
        }
        Ok(attrs)
    }

    /// Filtered property map with the Class reference first.
    pub(crate) fn data_props(
        &self,
        attrs: &ClassAttributes,
        properties: &PropertyMap,
        silently_drop: bool,
    ) -> Result<PropertyMap> {
        if properties.contains_key(&self.options.class_key) {
            return Err(SchemaError::argument(format!(
                "'{}' is managed by the schema and cannot be set directly",
                self.options.class_key
            )));
        }
        let allowed = self.allowable_for(attrs, properties, silently_drop)?;
        let mut props = PropertyMap::with_capacity(allowed.len() + 1);
        props.insert(self.options.class_key.clone(), Value::from(&attrs.name));
        props.extend(allowed.into_iter().filter(|(_, v)| !v.is_null()));
        Ok(props)
    }

    pub(crate) fn data_labels(&self, attrs: &ClassAttributes, extra: &[String]) -> Vec<String> {
        let mut labels = vec![attrs.name.clone()];
        labels.extend(extra.iter().filter(|l| **l != attrs.name).cloned());
        labels
    }

    fn filter_spec(&self, filter: &DataNodeFilter) -> Result<MatchSpec> {
        let class_key = self.options.class_key.clone();
        match filter {
            DataNodeFilter::Id(id) => Ok(MatchSpec::id(*id)),
            DataNodeFilter::Key(key, value) => MatchSpec::builder()
                .key(key.clone(), value.clone())
                .filter(|p| {
                    p.exists(class_key);
                })
                .build(),
            DataNodeFilter::Uri(uri) => MatchSpec::builder()
                .key(self.options.uri_key.clone(), uri.as_str())
                .filter(|p| {
                    p.exists(class_key);
                })
                .build(),
            DataNodeFilter::Class(name) => MatchSpec::builder()
                .label(name.clone())
                .key(class_key, name.as_str())
                .build(),
            DataNodeFilter::Matching(spec) => Ok(spec.clone()),
        }
    }
}
