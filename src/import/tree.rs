//! Tree import: nested JSON values become linked data nodes.

use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::error::{Result, SchemaError};
use crate::query::MatchSpec;
use crate::schema::{ClassAttributes, ClassRef, Schema};
use crate::store::{GraphStore, Statement};
use crate::types::{NodeId, PropertyMap, Value};

/// Options for [`Schema::import_tree`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeImportOptions {
    /// Drop properties a strict Class does not declare instead of failing.
    pub silently_drop: bool,
    /// Labels added to every data node created.
    pub extra_labels: Vec<String>,
}

impl<S: GraphStore> Schema<S> {
    /// Imports a nested value under `class`; returns the root-level identities.
    ///
    /// - A mapping becomes one node. Scalar entries become properties; a
    ///   mapping or non-empty sequence entry is imported recursively under the
    ///   Class targeted by the relationship named after the key, and linked
    ///   from the new node by that relationship.
    /// - A scalar is wrapped as `{<scalar key>: value}` first.
    /// - A top-level sequence yields one root per element.
    /// - A nested sequence is gathered under a plain grouping node labeled
    ///   with the key, linked to each element by the same relationship. A
    ///   sequence inside a top-level sequence is grouped under the Class name.
    /// - Null and empty sequences produce nothing.
    ///
    /// Children are created before their parent. The import is not atomic:
    /// if it fails after creating nodes, the error is
    /// [`SchemaError::PartialImport`] listing them so the caller can pass
    /// them to [`Schema::compensate`].
    pub fn import_tree(
        &self,
        class: impl Into<ClassRef>,
        value: &JsonValue,
        options: &TreeImportOptions,
    ) -> Result<Vec<NodeId>> {
        let attrs = self.instantiable(class)?;
        let mut created = Vec::new();
        match self.import_value(&attrs, value, None, options, &mut created) {
            Ok(roots) => {
                info!(
                    class = %attrs.name,
                    roots = roots.len(),
                    created = created.len(),
                    "import.tree.finished"
                );
                Ok(roots)
            }
            Err(err) if created.is_empty() => Err(err),
            Err(err) => {
                warn!(
                    class = %attrs.name,
                    created = created.len(),
                    error = %err,
                    "import.tree.partial"
                );
                Err(SchemaError::PartialImport {
                    created,
                    source: Box::new(err),
                })
            }
        }
    }

    fn import_value(
        &self,
        class: &ClassAttributes,
        value: &JsonValue,
        key: Option<&str>,
        options: &TreeImportOptions,
        created: &mut Vec<NodeId>,
    ) -> Result<Vec<NodeId>> {
        match value {
            JsonValue::Null => Ok(Vec::new()),
            JsonValue::Array(items) => {
                let mut members = Vec::new();
                for item in items {
                    // An inner sequence always gets its own grouping node.
                    let item_key = match item {
                        JsonValue::Array(_) => Some(key.unwrap_or(class.name.as_str())),
                        _ => key,
                    };
                    members.extend(self.import_value(class, item, item_key, options, created)?);
                }
                match key {
                    Some(key) if !members.is_empty() => {
                        Ok(vec![self.group(key, &members, created)?])
                    }
                    _ => Ok(members),
                }
            }
            JsonValue::Object(map) => {
                Ok(vec![self.import_object(class, map.iter(), options, created)?])
            }
            scalar => {
                let wrapped = [(&self.options().scalar_key, scalar)];
                Ok(vec![self.import_object(
                    class,
                    wrapped.into_iter(),
                    options,
                    created,
                )?])
            }
        }
    }

    fn import_object<'v>(
        &self,
        class: &ClassAttributes,
        entries: impl Iterator<Item = (&'v String, &'v JsonValue)>,
        options: &TreeImportOptions,
        created: &mut Vec<NodeId>,
    ) -> Result<NodeId> {
        let mut props = PropertyMap::new();
        let mut children: Vec<(String, Vec<NodeId>)> = Vec::new();
        for (key, value) in entries {
            match value {
                JsonValue::Null => {}
                JsonValue::Array(items) if items.is_empty() => {}
                JsonValue::Object(_) | JsonValue::Array(_) => {
                    let child = self.relationship_target(class.id, key)?;
                    let child = self.instantiable(child.id)?;
                    let ids = self.import_value(&child, value, Some(key.as_str()), options, created)?;
                    if !ids.is_empty() {
                        children.push((key.clone(), ids));
                    }
                }
                scalar => {
                    props.insert(key.clone(), Value::from_json(scalar)?);
                }
            }
        }
        let props = self.data_props(class, &props, options.silently_drop)?;
        let node = self
            .run(Statement::CreateNode {
                labels: self.data_labels(class, &options.extra_labels),
                props,
            })?
            .into_nodes()
            .into_iter()
            .next()
            .ok_or_else(|| SchemaError::Store("node creation returned no row".into()))?;
        created.push(node.id);
        debug!(class = %class.name, id = %node.id, children = children.len(), "import.tree.node");
        self.link_children(node.id, &children)?;
        Ok(node.id)
    }

    fn group(&self, key: &str, members: &[NodeId], created: &mut Vec<NodeId>) -> Result<NodeId> {
        let node = self
            .run(Statement::CreateNode {
                labels: vec![key.to_string()],
                props: PropertyMap::new(),
            })?
            .into_nodes()
            .into_iter()
            .next()
            .ok_or_else(|| SchemaError::Store("group creation returned no row".into()))?;
        created.push(node.id);
        self.link_children(node.id, &[(key.to_string(), members.to_vec())])?;
        Ok(node.id)
    }

    fn link_children(&self, parent: NodeId, children: &[(String, Vec<NodeId>)]) -> Result<()> {
        let mut edges = Vec::new();
        for (rel, ids) in children {
            for id in ids {
                edges.push(Statement::CreateEdges {
                    from: MatchSpec::id(parent),
                    to: MatchSpec::id(*id).with_placeholder("m")?,
                    rel_type: rel.clone(),
                    props: PropertyMap::new(),
                    unique: false,
                });
            }
        }
        if !edges.is_empty() {
            self.run(Statement::Batch(edges))?;
        }
        Ok(())
    }
}
