//! Class Registry: Classes, their Properties, and Class-to-Class relationships.

use std::collections::BTreeSet;

use rustc_hash::FxHashSet;
use tracing::{debug, info, warn};

use crate::error::{Result, SchemaError};
use crate::query::MatchSpec;
use crate::store::{
    DuplicatePolicy, EdgePattern, GraphStore, NodeRecord, NodeUpdate, Row, Statement,
    UpsertOutcome,
};
use crate::types::{NodeId, PropertyMap, Value};

use super::{
    bool_prop, require_name, string_prop, ClassAttributes, ClassLink, ClassRef, PropertyDef,
    PropertyInfo, Schema,
};

pub(crate) const NAME_KEY: &str = "name";
const STRICT_KEY: &str = "strict";
const CODE_KEY: &str = "code";
const NO_DATANODES_KEY: &str = "no_datanodes";
const INDEX_KEY: &str = "index";
const DTYPE_KEY: &str = "dtype";
const SYSTEM_KEY: &str = "system";

/// Flags accepted when creating a Class.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassOptions {
    /// Reject undeclared properties on data nodes.
    pub strict: bool,
    /// Optional short code.
    pub code: Option<String>,
    /// Forbid data nodes of this Class.
    pub no_datanodes: bool,
}

impl<S: GraphStore> Schema<S> {
    /// Creates a Class; fails if the name is blank or taken.
    pub fn create_class(&self, name: &str, strict: bool) -> Result<NodeId> {
        self.create_class_with_options(
            name,
            &ClassOptions {
                strict,
                ..ClassOptions::default()
            },
        )
    }

    /// Creates a Class with every flag spelled out.
    ///
    /// Creation is a single keyed write, so two callers racing on the same
    /// name cannot both succeed. The Class uri is reserved from the schema
    /// namespace first; a failed creation leaves a gap in that sequence.
    pub fn create_class_with_options(&self, name: &str, options: &ClassOptions) -> Result<NodeId> {
        require_name("class name", name)?;
        let uri = self.reserve_schema_uri()?;
        let mut props = PropertyMap::new();
        props.insert(STRICT_KEY.into(), Value::Bool(options.strict));
        props.insert(self.options.uri_key.clone(), Value::String(uri.clone()));
        if let Some(code) = &options.code {
            props.insert(CODE_KEY.into(), Value::from(code));
        }
        if options.no_datanodes {
            props.insert(NO_DATANODES_KEY.into(), Value::Bool(true));
        }
        let out = self.run(Statement::UpsertNode {
            labels: vec![self.options.class_label.clone()],
            key: NAME_KEY.into(),
            value: Value::from(name),
            props,
            policy: DuplicatePolicy::Skip,
            keep: Vec::new(),
        })?;
        match out.rows.into_iter().next() {
            Some(Row::Upserted {
                node,
                outcome: UpsertOutcome::Created,
            }) => {
                self.clear_cache();
                info!(class = name, id = %node.id, uri = %uri, strict = options.strict, "schema.class.created");
                Ok(node.id)
            }
            Some(_) => Err(SchemaError::conflict(format!(
                "class '{name}' already exists"
            ))),
            None => Err(SchemaError::Store("class upsert returned no row".into())),
        }
    }

    /// Creates a Class and declares its properties in order.
    pub fn create_class_with_properties<I, P>(
        &self,
        name: &str,
        properties: I,
        strict: bool,
    ) -> Result<NodeId>
    where
        I: IntoIterator<Item = P>,
        P: Into<PropertyDef>,
    {
        let id = self.create_class(name, strict)?;
        self.add_properties_to_class(id, properties)?;
        Ok(id)
    }

    /// True if a Class with this name exists.
    pub fn class_exists(&self, name: &str) -> Result<bool> {
        Ok(self.lookup_class(&ClassRef::from(name))?.is_some())
    }

    /// Attributes of a Class.
    pub fn get_class(&self, class: impl Into<ClassRef>) -> Result<ClassAttributes> {
        let class = class.into();
        self.lookup_class(&class)?
            .ok_or_else(|| SchemaError::UnknownClass(class.to_string()))
    }

    /// Internal identity of a Class.
    pub fn get_class_id(&self, class: impl Into<ClassRef>) -> Result<NodeId> {
        Ok(self.get_class(class)?.id)
    }

    /// Uri of a Class.
    pub fn get_class_uri(&self, class: impl Into<ClassRef>) -> Result<Option<String>> {
        Ok(self.get_class(class)?.uri)
    }

    /// Every Class, sorted by name.
    pub fn list_classes(&self) -> Result<Vec<ClassAttributes>> {
        let nodes = self
            .store
            .find_nodes(MatchSpec::label(self.options.class_label.clone())?)?;
        let mut classes = nodes
            .iter()
            .map(|node| self.class_from_node(node))
            .collect::<Result<Vec<_>>>()?;
        classes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(classes)
    }

    /// Changes the strictness flag.
    pub fn set_strict(&self, class: impl Into<ClassRef>, strict: bool) -> Result<()> {
        let attrs = self.get_class(class)?;
        self.run(Statement::UpdateNodes {
            spec: MatchSpec::id(attrs.id),
            update: NodeUpdate {
                set: PropertyMap::from([(STRICT_KEY.to_string(), Value::Bool(strict))]),
                ..NodeUpdate::default()
            },
        })?;
        self.clear_cache();
        info!(class = %attrs.name, strict, "schema.class.strict_changed");
        Ok(())
    }

    /// Renames a Class and every data node bound to it; returns the number of
    /// data nodes updated.
    pub fn rename_class(&self, class: impl Into<ClassRef>, new_name: &str) -> Result<usize> {
        require_name("class name", new_name)?;
        let attrs = self.get_class(class)?;
        if attrs.name == new_name {
            return Ok(0);
        }
        if self.class_exists(new_name)? {
            return Err(SchemaError::conflict(format!(
                "class '{new_name}' already exists"
            )));
        }
        let class_key = self.options.class_key.clone();
        let data_nodes = MatchSpec::builder()
            .label(attrs.name.clone())
            .key(class_key.clone(), attrs.name.clone())
            .build()?;
        let out = self.run(Statement::Batch(vec![
            Statement::UpdateNodes {
                spec: MatchSpec::id(attrs.id),
                update: NodeUpdate {
                    set: PropertyMap::from([(NAME_KEY.to_string(), Value::from(new_name))]),
                    ..NodeUpdate::default()
                },
            },
            Statement::UpdateNodes {
                spec: data_nodes,
                update: NodeUpdate {
                    set: PropertyMap::from([(class_key, Value::from(new_name))]),
                    add_labels: vec![new_name.to_string()],
                    remove_labels: vec![attrs.name.clone()],
                    ..NodeUpdate::default()
                },
            },
        ]))?;
        self.clear_cache();
        let renamed = out
            .nodes()
            .filter(|node| !node.has_label(&self.options.class_label))
            .count();
        info!(from = %attrs.name, to = new_name, data_nodes = renamed, "schema.class.renamed");
        Ok(renamed)
    }

    /// Deletes a Class with its Properties and Link nodes.
    ///
    /// With `safe` set, refuses while data nodes are bound to the Class.
    /// Otherwise those nodes are left in place with a dangling Class
    /// reference; the returned count is the number of such orphans.
    pub fn delete_class(&self, class: impl Into<ClassRef>, safe: bool) -> Result<usize> {
        let attrs = self.get_class(class)?;
        let bound = self.count_data_nodes_of_class(attrs.id)?;
        if safe && bound > 0 {
            return Err(SchemaError::ClassInUse {
                class: attrs.name,
                count: bound,
            });
        }
        let mut doomed: BTreeSet<NodeId> = BTreeSet::new();
        doomed.insert(attrs.id);
        for prop in self.class_property_info(attrs.id)? {
            doomed.insert(prop.id);
        }
        let touching = self
            .store
            .find_edges(EdgePattern::outbound(attrs.id, None))?
            .into_iter()
            .map(|e| e.dst)
            .chain(
                self.store
                    .find_edges(EdgePattern::inbound(attrs.id, None))?
                    .into_iter()
                    .map(|e| e.src),
            )
            .collect::<BTreeSet<_>>();
        for node in self.fetch_nodes(&touching.into_iter().collect::<Vec<_>>())? {
            if node.has_label(&self.options.link_label) {
                doomed.insert(node.id);
                for prop in self.class_property_info(node.id)? {
                    doomed.insert(prop.id);
                }
            }
        }
        let statements = doomed
            .iter()
            .map(|id| Statement::DeleteNodes {
                spec: MatchSpec::id(*id),
            })
            .collect();
        let out = self.run(Statement::Batch(statements))?;
        self.clear_cache();
        info!(
            class = %attrs.name,
            schema_nodes = out.stats.nodes_deleted,
            orphaned = bound,
            "schema.class.deleted"
        );
        Ok(bound)
    }

    /// Appends properties after the highest existing position; returns the
    /// number added. A name already declared on the Class is a conflict.
    pub fn add_properties_to_class<I, P>(
        &self,
        class: impl Into<ClassRef>,
        properties: I,
    ) -> Result<usize>
    where
        I: IntoIterator<Item = P>,
        P: Into<PropertyDef>,
    {
        let attrs = self.get_class(class)?;
        let defs: Vec<PropertyDef> = properties.into_iter().map(Into::into).collect();
        let existing = self.class_property_info(attrs.id)?;
        let mut names: FxHashSet<&str> = existing.iter().map(|p| p.name.as_str()).collect();
        for def in &defs {
            require_name("property name", &def.name)?;
            if !names.insert(def.name.as_str()) {
                return Err(SchemaError::conflict(format!(
                    "class '{}' already has a property named '{}'",
                    attrs.name, def.name
                )));
            }
        }
        let mut index = existing.iter().map(|p| p.index).max().map_or(0, |m| m + 1);
        for def in &defs {
            self.attach_property(attrs.id, def, index)?;
            index += 1;
        }
        self.clear_cache();
        debug!(class = %attrs.name, added = defs.len(), "schema.class.properties_added");
        Ok(defs.len())
    }

    /// Removes one declared property; returns false if it was not declared.
    pub fn remove_property_from_class(
        &self,
        class: impl Into<ClassRef>,
        name: &str,
    ) -> Result<bool> {
        let attrs = self.get_class(class)?;
        let Some(prop) = self
            .class_property_info(attrs.id)?
            .into_iter()
            .find(|p| p.name == name)
        else {
            return Ok(false);
        };
        self.run(Statement::DeleteNodes {
            spec: MatchSpec::id(prop.id),
        })?;
        self.clear_cache();
        debug!(class = %attrs.name, property = name, "schema.class.property_removed");
        Ok(true)
    }

    /// Declares a plain relationship between two Classes.
    pub fn create_class_relationship(
        &self,
        from: impl Into<ClassRef>,
        to: impl Into<ClassRef>,
        name: &str,
    ) -> Result<()> {
        let (source, target) = self.check_new_relationship(from.into(), to.into(), name)?;
        self.run(Statement::CreateEdges {
            from: MatchSpec::id(source.id),
            to: MatchSpec::id(target.id).with_placeholder("m")?,
            rel_type: name.to_string(),
            props: PropertyMap::new(),
            unique: false,
        })?;
        self.clear_cache();
        info!(from = %source.name, to = %target.name, rel = name, "schema.relationship.created");
        Ok(())
    }

    /// Declares a relationship realized through a Link node that owns the
    /// given relationship properties; returns the Link node identity.
    pub fn create_class_relationship_with_properties<I, P>(
        &self,
        from: impl Into<ClassRef>,
        to: impl Into<ClassRef>,
        name: &str,
        properties: I,
    ) -> Result<NodeId>
    where
        I: IntoIterator<Item = P>,
        P: Into<PropertyDef>,
    {
        let (source, target) = self.check_new_relationship(from.into(), to.into(), name)?;
        let defs: Vec<PropertyDef> = properties.into_iter().map(Into::into).collect();
        for def in &defs {
            require_name("property name", &def.name)?;
        }
        let link = self
            .run(Statement::CreateNode {
                labels: vec![self.options.link_label.clone()],
                props: PropertyMap::from([(NAME_KEY.to_string(), Value::from(name))]),
            })?
            .into_nodes()
            .into_iter()
            .next()
            .ok_or_else(|| SchemaError::Store("link creation returned no row".into()))?;
        self.run(Statement::Batch(vec![
            Statement::CreateEdges {
                from: MatchSpec::id(source.id),
                to: MatchSpec::id(link.id).with_placeholder("m")?,
                rel_type: name.to_string(),
                props: PropertyMap::new(),
                unique: false,
            },
            Statement::CreateEdges {
                from: MatchSpec::id(link.id),
                to: MatchSpec::id(target.id).with_placeholder("m")?,
                rel_type: name.to_string(),
                props: PropertyMap::new(),
                unique: false,
            },
        ]))?;
        for (index, def) in defs.iter().enumerate() {
            self.attach_property(link.id, def, index as i64)?;
        }
        self.clear_cache();
        info!(
            from = %source.name,
            to = %target.name,
            rel = name,
            link = %link.id,
            properties = defs.len(),
            "schema.relationship.created"
        );
        Ok(link.id)
    }

    /// Declares `child` an instance of `parent` (ancestry edge).
    pub fn add_ancestor(&self, child: impl Into<ClassRef>, parent: impl Into<ClassRef>) -> Result<()> {
        let rel = self.options.instance_of.clone();
        self.create_class_relationship(child, parent, &rel)
    }

    /// Outbound relationships declared directly on a Class.
    pub fn get_class_relationships(&self, class: impl Into<ClassRef>) -> Result<Vec<ClassLink>> {
        let attrs = self.get_class(class)?;
        self.class_links(attrs.id)
    }

    /// True if `from` declares `name` directly towards `to`.
    pub fn class_relationship_exists(
        &self,
        from: impl Into<ClassRef>,
        to: impl Into<ClassRef>,
        name: &str,
    ) -> Result<bool> {
        let source = self.get_class(from)?;
        let target = self.get_class(to)?;
        Ok(self
            .class_links(source.id)?
            .iter()
            .any(|l| l.name == name && l.target == target.id))
    }

    /// True if `name` is declared between `from` (or an ancestor) and `to`
    /// (or an ancestor).
    pub fn class_relationship_allowed(
        &self,
        from: impl Into<ClassRef>,
        to: impl Into<ClassRef>,
        name: &str,
    ) -> Result<bool> {
        let source = self.get_class(from)?;
        let target = self.get_class(to)?;
        let targets: FxHashSet<NodeId> = self.ancestry(target.id)?.into_iter().flatten().collect();
        for class in self.ancestry(source.id)?.into_iter().flatten() {
            if self
                .class_links(class)?
                .iter()
                .any(|l| l.name == name && targets.contains(&l.target))
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Target Class of the relationship `name` declared on `class` or its
    /// ancestors. Fails with a schema violation when none is declared.
    pub fn relationship_target(
        &self,
        class: impl Into<ClassRef>,
        name: &str,
    ) -> Result<ClassAttributes> {
        let attrs = self.get_class(class)?;
        for id in self.ancestry(attrs.id)?.into_iter().flatten() {
            if let Some(link) = self.class_links(id)?.into_iter().find(|l| l.name == name) {
                return self.get_class(link.target);
            }
        }
        Err(SchemaError::violation(format!(
            "class '{}' declares no relationship named '{name}'",
            attrs.name
        )))
    }

    /// Removes a declared relationship (plain edges and Link nodes); returns
    /// the number of declarations removed.
    pub fn delete_class_relationship(
        &self,
        from: impl Into<ClassRef>,
        to: impl Into<ClassRef>,
        name: &str,
    ) -> Result<usize> {
        let source = self.get_class(from)?;
        let target = self.get_class(to)?;
        let doomed: Vec<ClassLink> = self
            .class_links(source.id)?
            .into_iter()
            .filter(|l| l.name == name && l.target == target.id)
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }
        let mut statements = Vec::new();
        for link in &doomed {
            match link.link_node {
                Some(link_id) => {
                    for prop in self.class_property_info(link_id)? {
                        statements.push(Statement::DeleteNodes {
                            spec: MatchSpec::id(prop.id),
                        });
                    }
                    statements.push(Statement::DeleteNodes {
                        spec: MatchSpec::id(link_id),
                    });
                }
                None => statements.push(Statement::DeleteEdges {
                    pattern: EdgePattern::between(source.id, target.id, name),
                }),
            }
        }
        self.run(Statement::Batch(statements))?;
        self.clear_cache();
        info!(from = %source.name, to = %target.name, rel = name, removed = doomed.len(), "schema.relationship.deleted");
        Ok(doomed.len())
    }

    /// Number of data nodes bound to a Class.
    pub fn count_data_nodes_of_class(&self, class: impl Into<ClassRef>) -> Result<usize> {
        Ok(self.get_class_instances(class)?.len())
    }

    /// Data nodes bound to a Class.
    pub fn get_class_instances(&self, class: impl Into<ClassRef>) -> Result<Vec<NodeRecord>> {
        let attrs = self.get_class(class)?;
        self.store.find_nodes(
            MatchSpec::builder()
                .label(attrs.name.clone())
                .key(self.options.class_key.clone(), attrs.name)
                .build()?,
        )
    }

    pub(crate) fn lookup_class(&self, class: &ClassRef) -> Result<Option<ClassAttributes>> {
        let cached = {
            let mut cache = self.cache.lock();
            match class {
                ClassRef::Id(id) => cache.attributes(*id),
                ClassRef::Name(name) => cache.id_for_name(name).and_then(|id| cache.attributes(id)),
            }
        };
        if cached.is_some() {
            return Ok(cached);
        }
        let spec = match class {
            ClassRef::Id(id) => MatchSpec::id(*id),
            ClassRef::Name(name) => {
                if name.trim().is_empty() {
                    return Ok(None);
                }
                MatchSpec::key(self.options.class_label.clone(), NAME_KEY, name.as_str())?
            }
        };
        let nodes = self.store.find_nodes(spec)?;
        let node = match nodes.as_slice() {
            [] => return Ok(None),
            [node] => node,
            many => {
                return Err(SchemaError::conflict(format!(
                    "{} classes are named '{class}'",
                    many.len()
                )))
            }
        };
        if !node.has_label(&self.options.class_label) {
            return Ok(None);
        }
        let attrs = self.class_from_node(node)?;
        self.cache.lock().store_attributes(attrs.clone());
        Ok(Some(attrs))
    }

    fn class_from_node(&self, node: &NodeRecord) -> Result<ClassAttributes> {
        let name = string_prop(node, NAME_KEY).ok_or_else(|| {
            SchemaError::Store(format!("class node {} has no name", node.id))
        })?;
        let strict = bool_prop(node, STRICT_KEY);
        if strict.is_none() {
            warn!(class = %name, id = %node.id, "schema.class.strict_missing");
        }
        Ok(ClassAttributes {
            id: node.id,
            name,
            uri: string_prop(node, &self.options.uri_key),
            strict,
            code: string_prop(node, CODE_KEY),
            no_datanodes: bool_prop(node, NO_DATANODES_KEY).unwrap_or(false),
        })
    }

    /// Direct Property nodes of a Class or Link node, ordered by position.
    pub(crate) fn class_property_info(&self, owner: NodeId) -> Result<Vec<PropertyInfo>> {
        if let Some(hit) = self.cache.lock().properties(owner) {
            return Ok(hit);
        }
        let targets: Vec<NodeId> = self
            .store
            .find_edges(EdgePattern::outbound(owner, Some(&self.options.has_property)))?
            .into_iter()
            .map(|e| e.dst)
            .collect();
        let mut props: Vec<PropertyInfo> = self
            .fetch_nodes(&targets)?
            .into_iter()
            .filter(|n| n.has_label(&self.options.property_label))
            .filter_map(|n| {
                Some(PropertyInfo {
                    id: n.id,
                    name: string_prop(&n, NAME_KEY)?,
                    index: n.get(INDEX_KEY).and_then(Value::as_i64).unwrap_or(i64::MAX),
                    dtype: string_prop(&n, DTYPE_KEY),
                    system: bool_prop(&n, SYSTEM_KEY).unwrap_or(false),
                })
            })
            .collect();
        props.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.id.cmp(&b.id)));
        self.cache.lock().store_properties(owner, props.clone());
        Ok(props)
    }

    /// Outbound relationships of a Class, resolving Link nodes to their target.
    pub(crate) fn class_links(&self, class: NodeId) -> Result<Vec<ClassLink>> {
        if let Some(hit) = self.cache.lock().links(class) {
            return Ok(hit);
        }
        let edges: Vec<_> = self
            .store
            .find_edges(EdgePattern::outbound(class, None))?
            .into_iter()
            .filter(|e| e.rel_type != self.options.has_property)
            .collect();
        let ends = self.fetch_nodes(&edges.iter().map(|e| e.dst).collect::<Vec<_>>())?;
        let mut links = Vec::new();
        for (edge, end) in edges.iter().zip(ends.iter()) {
            if end.has_label(&self.options.class_label) {
                if let Some(target_name) = string_prop(end, NAME_KEY) {
                    links.push(ClassLink {
                        name: edge.rel_type.clone(),
                        target: end.id,
                        target_name,
                        link_node: None,
                    });
                }
            } else if end.has_label(&self.options.link_label) {
                let onward = self
                    .store
                    .find_edges(EdgePattern::outbound(end.id, Some(&edge.rel_type)))?;
                for hop in onward {
                    if let Some(target) = self.fetch_node(hop.dst)? {
                        if let Some(target_name) = string_prop(&target, NAME_KEY) {
                            links.push(ClassLink {
                                name: edge.rel_type.clone(),
                                target: target.id,
                                target_name,
                                link_node: Some(end.id),
                            });
                        }
                    }
                }
            }
        }
        self.cache.lock().store_links(class, links.clone());
        Ok(links)
    }

    /// The Class followed by its ancestors, grouped by distance. Each Class
    /// appears once, at its shortest distance, so cyclic ancestry terminates.
    pub(crate) fn ancestry(&self, class: NodeId) -> Result<Vec<Vec<NodeId>>> {
        let mut visited = FxHashSet::default();
        visited.insert(class);
        let mut levels = vec![vec![class]];
        loop {
            let mut next = Vec::new();
            for id in levels.last().map(Vec::as_slice).unwrap_or_default() {
                for link in self.class_links(*id)? {
                    if link.name != self.options.instance_of {
                        continue;
                    }
                    if link.target == class {
                        warn!(class = %class, via = %id, "schema.ancestry.cycle");
                    }
                    if visited.insert(link.target) {
                        next.push(link.target);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            levels.push(next);
        }
        Ok(levels)
    }

    pub(crate) fn fetch_nodes(&self, ids: &[NodeId]) -> Result<Vec<NodeRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let reads = ids
            .iter()
            .map(|id| Statement::MatchNodes {
                spec: MatchSpec::id(*id),
                limit: Some(1),
            })
            .collect();
        let nodes = self.run(Statement::Batch(reads))?.into_nodes();
        if nodes.len() != ids.len() {
            return Err(SchemaError::Store(format!(
                "expected {} nodes, store returned {}",
                ids.len(),
                nodes.len()
            )));
        }
        Ok(nodes)
    }

    fn attach_property(&self, owner: NodeId, def: &PropertyDef, index: i64) -> Result<NodeId> {
        let mut props = PropertyMap::new();
        props.insert(NAME_KEY.into(), Value::from(&def.name));
        props.insert(INDEX_KEY.into(), Value::Int(index));
        if let Some(dtype) = &def.dtype {
            props.insert(DTYPE_KEY.into(), Value::from(dtype));
        }
        if def.system {
            props.insert(SYSTEM_KEY.into(), Value::Bool(true));
        }
        let node = self
            .run(Statement::CreateNode {
                labels: vec![self.options.property_label.clone()],
                props,
            })?
            .into_nodes()
            .into_iter()
            .next()
            .ok_or_else(|| SchemaError::Store("property creation returned no row".into()))?;
        self.run(Statement::CreateEdges {
            from: MatchSpec::id(owner),
            to: MatchSpec::id(node.id).with_placeholder("m")?,
            rel_type: self.options.has_property.clone(),
            props: PropertyMap::new(),
            unique: true,
        })?;
        Ok(node.id)
    }

    fn check_new_relationship(
        &self,
        from: ClassRef,
        to: ClassRef,
        name: &str,
    ) -> Result<(ClassAttributes, ClassAttributes)> {
        require_name("relationship name", name)?;
        if name == self.options.has_property {
            return Err(SchemaError::argument(format!(
                "'{name}' is reserved for property declarations"
            )));
        }
        let source = self.get_class(from)?;
        let target = self.get_class(to)?;
        if self
            .class_links(source.id)?
            .iter()
            .any(|l| l.name == name && l.target == target.id)
        {
            return Err(SchemaError::conflict(format!(
                "relationship '{name}' from '{}' to '{}' already exists",
                source.name, target.name
            )));
        }
        Ok((source, target))
    }
}
