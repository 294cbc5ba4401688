#![forbid(unsafe_code)]

//! Namespace Allocator.
//!
//! One counter node per namespace holds `next_count` (starting at 1) and the
//! optional `prefix`/`suffix` remembered at creation. Allocation is a single
//! `Increment` statement, which reads the current count and advances it in
//! one atomic step; concurrent callers therefore never receive the same
//! number.

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Result, SchemaError};
use crate::query::MatchSpec;
use crate::schema::Schema;
use crate::store::{DuplicatePolicy, GraphStore, NodeRecord, Row, Statement, UpsertOutcome};
use crate::types::{PropertyMap, Value};

const NAMESPACE_KEY: &str = "namespace";
const COUNT_KEY: &str = "next_count";
const PREFIX_KEY: &str = "prefix";
const SUFFIX_KEY: &str = "suffix";

/// Result of advancing a counter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Allocation {
    /// The allocated number.
    pub count: i64,
    /// Stored prefix, if any.
    pub prefix: Option<String>,
    /// Stored suffix, if any.
    pub suffix: Option<String>,
}

impl Allocation {
    /// Formats `prefix + count + suffix`.
    pub fn format(&self) -> String {
        format!(
            "{}{}{}",
            self.prefix.as_deref().unwrap_or_default(),
            self.count,
            self.suffix.as_deref().unwrap_or_default()
        )
    }
}

/// A counter record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NamespaceInfo {
    /// Namespace name.
    pub name: String,
    /// Next number to be handed out.
    pub next_count: i64,
    /// Stored prefix.
    pub prefix: Option<String>,
    /// Stored suffix.
    pub suffix: Option<String>,
}

impl NamespaceInfo {
    fn from_node(node: &NodeRecord) -> Option<Self> {
        Some(Self {
            name: node.get(NAMESPACE_KEY)?.as_str()?.to_string(),
            next_count: node.get(COUNT_KEY)?.as_i64()?,
            prefix: node.get(PREFIX_KEY).and_then(Value::as_str).map(str::to_string),
            suffix: node.get(SUFFIX_KEY).and_then(Value::as_str).map(str::to_string),
        })
    }
}

impl<S: GraphStore> Schema<S> {
    /// Creates a counter at 1; fails if the name is blank or already used.
    pub fn create_namespace(
        &self,
        name: &str,
        prefix: Option<&str>,
        suffix: Option<&str>,
    ) -> Result<()> {
        if name.trim().is_empty() {
            return Err(SchemaError::argument("namespace name cannot be blank"));
        }
        if self.ensure_namespace(name, prefix, suffix)? {
            info!(namespace = name, prefix = ?prefix, suffix = ?suffix, "namespace.created");
            Ok(())
        } else {
            Err(SchemaError::conflict(format!(
                "namespace '{name}' already exists"
            )))
        }
    }

    /// True if the namespace has a counter.
    pub fn namespace_exists(&self, name: &str) -> Result<bool> {
        let out = self.run(Statement::MatchNodes {
            spec: self.namespace_spec(name)?,
            limit: Some(1),
        })?;
        Ok(!out.rows.is_empty())
    }

    /// Every counter, sorted by name.
    pub fn list_namespaces(&self) -> Result<Vec<NamespaceInfo>> {
        let nodes = self
            .store()
            .find_nodes(MatchSpec::label(self.options().namespace_label.clone())?)?;
        let mut all: Vec<NamespaceInfo> = nodes.iter().filter_map(NamespaceInfo::from_node).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    /// Deletes a counter; returns false if it did not exist.
    pub fn delete_namespace(&self, name: &str) -> Result<bool> {
        let out = self.run(Statement::DeleteNodes {
            spec: self.namespace_spec(name)?,
        })?;
        let deleted = out.stats.nodes_deleted > 0;
        if deleted {
            info!(namespace = name, "namespace.deleted");
        }
        Ok(deleted)
    }

    /// Returns the current count with the stored prefix/suffix and advances
    /// the counter by `advance` (at least 1) in the same statement.
    pub fn advance_autoincrement(&self, namespace: &str, advance: i64) -> Result<Allocation> {
        if advance < 1 {
            return Err(SchemaError::argument(format!(
                "advance must be at least 1 (got {advance})"
            )));
        }
        let out = self.run(Statement::Increment {
            spec: self.namespace_spec(namespace)?,
            key: COUNT_KEY.into(),
            by: advance,
        })?;
        let before = out
            .into_nodes()
            .into_iter()
            .next()
            .ok_or_else(|| SchemaError::UnknownNamespace(namespace.to_string()))?;
        let info = NamespaceInfo::from_node(&before).ok_or_else(|| {
            SchemaError::Store(format!("namespace '{namespace}' has a malformed counter"))
        })?;
        debug!(namespace, count = info.next_count, advance, "namespace.advanced");
        Ok(Allocation {
            count: info.next_count,
            prefix: info.prefix,
            suffix: info.suffix,
        })
    }

    /// Allocates the next identifier as `prefix + count + suffix`. An explicit
    /// prefix or suffix replaces the stored one for this call only.
    pub fn reserve_next_uri(
        &self,
        namespace: &str,
        prefix: Option<&str>,
        suffix: Option<&str>,
    ) -> Result<String> {
        let mut allocation = self.advance_autoincrement(namespace, 1)?;
        if let Some(prefix) = prefix {
            allocation.prefix = Some(prefix.to_string());
        }
        if let Some(suffix) = suffix {
            allocation.suffix = Some(suffix.to_string());
        }
        Ok(allocation.format())
    }

    /// Creates the counter unless it exists; returns true if it was created.
    pub(crate) fn ensure_namespace(
        &self,
        name: &str,
        prefix: Option<&str>,
        suffix: Option<&str>,
    ) -> Result<bool> {
        let mut props = PropertyMap::new();
        props.insert(COUNT_KEY.into(), Value::Int(1));
        if let Some(prefix) = prefix {
            props.insert(PREFIX_KEY.into(), Value::from(prefix));
        }
        if let Some(suffix) = suffix {
            props.insert(SUFFIX_KEY.into(), Value::from(suffix));
        }
        let out = self.run(Statement::UpsertNode {
            labels: vec![self.options().namespace_label.clone()],
            key: NAMESPACE_KEY.into(),
            value: Value::from(name),
            props,
            policy: DuplicatePolicy::Skip,
            keep: Vec::new(),
        })?;
        Ok(matches!(
            out.rows.first(),
            Some(Row::Upserted {
                outcome: UpsertOutcome::Created,
                ..
            })
        ))
    }

    pub(crate) fn reserve_schema_uri(&self) -> Result<String> {
        let namespace = self.options().schema_namespace.clone();
        let prefix = self.options().schema_uri_prefix.clone();
        self.ensure_namespace(&namespace, Some(&prefix), None)?;
        self.reserve_next_uri(&namespace, None, None)
    }

    fn namespace_spec(&self, name: &str) -> Result<MatchSpec> {
        MatchSpec::key(self.options().namespace_label.clone(), NAMESPACE_KEY, name)
    }
}
