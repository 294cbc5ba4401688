//! Property Resolver: which property names a Class allows.

use rustc_hash::FxHashSet;
use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::store::GraphStore;
use crate::types::PropertyMap;

use super::{ClassAttributes, ClassRef, PropertyInfo, Schema};

/// Order of inherited properties relative to the Class's own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Own properties first, then nearer ancestors before farther ones.
    #[default]
    Asc,
    /// Farthest ancestors first, own properties last.
    Desc,
}

impl FromStr for SortOrder {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(SortOrder::Asc),
            "DESC" => Ok(SortOrder::Desc),
            other => Err(SchemaError::argument(format!(
                "sort order must be 'ASC' or 'DESC' (got '{other}')"
            ))),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        })
    }
}

impl<S: GraphStore> Schema<S> {
    /// Property names of a Class.
    ///
    /// Own properties come in stored order. With `include_ancestors`, the
    /// ancestry is walked level by level and each ancestor's properties are
    /// appended; a name keeps its first position. `exclude_system` drops any
    /// name flagged as a system property at any traversed level.
    pub fn get_class_properties(
        &self,
        class: impl Into<ClassRef>,
        include_ancestors: bool,
        sort: SortOrder,
        exclude_system: bool,
    ) -> Result<Vec<String>> {
        let attrs = self.get_class(class)?;
        let mut levels = if include_ancestors {
            self.ancestry(attrs.id)?
        } else {
            vec![vec![attrs.id]]
        };
        if sort == SortOrder::Desc {
            levels.reverse();
        }
        let mut seen = FxHashSet::default();
        let mut system = FxHashSet::default();
        let mut names = Vec::new();
        for level in levels {
            for class_id in level {
                for prop in self.class_property_info(class_id)? {
                    if prop.system {
                        system.insert(prop.name.clone());
                    }
                    if seen.insert(prop.name.clone()) {
                        names.push(prop.name);
                    }
                }
            }
        }
        if exclude_system {
            names.retain(|name| !system.contains(name));
        }
        Ok(names)
    }

    /// Property nodes declared directly on a Class, in stored order.
    pub fn get_class_property_info(&self, class: impl Into<ClassRef>) -> Result<Vec<PropertyInfo>> {
        let attrs = self.get_class(class)?;
        self.class_property_info(attrs.id)
    }

    /// True if a data node of `class` may carry `property`: always for lax
    /// Classes, otherwise only when declared on the Class or an ancestor.
    pub fn is_property_allowed(&self, property: &str, class: impl Into<ClassRef>) -> Result<bool> {
        let attrs = self.get_class(class)?;
        if !attrs.is_strict() {
            return Ok(true);
        }
        Ok(self.is_reserved(property) || self.declared_names(&attrs)?.contains(property))
    }

    /// Filters `requested` down to what `class` allows.
    ///
    /// Lax Classes pass everything through. For strict Classes a disallowed
    /// key is either dropped (`silently_drop`) or reported as a schema
    /// violation naming every offending key. Reserved keys are always allowed.
    pub fn allowable_props(
        &self,
        class: impl Into<ClassRef>,
        requested: &PropertyMap,
        silently_drop: bool,
    ) -> Result<PropertyMap> {
        let attrs = self.get_class(class)?;
        self.allowable_for(&attrs, requested, silently_drop)
    }

    pub(crate) fn allowable_for(
        &self,
        attrs: &ClassAttributes,
        requested: &PropertyMap,
        silently_drop: bool,
    ) -> Result<PropertyMap> {
        if !attrs.is_strict() {
            return Ok(requested.clone());
        }
        let declared = self.declared_names(attrs)?;
        let (allowed, rejected): (Vec<_>, Vec<_>) = requested
            .iter()
            .partition(|(k, _)| self.is_reserved(k) || declared.contains(k.as_str()));
        if !rejected.is_empty() {
            let keys: Vec<&str> = rejected.iter().map(|(k, _)| k.as_str()).collect();
            if !silently_drop {
                return Err(SchemaError::violation(format!(
                    "class '{}' does not allow properties: {}",
                    attrs.name,
                    keys.join(", ")
                )));
            }
            debug!(class = %attrs.name, dropped = ?keys, "schema.properties.dropped");
        }
        Ok(allowed
            .into_iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn declared_names(&self, attrs: &ClassAttributes) -> Result<FxHashSet<String>> {
        Ok(self
            .get_class_properties(attrs.id, true, SortOrder::Asc, false)?
            .into_iter()
            .collect())
    }

    pub(crate) fn is_reserved(&self, key: &str) -> bool {
        self.options.reserved_keys().contains(&key)
    }
}
