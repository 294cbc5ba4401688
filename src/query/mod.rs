#![forbid(unsafe_code)]

//! Match specifications and their Cypher fragments.
//!
//! A [`MatchSpec`] describes "which node(s)" a statement targets. It is built
//! only through validated builders and renders to a 4-part
//! [`MatchFragments`]: node pattern, condition clause, parameter map, and
//! placeholder. Several specs can be checked for placeholder collisions and
//! combined into one joint condition.

/// Fluent construction of match specifications.
pub mod builder;

/// Typed property predicates.
pub mod predicate;

/// The match specification value type and its rendering.
pub mod spec;

use std::collections::HashSet;

use crate::error::{Result, SchemaError};
use crate::types::PropertyMap;

pub use builder::MatchSpecBuilder;
pub use predicate::{Comparison, Predicate, PredicateBuilder};
pub use spec::{MatchFragments, MatchSpec, RawClause, DEFAULT_PLACEHOLDER};

/// Quotes a label, relationship type, or property name for Cypher.
pub fn cypher_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Fails if two specifications share a placeholder name.
pub fn check_compatible(specs: &[&MatchSpec]) -> Result<()> {
    let mut seen = HashSet::new();
    for spec in specs {
        if !seen.insert(spec.placeholder()) {
            return Err(SchemaError::malformed(format!(
                "placeholder '{}' is used by more than one match specification",
                spec.placeholder()
            )));
        }
    }
    Ok(())
}

/// Combines the condition clauses of several specifications.
///
/// Non-blank clauses are parenthesized and ANDed; the result is blank when
/// every clause is blank. Parameter maps are merged; a parameter name bound by
/// two specifications is rejected.
pub fn combine(specs: &[&MatchSpec]) -> Result<(String, PropertyMap)> {
    check_compatible(specs)?;
    let mut clauses = Vec::new();
    let mut params = PropertyMap::new();
    for spec in specs {
        let fragments = spec.fragments();
        if !fragments.condition.trim().is_empty() {
            clauses.push(format!("({})", fragments.condition));
        }
        for (name, value) in fragments.parameters {
            if params.contains_key(&name) {
                return Err(SchemaError::malformed(format!(
                    "parameter '{name}' is bound by more than one match specification"
                )));
            }
            params.insert(name, value);
        }
    }
    Ok((clauses.join(" AND "), params))
}
