#![forbid(unsafe_code)]

//! Error taxonomy for schema, import, and allocation operations.
//!
//! Every failure is raised at the point of detection and names the offending
//! Class, property, key, or namespace. Nothing is retried and nothing is
//! compensated automatically: multi-statement operations that fail halfway
//! report what they already created through [`SchemaError::PartialImport`].

use std::fmt;

use thiserror::Error;

use crate::types::NodeId;

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Errors raised by the schema engine and the stores it drives.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A strict Class rejected requested properties, or a relationship is not
    /// declared between two Classes (directly or through ancestry).
    #[error("schema violation: {0}")]
    SchemaViolation(String),
    /// Referenced Class does not exist.
    #[error("unknown class '{0}'")]
    UnknownClass(String),
    /// Referenced namespace does not exist.
    #[error("unknown namespace '{0}'")]
    UnknownNamespace(String),
    /// Referenced data node does not exist or is not a data node.
    #[error("unknown node: {0}")]
    UnknownNode(String),
    /// A match specification or import configuration is internally inconsistent.
    #[error("malformed specification: {0}")]
    MalformedSpecification(String),
    /// An operation that assumes uniqueness found duplicates.
    #[error("integrity conflict: {0}")]
    IntegrityConflict(String),
    /// Safe delete refused because data nodes still reference the Class.
    #[error("class '{class}' still has {count} data node(s)")]
    ClassInUse {
        /// Class name.
        class: String,
        /// Number of bound data nodes.
        count: usize,
    },
    /// Caller passed a value of the wrong shape.
    #[error("invalid argument: {0}")]
    Argument(String),
    /// A multi-statement import failed after creating some nodes. The created
    /// identities are listed so the caller can compensate.
    #[error("import aborted after creating {} node(s): {source}", .created.len())]
    PartialImport {
        /// Nodes created before the failure, in creation order.
        created: Vec<NodeId>,
        /// The failure that stopped the import.
        #[source]
        source: Box<SchemaError>,
    },
    /// The graph store failed to execute a statement.
    #[error("store error: {0}")]
    Store(String),
    /// I/O error while reading inputs or persisting snapshots.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// JSON encoding or decoding error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// CSV parsing error.
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl SchemaError {
    pub(crate) fn violation(msg: impl Into<String>) -> Self {
        SchemaError::SchemaViolation(msg.into())
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        SchemaError::MalformedSpecification(msg.into())
    }

    pub(crate) fn conflict(msg: impl Into<String>) -> Self {
        SchemaError::IntegrityConflict(msg.into())
    }

    pub(crate) fn argument(msg: impl Into<String>) -> Self {
        SchemaError::Argument(msg.into())
    }

    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::SchemaViolation(_) => "SchemaViolation",
            SchemaError::UnknownClass(_) => "UnknownClass",
            SchemaError::UnknownNamespace(_) => "UnknownNamespace",
            SchemaError::UnknownNode(_) => "UnknownNode",
            SchemaError::MalformedSpecification(_) => "MalformedSpecification",
            SchemaError::IntegrityConflict(_) => "IntegrityConflict",
            SchemaError::ClassInUse { .. } => "ClassInUse",
            SchemaError::Argument(_) => "ArgumentError",
            SchemaError::PartialImport { .. } => "PartialImport",
            SchemaError::Store(_) => "StoreError",
            SchemaError::Io(_) => "IoError",
            SchemaError::Json(_) => "JsonError",
            SchemaError::Csv(_) => "CsvError",
        }
    }

    /// Identities created before the failure, if this error carries any.
    pub fn created_nodes(&self) -> &[NodeId] {
        match self {
            SchemaError::PartialImport { created, .. } => created,
            _ => &[],
        }
    }

    /// Unwraps [`SchemaError::PartialImport`] down to the original failure.
    pub fn root_cause(&self) -> &SchemaError {
        match self {
            SchemaError::PartialImport { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Formats an error prefixed with its code, e.g. `[UnknownClass] unknown class 'X'`.
pub struct SchemaErrorWithCode<'a>(pub &'a SchemaError);

impl fmt::Display for SchemaErrorWithCode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.0.code(), self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_import_exposes_created_and_root_cause() {
        let err = SchemaError::PartialImport {
            created: vec![NodeId(3), NodeId(4)],
            source: Box::new(SchemaError::violation("property 'x' not allowed")),
        };
        assert_eq!(err.created_nodes(), &[NodeId(3), NodeId(4)]);
        assert_eq!(err.root_cause().code(), "SchemaViolation");
        assert!(err.to_string().starts_with("import aborted after creating 2 node(s)"));
    }

    #[test]
    fn code_prefix_formatting() {
        let err = SchemaError::UnknownClass("Car".into());
        assert_eq!(
            SchemaErrorWithCode(&err).to_string(),
            "[UnknownClass] unknown class 'Car'"
        );
    }
}
