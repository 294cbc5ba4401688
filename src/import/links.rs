//! Tabular import of relationships between data nodes.

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Result, SchemaError};
use crate::query::MatchSpec;
use crate::schema::Schema;
use crate::store::{GraphStore, Statement};
use crate::types::{PropertyMap, Value};

use super::table::Table;

/// One side of a link import: rows are matched to data nodes of `class`
/// whose `key` property equals the row's `column` value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkEnd {
    /// Class of the nodes on this side.
    pub class: String,
    /// Column holding the join value.
    pub column: String,
    /// Node property compared with the join value.
    pub key: String,
}

impl LinkEnd {
    /// Joins on a property named like the column.
    pub fn new(class: impl Into<String>, column: impl Into<String>) -> Self {
        let column = column.into();
        Self {
            class: class.into(),
            key: column.clone(),
            column,
        }
    }

    /// Joins on a node property named differently from the column.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }
}

/// Options for [`Schema::import_links`].
#[derive(Clone, Debug, PartialEq)]
pub struct LinkImportOptions {
    /// Source side.
    pub from: LinkEnd,
    /// Destination side.
    pub to: LinkEnd,
    /// Relationship name; must be declared between the two Classes.
    pub relationship: String,
    /// Columns copied onto each relationship.
    pub properties: Vec<String>,
    /// Rows per store statement; the engine default when `None`.
    pub max_batch_size: Option<usize>,
}

impl LinkImportOptions {
    /// Links `from` to `to` through `relationship`.
    pub fn new(from: LinkEnd, to: LinkEnd, relationship: impl Into<String>) -> Self {
        Self {
            from,
            to,
            relationship: relationship.into(),
            properties: Vec::new(),
            max_batch_size: None,
        }
    }
}

/// Outcome of a link import.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LinkImportReport {
    /// Relationships created.
    pub created: usize,
    /// Rows with a missing join value on either side.
    pub skipped: usize,
    /// Store statements issued.
    pub batches: usize,
}

impl<S: GraphStore> Schema<S> {
    /// Creates one relationship per matching (source, destination) pair for
    /// every row of `table`, in batches of atomic statements.
    pub fn import_links(
        &self,
        table: &Table,
        options: &LinkImportOptions,
    ) -> Result<LinkImportReport> {
        let batch_size = self.batch_size(options.max_batch_size)?;
        let from = self.get_class(options.from.class.as_str())?;
        let to = self.get_class(options.to.class.as_str())?;
        if !self.class_relationship_allowed(from.id, to.id, &options.relationship)? {
            return Err(SchemaError::violation(format!(
                "relationship '{}' is not declared from '{}' to '{}'",
                options.relationship, from.name, to.name
            )));
        }
        for column in [&options.from.column, &options.to.column]
            .into_iter()
            .chain(options.properties.iter())
        {
            if table.column_index(column).is_none() {
                return Err(SchemaError::malformed(format!(
                    "column '{column}' does not exist"
                )));
            }
        }

        let class_key = self.options().class_key.clone();
        let mut report = LinkImportReport::default();
        let mut statements = Vec::with_capacity(batch_size);
        for row in 0..table.len() {
            let (Some(src), Some(dst)) = (
                join_value(table, row, &options.from.column),
                join_value(table, row, &options.to.column),
            ) else {
                report.skipped += 1;
                continue;
            };
            let props: PropertyMap = options
                .properties
                .iter()
                .filter_map(|c| {
                    table
                        .cell(row, c)
                        .filter(|v| !v.is_junk())
                        .map(|v| (c.clone(), v.clone()))
                })
                .collect();
            statements.push(Statement::CreateEdges {
                from: MatchSpec::builder()
                    .label(from.name.clone())
                    .key(class_key.clone(), from.name.clone())
                    .key(options.from.key.clone(), src)
                    .build()?,
                to: MatchSpec::builder()
                    .placeholder("m")
                    .label(to.name.clone())
                    .key(class_key.clone(), to.name.clone())
                    .key(options.to.key.clone(), dst)
                    .build()?,
                rel_type: options.relationship.clone(),
                props,
                unique: false,
            });
            if statements.len() >= batch_size {
                self.flush_link_batch(&mut statements, &mut report)?;
            }
        }
        if !statements.is_empty() {
            self.flush_link_batch(&mut statements, &mut report)?;
        }
        info!(
            from = %from.name,
            to = %to.name,
            rel = %options.relationship,
            created = report.created,
            skipped = report.skipped,
            batches = report.batches,
            "import.links.finished"
        );
        Ok(report)
    }

    fn flush_link_batch(
        &self,
        statements: &mut Vec<Statement>,
        report: &mut LinkImportReport,
    ) -> Result<()> {
        let rows = statements.len();
        let out = self.run(Statement::Batch(std::mem::take(statements)))?;
        report.batches += 1;
        report.created += out.stats.relationships_created;
        debug!(
            rows,
            created = out.stats.relationships_created,
            batch = report.batches,
            "import.links.batch"
        );
        Ok(())
    }
}

fn join_value(table: &Table, row: usize, column: &str) -> Option<Value> {
    table.cell(row, column).filter(|v| !v.is_junk()).cloned()
}
