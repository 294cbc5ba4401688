//! Tabular import of data nodes.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Result, SchemaError};
use crate::schema::{ClassRef, Schema};
use crate::store::{DuplicatePolicy, GraphStore, Row, Statement, UpsertOutcome};
use crate::types::{NodeId, PropertyMap};

use super::table::Table;

/// Options for [`Schema::import_nodes`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeImportOptions {
    /// Column identifying a row across imports; enables the duplicate policy.
    pub primary_key: Option<String>,
    /// Column renames, applied first.
    pub rename: IndexMap<String, String>,
    /// Columns to discard, applied after renaming.
    pub drop: Vec<String>,
    /// Columns to keep, applied after renaming. Exclusive with `drop`.
    pub select: Vec<String>,
    /// Treatment of rows whose primary key already exists.
    pub duplicates: DuplicatePolicy,
    /// Rows per store statement; the engine default when `None`.
    pub max_batch_size: Option<usize>,
    /// Labels added to every created node.
    pub extra_labels: Vec<String>,
    /// Drop columns a strict Class does not declare instead of failing.
    pub silently_drop: bool,
}

impl NodeImportOptions {
    /// Options keyed on `primary_key` with the given duplicate policy.
    pub fn keyed(primary_key: impl Into<String>, duplicates: DuplicatePolicy) -> Self {
        Self {
            primary_key: Some(primary_key.into()),
            duplicates,
            ..Self::default()
        }
    }

    /// Sets the batch size.
    pub fn batch_size(mut self, rows: usize) -> Self {
        self.max_batch_size = Some(rows);
        self
    }
}

/// Outcome of a node import.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct NodeImportReport {
    /// Nodes newly created.
    pub created: usize,
    /// Identities written (created or updated), in row order; a repeated
    /// primary key appears once per row.
    pub touched: Vec<NodeId>,
    /// Rows left unwritten: existing keys under the skip policy and rows with
    /// no usable primary key.
    pub skipped: usize,
    /// Store statements issued.
    pub batches: usize,
}

impl<S: GraphStore> Schema<S> {
    /// Imports one data node per row of `table` into `class`.
    ///
    /// Column transforms run in the order rename, drop, select. The Class
    /// policy is checked once against the resulting column set. Rows are sent
    /// in batches, one atomic statement per batch; a failing batch leaves
    /// earlier batches committed. With a primary key, each row is a keyed
    /// write evaluated against the store as it stands after the previous row,
    /// so the outcome does not depend on the batch size.
    pub fn import_nodes(
        &self,
        class: impl Into<ClassRef>,
        table: &Table,
        options: &NodeImportOptions,
    ) -> Result<NodeImportReport> {
        let attrs = self.instantiable(class)?;
        let batch_size = self.batch_size(options.max_batch_size)?;
        let table = self.prepare_node_table(table, options)?;

        let columns: PropertyMap = table
            .columns()
            .iter()
            .map(|c| (c.clone(), crate::types::Value::Null))
            .collect();
        let allowed = self.allowable_props(attrs.id, &columns, options.silently_drop)?;
        if let Some(pk) = &options.primary_key {
            if !allowed.contains_key(pk) {
                return Err(SchemaError::violation(format!(
                    "primary key '{pk}' is not a property of class '{}'",
                    attrs.name
                )));
            }
        }

        let labels = self.data_labels(&attrs, &options.extra_labels);
        let keep: Vec<String> = self
            .options()
            .reserved_keys()
            .iter()
            .map(|k| k.to_string())
            .collect();
        let mut report = NodeImportReport::default();
        let mut statements = Vec::with_capacity(batch_size);
        for mut record in table.records() {
            record.retain(|k, _| allowed.contains_key(k));
            let props = self.data_props(&attrs, &record, true)?;
            let statement = match &options.primary_key {
                None => Statement::CreateNode {
                    labels: labels.clone(),
                    props,
                },
                Some(pk) => match props.get(pk) {
                    Some(value) => Statement::UpsertNode {
                        labels: labels.clone(),
                        key: pk.clone(),
                        value: value.clone(),
                        props,
                        policy: options.duplicates,
                        keep: keep.clone(),
                    },
                    None => {
                        report.skipped += 1;
                        debug!(class = %attrs.name, "import.nodes.row_without_key");
                        continue;
                    }
                },
            };
            statements.push(statement);
            if statements.len() >= batch_size {
                self.flush_node_batch(&attrs.name, &mut statements, &mut report)?;
            }
        }
        if !statements.is_empty() {
            self.flush_node_batch(&attrs.name, &mut statements, &mut report)?;
        }
        info!(
            class = %attrs.name,
            rows = table.len(),
            created = report.created,
            touched = report.touched.len(),
            skipped = report.skipped,
            batches = report.batches,
            "import.nodes.finished"
        );
        Ok(report)
    }

    fn prepare_node_table(&self, table: &Table, options: &NodeImportOptions) -> Result<Table> {
        if !options.drop.is_empty() && !options.select.is_empty() {
            return Err(SchemaError::malformed(
                "'drop' and 'select' cannot be combined",
            ));
        }
        if let Some(pk) = &options.primary_key {
            if options.drop.contains(pk) {
                return Err(SchemaError::malformed(format!(
                    "primary key '{pk}' is also dropped"
                )));
            }
            if !options.select.is_empty() && !options.select.contains(pk) {
                return Err(SchemaError::malformed(format!(
                    "primary key '{pk}' is not selected"
                )));
            }
        }
        let mut table = table.clone();
        table.rename(&options.rename)?;
        if !options.drop.is_empty() {
            table.drop_columns(&options.drop)?;
        }
        if !options.select.is_empty() {
            table.select_columns(&options.select)?;
        }
        if let Some(pk) = &options.primary_key {
            if table.column_index(pk).is_none() {
                return Err(SchemaError::malformed(format!(
                    "primary key '{pk}' is not a column"
                )));
            }
        }
        Ok(table)
    }

    fn flush_node_batch(
        &self,
        class: &str,
        statements: &mut Vec<Statement>,
        report: &mut NodeImportReport,
    ) -> Result<()> {
        let rows = statements.len();
        let out = self.run(Statement::Batch(std::mem::take(statements)))?;
        report.batches += 1;
        for row in out.rows {
            match row {
                Row::Node(node) => {
                    report.created += 1;
                    report.touched.push(node.id);
                }
                Row::Upserted { node, outcome } => {
                    if outcome == UpsertOutcome::Created {
                        report.created += 1;
                    }
                    if outcome.touched() {
                        report.touched.push(node.id);
                    } else {
                        report.skipped += 1;
                    }
                }
                Row::Edge(_) => {}
            }
        }
        debug!(class, rows, batch = report.batches, "import.nodes.batch");
        Ok(())
    }

    pub(crate) fn batch_size(&self, requested: Option<usize>) -> Result<usize> {
        match requested {
            Some(0) => Err(SchemaError::argument("max_batch_size must be at least 1")),
            Some(n) => Ok(n),
            None => Ok(self.options().default_batch_size.max(1)),
        }
    }
}
