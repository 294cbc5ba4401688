//! Row-oriented input for the tabular importers.

use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use indexmap::{IndexMap, IndexSet};

use crate::error::{Result, SchemaError};
use crate::types::{PropertyMap, Value};

/// Named columns over same-shaped rows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// An empty table with the given columns.
    pub fn new<I, C>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let mut seen = IndexSet::new();
        for column in &columns {
            if column.trim().is_empty() {
                return Err(SchemaError::argument("column name cannot be blank"));
            }
            if !seen.insert(column.as_str()) {
                return Err(SchemaError::argument(format!(
                    "column '{column}' appears twice"
                )));
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Appends a row; it must have one value per column.
    pub fn push_row<I, V>(&mut self, row: I) -> Result<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let row: Vec<Value> = row.into_iter().map(Into::into).collect();
        if row.len() != self.columns.len() {
            return Err(SchemaError::argument(format!(
                "row has {} values but the table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Builds a table from records; columns appear in first-seen order and
    /// missing cells are null.
    pub fn from_records<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = PropertyMap>,
    {
        let records: Vec<PropertyMap> = records.into_iter().collect();
        let mut columns: IndexSet<String> = IndexSet::new();
        for record in &records {
            columns.extend(record.keys().cloned());
        }
        let mut table = Table::new(columns.iter().cloned())?;
        for mut record in records {
            let row: Vec<Value> = columns
                .iter()
                .map(|c| record.shift_remove(c).unwrap_or(Value::Null))
                .collect();
            table.rows.push(row);
        }
        Ok(table)
    }

    /// Builds a table from equally long columns.
    pub fn from_columns<I, C>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (C, Vec<Value>)>,
        C: Into<String>,
    {
        let columns: Vec<(String, Vec<Value>)> =
            columns.into_iter().map(|(c, v)| (c.into(), v)).collect();
        let height = columns.first().map_or(0, |(_, v)| v.len());
        if let Some((name, values)) = columns.iter().find(|(_, v)| v.len() != height) {
            return Err(SchemaError::argument(format!(
                "column '{name}' has {} values, expected {height}",
                values.len()
            )));
        }
        let mut table = Table::new(columns.iter().map(|(c, _)| c.clone()))?;
        table.rows = (0..height)
            .map(|i| columns.iter().map(|(_, v)| v[i].clone()).collect())
            .collect();
        Ok(table)
    }

    /// Reads a CSV file with a header row.
    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_csv_reader(file)
    }

    /// Reads CSV with a header row. Cells are sniffed into null, booleans,
    /// integers, floats, or strings; an empty cell is null.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = reader.headers()?.clone();
        let mut table = Table::new(headers.iter().map(str::trim))?;
        for record in reader.records() {
            let record = record?;
            let row: Vec<Value> = (0..table.columns.len())
                .map(|i| record.get(i).map_or(Value::Null, Value::parse_text))
                .collect();
            table.rows.push(row);
        }
        Ok(table)
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// One cell.
    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Row `i` as a property map with junk cells removed.
    pub fn record(&self, i: usize) -> Option<PropertyMap> {
        let row = self.rows.get(i)?;
        Some(
            self.columns
                .iter()
                .zip(row)
                .filter(|(_, v)| !v.is_junk())
                .map(|(c, v)| (c.clone(), v.clone()))
                .collect(),
        )
    }

    /// Every row as a property map with junk cells removed.
    pub fn records(&self) -> impl Iterator<Item = PropertyMap> + '_ {
        (0..self.rows.len()).filter_map(|i| self.record(i))
    }

    /// Renames columns; names not present are ignored. A rename producing a
    /// duplicate column name is rejected.
    pub fn rename(&mut self, mapping: &IndexMap<String, String>) -> Result<()> {
        let renamed: Vec<String> = self
            .columns
            .iter()
            .map(|c| mapping.get(c).cloned().unwrap_or_else(|| c.clone()))
            .collect();
        let unique: IndexSet<&String> = renamed.iter().collect();
        if unique.len() != renamed.len() {
            return Err(SchemaError::malformed(
                "renaming would produce duplicate column names",
            ));
        }
        self.columns = renamed;
        Ok(())
    }

    /// Removes the named columns; every name must exist.
    pub fn drop_columns(&mut self, names: &[String]) -> Result<()> {
        let doomed = self.positions(names)?;
        self.retain_positions(|i| !doomed.contains(&i));
        Ok(())
    }

    /// Keeps only the named columns, in their original order; every name must
    /// exist.
    pub fn select_columns(&mut self, names: &[String]) -> Result<()> {
        let kept = self.positions(names)?;
        self.retain_positions(|i| kept.contains(&i));
        Ok(())
    }

    fn positions(&self, names: &[String]) -> Result<Vec<usize>> {
        names
            .iter()
            .map(|n| {
                self.column_index(n).ok_or_else(|| {
                    SchemaError::malformed(format!("column '{n}' does not exist"))
                })
            })
            .collect()
    }

    fn retain_positions(&mut self, keep: impl Fn(usize) -> bool) {
        let keep_mask: Vec<bool> = (0..self.columns.len()).map(&keep).collect();
        let mut i = 0;
        self.columns.retain(|_| {
            let k = keep_mask[i];
            i += 1;
            k
        });
        for row in &mut self.rows {
            let mut i = 0;
            row.retain(|_| {
                let k = keep_mask[i];
                i += 1;
                k
            });
        }
    }
}
