#![forbid(unsafe_code)]

//! Bulk import into the schema: nested values ([`tree`]), tabular node rows
//! ([`nodes`]) and tabular relationship rows ([`links`]).

/// Relationship rows.
pub mod links;
/// Node rows.
pub mod nodes;
/// Tabular input.
pub mod table;
/// Nested values.
pub mod tree;

pub use links::{LinkEnd, LinkImportOptions, LinkImportReport};
pub use nodes::{NodeImportOptions, NodeImportReport};
pub use table::Table;
pub use tree::TreeImportOptions;
