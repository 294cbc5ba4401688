#![forbid(unsafe_code)]

//! Engine options and the TOML configuration file.
//!
//! [`SchemaOptions`] names every label, relationship type, and reserved
//! property the engine writes, so a deployment can map the schema onto an
//! existing graph. [`Config`] is the on-disk file consumed by the CLI:
//!
//! ```toml
//! database = "graph.json"
//! log_level = "info"
//!
//! [schema]
//! class_label = "CLASS"
//! default_batch_size = 500
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of rows per tabular import batch.
pub const DEFAULT_BATCH_SIZE: usize = 256;

/// Names and defaults used by the schema engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaOptions {
    /// Label of Class nodes.
    pub class_label: String,
    /// Label of Property nodes.
    pub property_label: String,
    /// Label of intermediate Link nodes.
    pub link_label: String,
    /// Label of namespace counter nodes.
    pub namespace_label: String,
    /// Reserved data-node property holding the Class name.
    pub class_key: String,
    /// Reserved property holding an external identifier.
    pub uri_key: String,
    /// Key used to wrap a bare scalar during tree import.
    pub scalar_key: String,
    /// Ancestry relationship between Classes.
    pub instance_of: String,
    /// Relationship from a Class (or Link) to its Property nodes.
    pub has_property: String,
    /// Namespace from which Class uris are reserved.
    pub schema_namespace: String,
    /// Prefix of Class uris.
    pub schema_uri_prefix: String,
    /// Default rows per import batch.
    pub default_batch_size: usize,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            class_label: "CLASS".into(),
            property_label: "PROPERTY".into(),
            link_label: "LINK".into(),
            namespace_label: "NAMESPACE".into(),
            class_key: "_CLASS".into(),
            uri_key: "uri".into(),
            scalar_key: "value".into(),
            instance_of: "INSTANCE_OF".into(),
            has_property: "HAS_PROPERTY".into(),
            schema_namespace: "schema_node".into(),
            schema_uri_prefix: "schema-".into(),
            default_batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl SchemaOptions {
    /// Properties the engine owns on data nodes; never filtered by Class policy.
    pub fn reserved_keys(&self) -> [&str; 2] {
        [self.class_key.as_str(), self.uri_key.as_str()]
    }

    /// Rejects blank names and a zero batch size.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let names = [
            ("class_label", &self.class_label),
            ("property_label", &self.property_label),
            ("link_label", &self.link_label),
            ("namespace_label", &self.namespace_label),
            ("class_key", &self.class_key),
            ("uri_key", &self.uri_key),
            ("scalar_key", &self.scalar_key),
            ("instance_of", &self.instance_of),
            ("has_property", &self.has_property),
            ("schema_namespace", &self.schema_namespace),
        ];
        for (field, value) in names {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must not be blank".into(),
                });
            }
        }
        if self.class_key == self.uri_key {
            return Err(ConfigError::Invalid {
                field: "uri_key",
                reason: "must differ from class_key".into(),
            });
        }
        if self.default_batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "default_batch_size",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Contents of the configuration file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Snapshot file used when `--db` is not given.
    pub database: Option<PathBuf>,
    /// Tracing filter used when `--log-level` is not given.
    pub log_level: Option<String>,
    /// Engine options.
    pub schema: SchemaOptions,
}

impl Config {
    /// Loads `explicit`, or the per-user default file. A missing file yields
    /// the defaults; an unreadable or invalid one is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = explicit.map(Path::to_path_buf).or_else(default_config_path);
        let config = match path {
            Some(path) if path.exists() => read_file(&path)?,
            Some(path) if explicit.is_some() => {
                return Err(ConfigError::Read {
                    path,
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                })
            }
            _ => Config::default(),
        };
        config.schema.validate()?;
        Ok(config)
    }
}

fn read_file(path: &Path) -> Result<Config, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Per-user configuration file location.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("classgraph").join("config.toml"))
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for [`Config`].
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },
    /// A value is out of range.
    #[error("invalid schema option '{field}': {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "log_level = \"debug\"\n[schema]\nclass_label = \"SCHEMA_CLASS\"\ndefault_batch_size = 10"
        )
        .unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.schema.class_label, "SCHEMA_CLASS");
        assert_eq!(config.schema.default_batch_size, 10);
        assert_eq!(config.schema.class_key, "_CLASS");
        assert!(config.database.is_none());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[schema]\ndefault_batch_size = 0").unwrap();
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "default_batch_size", .. }));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(dir.path().join("nope.toml").as_path())).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_toml_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "schema = [").unwrap();
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }
}
