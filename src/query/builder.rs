//! Fluent builder for [`MatchSpec`].

use crate::error::{Result, SchemaError};
use crate::types::{NodeId, PropertyMap, Value};

use super::predicate::{Predicate, PredicateBuilder};
use super::spec::{validate_placeholder, validate_raw_params, MatchSpec, RawClause};

/// Fluent builder; the first error is remembered and returned by [`build`](Self::build).
#[derive(Default)]
pub struct MatchSpecBuilder {
    labels: Vec<String>,
    id: Option<NodeId>,
    props: PropertyMap,
    predicate: Option<Predicate>,
    raw: Option<RawClause>,
    placeholder: Option<String>,
    error: Option<SchemaError>,
}

impl MatchSpecBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    fn record_error(&mut self, err: SchemaError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// Requires a label on the matched node.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        if label.trim().is_empty() {
            self.record_error(SchemaError::malformed("label cannot be blank"));
        } else if label.contains('`') {
            self.record_error(SchemaError::malformed(format!(
                "label '{label}' contains a backtick"
            )));
        } else if !self.labels.contains(&label) {
            self.labels.push(label);
        }
        self
    }

    /// Requires every label in `labels`.
    pub fn labels<I, L>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        for label in labels {
            self = self.label(label);
        }
        self
    }

    /// Targets a single node by internal identity. Overrides every other
    /// constraint when the spec is evaluated or rendered.
    pub fn id(mut self, id: NodeId) -> Self {
        self.id = Some(id);
        self
    }

    /// Requires `key = value`.
    pub fn key(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key.trim().is_empty() {
            self.record_error(SchemaError::malformed("property key cannot be blank"));
            return self;
        }
        let value = value.into();
        if matches!(value, Value::Null) {
            self.record_error(SchemaError::malformed(format!(
                "property '{key}' cannot be matched against null"
            )));
            return self;
        }
        self.props.insert(key, value);
        self
    }

    /// Requires every entry of `props`.
    pub fn props(mut self, props: &PropertyMap) -> Self {
        for (k, v) in props {
            self = self.key(k.clone(), v.clone());
        }
        self
    }

    /// Adds typed predicates, ANDed with any previously added ones.
    pub fn filter<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut PredicateBuilder),
    {
        if self.error.is_some() {
            return self;
        }
        let mut builder = PredicateBuilder::new();
        build(&mut builder);
        match builder.finish() {
            Ok(Some(expr)) => {
                self.predicate = Some(match self.predicate.take() {
                    Some(Predicate::And(mut args)) => {
                        args.push(expr);
                        Predicate::And(args)
                    }
                    Some(other) => Predicate::And(vec![other, expr]),
                    None => expr,
                });
            }
            Ok(None) => {
                self.record_error(SchemaError::malformed("filter requires at least one predicate"))
            }
            Err(err) => self.record_error(err),
        }
        self
    }

    /// Adds a free-form sub-condition without parameters.
    pub fn raw(self, text: impl Into<String>) -> Self {
        self.raw_with(text, PropertyMap::new())
    }

    /// Adds a free-form sub-condition with its own parameters.
    pub fn raw_with(mut self, text: impl Into<String>, params: PropertyMap) -> Self {
        let text = text.into();
        if text.trim().is_empty() {
            self.record_error(SchemaError::malformed("raw sub-condition cannot be blank"));
            return self;
        }
        if self.raw.is_some() {
            self.record_error(SchemaError::malformed(
                "only one raw sub-condition is allowed per specification",
            ));
            return self;
        }
        self.raw = Some(RawClause { text, params });
        self
    }

    /// Binds the node to a placeholder other than `n`.
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Validates and produces the specification.
    pub fn build(self) -> Result<MatchSpec> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let mut spec = MatchSpec::any();
        if let Some(placeholder) = self.placeholder {
            validate_placeholder(&placeholder)?;
            spec.placeholder = placeholder;
        }
        if let Some(raw) = &self.raw {
            validate_raw_params(&spec.placeholder, &raw.params)?;
        }
        spec.labels = self.labels;
        spec.id = self.id;
        spec.props = self.props;
        spec.predicate = self.predicate;
        spec.raw = self.raw;
        Ok(spec)
    }
}
