//! Match specifications: the declarative "which nodes" half of every statement.

use crate::error::{Result, SchemaError};
use crate::types::{NodeId, PropertyMap, Value};

use super::builder::MatchSpecBuilder;
use super::cypher_ident;
use super::predicate::Predicate;

/// Placeholder used when the caller does not pick one.
pub const DEFAULT_PLACEHOLDER: &str = "n";

/// Free-form sub-condition supplied as Cypher text plus its parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct RawClause {
    /// Condition text, without a leading `WHERE`.
    pub text: String,
    /// Parameters referenced by the text.
    pub params: PropertyMap,
}

/// Immutable description of a set of nodes.
///
/// Only constructed through [`MatchSpec::builder`] or the shorthands below, so
/// every instance has passed validation (non-blank labels and keys, a valid
/// placeholder, no raw parameter reusing the generated-name prefix).
#[derive(Clone, Debug, PartialEq)]
pub struct MatchSpec {
    pub(crate) labels: Vec<String>,
    pub(crate) id: Option<NodeId>,
    pub(crate) props: PropertyMap,
    pub(crate) predicate: Option<Predicate>,
    pub(crate) raw: Option<RawClause>,
    pub(crate) placeholder: String,
}

/// Rendered form of a [`MatchSpec`], ready to splice into a Cypher statement.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchFragments {
    /// Node pattern, e.g. ``(n:`City` {`name`: $n_par_1})``.
    pub pattern: String,
    /// Condition clause without the `WHERE` keyword; empty when unconstrained.
    pub condition: String,
    /// Parameters referenced by the pattern and the condition.
    pub parameters: PropertyMap,
    /// Placeholder bound to the node.
    pub placeholder: String,
}

impl MatchSpec {
    /// Starts a validated builder.
    pub fn builder() -> MatchSpecBuilder {
        MatchSpecBuilder::new()
    }

    /// Matches every node.
    pub fn any() -> Self {
        Self {
            labels: Vec::new(),
            id: None,
            props: PropertyMap::new(),
            predicate: None,
            raw: None,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }

    /// Matches the node with the given internal identity.
    pub fn id(id: NodeId) -> Self {
        Self {
            id: Some(id),
            ..Self::any()
        }
    }

    /// Matches every node carrying `label`.
    pub fn label(label: impl Into<String>) -> Result<Self> {
        Self::builder().label(label).build()
    }

    /// Matches nodes carrying `label` whose `key` property equals `value`.
    pub fn key(
        label: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Self> {
        Self::builder().label(label).key(key, value).build()
    }

    /// Returns a copy bound to a different placeholder.
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Result<Self> {
        let placeholder = placeholder.into();
        validate_placeholder(&placeholder)?;
        if let Some(raw) = &self.raw {
            validate_raw_params(&placeholder, &raw.params)?;
        }
        self.placeholder = placeholder;
        Ok(self)
    }

    /// Required labels.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Internal identity, when the spec targets a single node.
    pub fn node_id(&self) -> Option<NodeId> {
        self.id
    }

    /// Required property values.
    pub fn properties(&self) -> &PropertyMap {
        &self.props
    }

    /// Typed predicate tree, if any.
    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    /// Free-form sub-condition, if any.
    pub fn raw(&self) -> Option<&RawClause> {
        self.raw.as_ref()
    }

    /// Placeholder name bound to the matched node.
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Evaluates the spec against a node in process.
    ///
    /// An internal identity overrides every other constraint. Raw sub-conditions
    /// are opaque Cypher text and cannot be evaluated here.
    pub fn matches(&self, id: NodeId, labels: &[String], props: &PropertyMap) -> Result<bool> {
        if let Some(target) = self.id {
            return Ok(target == id);
        }
        if self.raw.is_some() {
            return Err(SchemaError::argument(
                "raw sub-conditions can only be evaluated by a Cypher backend",
            ));
        }
        if !self.labels.iter().all(|l| labels.contains(l)) {
            return Ok(false);
        }
        if !self.props.iter().all(|(k, v)| props.get(k) == Some(v)) {
            return Ok(false);
        }
        Ok(self.predicate.as_ref().map_or(true, |p| p.eval(props)))
    }

    /// Renders the spec into its pattern/condition/parameters/placeholder form.
    pub fn fragments(&self) -> MatchFragments {
        let placeholder = self.placeholder.clone();
        let mut parameters = PropertyMap::new();
        let mut counter = 0usize;
        let mut next_param = |value: Value| {
            counter += 1;
            let name = format!("{placeholder}_par_{counter}");
            parameters.insert(name.clone(), value);
            name
        };

        let mut conditions = Vec::new();
        let pattern = if let Some(id) = self.id {
            conditions.push(format!("id({placeholder}) = ${}", next_param(id.into())));
            format!("({placeholder})")
        } else {
            let mut pattern = format!("({placeholder}");
            for label in &self.labels {
                pattern.push(':');
                pattern.push_str(&cypher_ident(label));
            }
            if !self.props.is_empty() {
                let entries: Vec<String> = self
                    .props
                    .iter()
                    .map(|(k, v)| format!("{}: ${}", cypher_ident(k), next_param(v.clone())))
                    .collect();
                pattern.push_str(&format!(" {{{}}}", entries.join(", ")));
            }
            pattern.push(')');
            if let Some(pred) = &self.predicate {
                conditions.push(pred.render(&placeholder, &mut next_param));
            }
            if let Some(raw) = &self.raw {
                conditions.push(format!("({})", raw.text));
            }
            pattern
        };
        if self.id.is_none() {
            if let Some(raw) = &self.raw {
                for (k, v) in &raw.params {
                    parameters.insert(k.clone(), v.clone());
                }
            }
        }

        MatchFragments {
            pattern,
            condition: conditions.join(" AND "),
            parameters,
            placeholder,
        }
    }
}

pub(crate) fn validate_placeholder(placeholder: &str) -> Result<()> {
    let mut chars = placeholder.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(SchemaError::malformed(format!(
            "placeholder '{placeholder}' is not a valid identifier"
        )))
    }
}

pub(crate) fn validate_raw_params(placeholder: &str, params: &PropertyMap) -> Result<()> {
    let reserved = format!("{placeholder}_par_");
    if let Some(clash) = params.keys().find(|k| k.starts_with(&reserved)) {
        return Err(SchemaError::malformed(format!(
            "parameter '{clash}' uses the reserved prefix '{reserved}'"
        )));
    }
    Ok(())
}
