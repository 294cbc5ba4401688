//! Typed property predicates bound to a single match placeholder.
//!
//! Predicates can be evaluated in process against a property map and rendered
//! into a Cypher condition with generated parameters.

use crate::error::{Result, SchemaError};
use crate::types::{PropertyMap, Value};

use super::cypher_ident;

/// Comparison against a single property of the matched node.
#[derive(Clone, Debug, PartialEq)]
pub enum Comparison {
    /// `prop = value`
    Eq {
        /// Property name.
        prop: String,
        /// Literal to compare with.
        value: Value,
    },
    /// `prop <> value`
    Ne {
        /// Property name.
        prop: String,
        /// Literal to compare with.
        value: Value,
    },
    /// `prop < value`
    Lt {
        /// Property name.
        prop: String,
        /// Upper bound (exclusive).
        value: Value,
    },
    /// `prop <= value`
    Le {
        /// Property name.
        prop: String,
        /// Upper bound (inclusive).
        value: Value,
    },
    /// `prop > value`
    Gt {
        /// Property name.
        prop: String,
        /// Lower bound (exclusive).
        value: Value,
    },
    /// `prop >= value`
    Ge {
        /// Property name.
        prop: String,
        /// Lower bound (inclusive).
        value: Value,
    },
    /// `prop IN [values]`
    In {
        /// Property name.
        prop: String,
        /// Candidate values, never empty.
        values: Vec<Value>,
    },
    /// Property key is present.
    Exists {
        /// Property name.
        prop: String,
    },
    /// Property key is absent.
    Missing {
        /// Property name.
        prop: String,
    },
}

/// Boolean predicate tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// Leaf comparison.
    Cmp(Comparison),
    /// Conjunction.
    And(Vec<Predicate>),
    /// Disjunction.
    Or(Vec<Predicate>),
    /// Negation.
    Not(Box<Predicate>),
}

impl Predicate {
    /// Evaluates the predicate against a node's properties. Comparisons on a
    /// missing property are false, as in Cypher's null semantics.
    pub fn eval(&self, props: &PropertyMap) -> bool {
        match self {
            Predicate::Cmp(cmp) => eval_cmp(cmp, props),
            Predicate::And(items) => items.iter().all(|p| p.eval(props)),
            Predicate::Or(items) => items.iter().any(|p| p.eval(props)),
            Predicate::Not(inner) => !inner.eval(props),
        }
    }

    /// Renders the predicate as a Cypher condition. Parameter names are drawn
    /// from `next_param`, which also records the bound value.
    pub(crate) fn render(
        &self,
        placeholder: &str,
        next_param: &mut dyn FnMut(Value) -> String,
    ) -> String {
        match self {
            Predicate::Cmp(cmp) => render_cmp(cmp, placeholder, next_param),
            Predicate::And(items) => join_rendered(items, " AND ", placeholder, next_param),
            Predicate::Or(items) => join_rendered(items, " OR ", placeholder, next_param),
            Predicate::Not(inner) => format!("NOT ({})", inner.render(placeholder, next_param)),
        }
    }
}

fn join_rendered(
    items: &[Predicate],
    sep: &str,
    placeholder: &str,
    next_param: &mut dyn FnMut(Value) -> String,
) -> String {
    let parts: Vec<String> = items
        .iter()
        .map(|p| format!("({})", p.render(placeholder, next_param)))
        .collect();
    parts.join(sep)
}

fn eval_cmp(cmp: &Comparison, props: &PropertyMap) -> bool {
    match cmp {
        Comparison::Eq { prop, value } => props.get(prop) == Some(value),
        Comparison::Ne { prop, value } => props.get(prop).is_some_and(|v| v != value),
        Comparison::Lt { prop, value } => ordered(props, prop, value, |o| o.is_lt()),
        Comparison::Le { prop, value } => ordered(props, prop, value, |o| o.is_le()),
        Comparison::Gt { prop, value } => ordered(props, prop, value, |o| o.is_gt()),
        Comparison::Ge { prop, value } => ordered(props, prop, value, |o| o.is_ge()),
        Comparison::In { prop, values } => props.get(prop).is_some_and(|v| values.contains(v)),
        Comparison::Exists { prop } => props.contains_key(prop),
        Comparison::Missing { prop } => !props.contains_key(prop),
    }
}

fn ordered(
    props: &PropertyMap,
    prop: &str,
    value: &Value,
    accept: fn(std::cmp::Ordering) -> bool,
) -> bool {
    props
        .get(prop)
        .and_then(|current| current.partial_cmp_value(value))
        .map(accept)
        .unwrap_or(false)
}

fn render_cmp(
    cmp: &Comparison,
    placeholder: &str,
    next_param: &mut dyn FnMut(Value) -> String,
) -> String {
    let field = |prop: &str| format!("{placeholder}.{}", cypher_ident(prop));
    match cmp {
        Comparison::Eq { prop, value } => {
            format!("{} = ${}", field(prop.as_str()), next_param(value.clone()))
        }
        Comparison::Ne { prop, value } => {
            format!("{} <> ${}", field(prop.as_str()), next_param(value.clone()))
        }
        Comparison::Lt { prop, value } => {
            format!("{} < ${}", field(prop.as_str()), next_param(value.clone()))
        }
        Comparison::Le { prop, value } => {
            format!("{} <= ${}", field(prop.as_str()), next_param(value.clone()))
        }
        Comparison::Gt { prop, value } => {
            format!("{} > ${}", field(prop.as_str()), next_param(value.clone()))
        }
        Comparison::Ge { prop, value } => {
            format!("{} >= ${}", field(prop.as_str()), next_param(value.clone()))
        }
        Comparison::In { prop, values } => format!(
            "{} IN ${}",
            field(prop.as_str()),
            next_param(Value::List(values.clone()))
        ),
        Comparison::Exists { prop } => format!("{} IS NOT NULL", field(prop.as_str())),
        Comparison::Missing { prop } => format!("{} IS NULL", field(prop.as_str())),
    }
}

#[derive(Clone, Copy, Debug)]
enum PredicateMode {
    And,
    Or,
}

/// Builder used to construct predicates on the matched node.
pub struct PredicateBuilder {
    mode: PredicateMode,
    exprs: Vec<Predicate>,
    error: Option<SchemaError>,
}

impl PredicateBuilder {
    pub(crate) fn new() -> Self {
        Self::with_mode(PredicateMode::And)
    }

    fn with_mode(mode: PredicateMode) -> Self {
        Self {
            mode,
            exprs: Vec::new(),
            error: None,
        }
    }

    pub(crate) fn finish(self) -> Result<Option<Predicate>> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(match self.exprs.len() {
            0 => None,
            1 => self.exprs.into_iter().next(),
            _ => Some(match self.mode {
                PredicateMode::And => Predicate::And(self.exprs),
                PredicateMode::Or => Predicate::Or(self.exprs),
            }),
        })
    }

    fn record_error(&mut self, err: SchemaError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    fn push_cmp(&mut self, cmp: Comparison) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        let prop = match &cmp {
            Comparison::Eq { prop, .. }
            | Comparison::Ne { prop, .. }
            | Comparison::Lt { prop, .. }
            | Comparison::Le { prop, .. }
            | Comparison::Gt { prop, .. }
            | Comparison::Ge { prop, .. }
            | Comparison::In { prop, .. }
            | Comparison::Exists { prop }
            | Comparison::Missing { prop } => prop,
        };
        if prop.trim().is_empty() {
            self.record_error(SchemaError::malformed("predicate property name is blank"));
            return self;
        }
        self.exprs.push(Predicate::Cmp(cmp));
        self
    }

    fn group<F>(&mut self, mode: PredicateMode, negate: bool, build: F) -> &mut Self
    where
        F: FnOnce(&mut PredicateBuilder),
    {
        if self.error.is_some() {
            return self;
        }
        let mut nested = PredicateBuilder::with_mode(mode);
        build(&mut nested);
        match nested.finish() {
            Ok(Some(expr)) if negate => self.exprs.push(Predicate::Not(Box::new(expr))),
            Ok(Some(expr)) => self.exprs.push(expr),
            Ok(None) => self.record_error(SchemaError::malformed(
                "predicate group must emit at least one predicate",
            )),
            Err(err) => self.record_error(err),
        }
        self
    }

    /// Adds an equality predicate.
    pub fn eq(&mut self, prop: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.push_cmp(Comparison::Eq {
            prop: prop.into(),
            value: value.into(),
        })
    }

    /// Adds an inequality predicate.
    pub fn ne(&mut self, prop: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.push_cmp(Comparison::Ne {
            prop: prop.into(),
            value: value.into(),
        })
    }

    /// Adds a strict less-than predicate.
    pub fn lt(&mut self, prop: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.push_cmp(Comparison::Lt {
            prop: prop.into(),
            value: value.into(),
        })
    }

    /// Adds a less-than-or-equal predicate.
    pub fn le(&mut self, prop: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.push_cmp(Comparison::Le {
            prop: prop.into(),
            value: value.into(),
        })
    }

    /// Adds a strict greater-than predicate.
    pub fn gt(&mut self, prop: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.push_cmp(Comparison::Gt {
            prop: prop.into(),
            value: value.into(),
        })
    }

    /// Adds a greater-than-or-equal predicate.
    pub fn ge(&mut self, prop: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.push_cmp(Comparison::Ge {
            prop: prop.into(),
            value: value.into(),
        })
    }

    /// Adds an `IN` predicate over a non-empty literal set.
    pub fn in_list<I, V>(&mut self, prop: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        if self.error.is_some() {
            return self;
        }
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            self.record_error(SchemaError::malformed("in_list requires at least one value"));
            return self;
        }
        self.push_cmp(Comparison::In {
            prop: prop.into(),
            values,
        })
    }

    /// Asserts that the property key is present.
    pub fn exists(&mut self, prop: impl Into<String>) -> &mut Self {
        self.push_cmp(Comparison::Exists { prop: prop.into() })
    }

    /// Asserts that the property key is absent.
    pub fn missing(&mut self, prop: impl Into<String>) -> &mut Self {
        self.push_cmp(Comparison::Missing { prop: prop.into() })
    }

    /// Nests a group of predicates combined with logical AND.
    pub fn and_group<F>(&mut self, build: F) -> &mut Self
    where
        F: FnOnce(&mut PredicateBuilder),
    {
        self.group(PredicateMode::And, false, build)
    }

    /// Nests a group of predicates combined with logical OR.
    pub fn or_group<F>(&mut self, build: F) -> &mut Self
    where
        F: FnOnce(&mut PredicateBuilder),
    {
        self.group(PredicateMode::Or, false, build)
    }

    /// Nests a group of predicates and negates the result.
    pub fn not_group<F>(&mut self, build: F) -> &mut Self
    where
        F: FnOnce(&mut PredicateBuilder),
    {
        self.group(PredicateMode::And, true, build)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::props;

    fn build<F: FnOnce(&mut PredicateBuilder)>(f: F) -> Result<Option<Predicate>> {
        let mut b = PredicateBuilder::new();
        f(&mut b);
        b.finish()
    }

    #[test]
    fn range_and_membership_evaluate() {
        let pred = build(|p| {
            p.ge("year", 2000).in_list("color", ["red", "blue"]);
        })
        .unwrap()
        .unwrap();
        let car = props([("year", Value::Int(2003)), ("color", Value::from("red"))]);
        let old = props([("year", Value::Int(1999)), ("color", Value::from("red"))]);
        assert!(pred.eval(&car));
        assert!(!pred.eval(&old));
    }

    #[test]
    fn missing_property_compares_false() {
        let pred = build(|p| {
            p.ne("make", "Toyota");
        })
        .unwrap()
        .unwrap();
        assert!(!pred.eval(&PropertyMap::new()));
        let negated = build(|p| {
            p.not_group(|g| {
                g.exists("make");
            });
        })
        .unwrap()
        .unwrap();
        assert!(negated.eval(&PropertyMap::new()));
    }

    #[test]
    fn empty_in_list_is_rejected() {
        let err = build(|p| {
            p.in_list("x", Vec::<i64>::new());
        })
        .unwrap_err();
        assert_eq!(err.code(), "MalformedSpecification");
    }

    #[test]
    fn render_uses_generated_parameters() {
        let pred = build(|p| {
            p.or_group(|g| {
                g.lt("year", 1990).missing("color");
            });
        })
        .unwrap()
        .unwrap();
        let mut bound = Vec::new();
        let text = pred.render("n", &mut |v: Value| {
            bound.push(v);
            format!("n_par_{}", bound.len())
        });
        assert_eq!(text, "(n.`year` < $n_par_1) OR (n.`color` IS NULL)");
        assert_eq!(bound, vec![Value::Int(1990)]);
    }
}
