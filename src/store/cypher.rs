//! Cypher text for [`Statement`]s.
//!
//! Lets the engine drive any service that executes Cypher with a parameter
//! map. Node selection is spliced in from [`MatchSpec::fragments`]; the
//! statement's own values travel as parameters named `props`, `set`, `value`
//! and `by`. A `Batch` renders to several queries which the service must run
//! in one transaction.

use serde_json::{Map, Value as JsonValue};

use crate::error::{Result, SchemaError};
use crate::query::{check_compatible, combine, cypher_ident, MatchSpec};
use crate::types::PropertyMap;

use super::{DuplicatePolicy, EdgePattern, NodeUpdate, Statement};

/// One Cypher statement plus its parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct CypherQuery {
    /// Statement text.
    pub text: String,
    /// Parameter map referenced by the text.
    pub params: Map<String, JsonValue>,
}

/// Renders a statement. Batches flatten into one query per member.
pub fn render(statement: &Statement) -> Result<Vec<CypherQuery>> {
    let mut out = Vec::new();
    render_into(statement, &mut out)?;
    Ok(out)
}

fn render_into(statement: &Statement, out: &mut Vec<CypherQuery>) -> Result<()> {
    let mut params = Map::new();
    let text = match statement {
        Statement::Batch(items) => {
            for item in items {
                render_into(item, out)?;
            }
            return Ok(());
        }
        Statement::CreateNode { labels, props } => {
            bind(&mut params, "props", map_json(props))?;
            format!("CREATE (n{} $props) RETURN n", label_list(labels))
        }
        Statement::MatchNodes { spec, limit } => {
            let mut text = format!(
                "{} RETURN {}",
                match_clause(&[spec], &mut params)?,
                spec.placeholder()
            );
            if let Some(limit) = limit {
                text.push_str(&format!(" LIMIT {limit}"));
            }
            text
        }
        Statement::UpdateNodes { spec, update } => {
            let head = match_clause(&[spec], &mut params)?;
            let tail = update_clauses(spec.placeholder(), update, &mut params)?;
            format!("{head}{tail} RETURN {}", spec.placeholder())
        }
        Statement::DeleteNodes { spec } => format!(
            "{} DETACH DELETE {}",
            match_clause(&[spec], &mut params)?,
            spec.placeholder()
        ),
        Statement::MergeNode { labels, props } => {
            bind(&mut params, "props", map_json(props))?;
            let labels = label_list(labels);
            [
                format!("OPTIONAL MATCH (found{labels}) WHERE properties(found) = $props"),
                "WITH collect(found)[0] AS found".to_string(),
                "CALL {".to_string(),
                "WITH found WITH found WHERE found IS NULL".to_string(),
                format!("CREATE (n{labels}) SET n = $props"),
                "RETURN n, true AS created".to_string(),
                "UNION".to_string(),
                "WITH found WITH found WHERE found IS NOT NULL".to_string(),
                "RETURN found AS n, false AS created".to_string(),
                "}".to_string(),
                "RETURN n, created".to_string(),
            ]
            .join("\n")
        }
        Statement::UpsertNode {
            labels,
            key,
            value,
            props,
            policy,
            keep,
        } => {
            bind(&mut params, "value", value.to_json())?;
            bind(&mut params, "props", map_json(props))?;
            let head = format!(
                "MERGE (n{} {{{}: $value}})",
                label_list(labels),
                cypher_ident(key)
            );
            let body = match policy {
                DuplicatePolicy::Skip => "ON CREATE SET n += $props".to_string(),
                DuplicatePolicy::Merge => "SET n += $props".to_string(),
                DuplicatePolicy::Replace => {
                    let mut kept = vec![format!(".{}", cypher_ident(key))];
                    kept.extend(keep.iter().map(|k| format!(".{}", cypher_ident(k))));
                    format!("ON MATCH SET n = n {{{}}}\nSET n += $props", kept.join(", "))
                }
            };
            format!("{head}\n{body}\nRETURN n")
        }
        Statement::CreateEdges {
            from,
            to,
            rel_type,
            props,
            unique,
        } => {
            let head = match_clause(&[from, to], &mut params)?;
            bind(&mut params, "props", map_json(props))?;
            let (a, b) = (from.placeholder(), to.placeholder());
            let rel = cypher_ident(rel_type);
            if *unique {
                format!("{head} MERGE ({a})-[r:{rel}]->({b}) ON CREATE SET r = $props RETURN r")
            } else {
                format!("{head} CREATE ({a})-[r:{rel} $props]->({b}) RETURN r")
            }
        }
        Statement::MatchEdges { pattern } => {
            format!("{} RETURN rel", edge_clause(pattern, &mut params)?)
        }
        Statement::DeleteEdges { pattern } => {
            format!("{} DELETE rel", edge_clause(pattern, &mut params)?)
        }
        Statement::Increment { spec, key, by } => {
            bind(&mut params, "by", JsonValue::from(*by))?;
            let n = spec.placeholder();
            let key = cypher_ident(key);
            format!(
                "{} WITH {n}, {n}.{key} AS current SET {n}.{key} = current + $by RETURN {n}, current",
                match_clause(&[spec], &mut params)?
            )
        }
    };
    out.push(CypherQuery { text, params });
    Ok(())
}

fn label_list(labels: &[String]) -> String {
    labels
        .iter()
        .map(|l| format!(":{}", cypher_ident(l)))
        .collect()
}

fn map_json(props: &PropertyMap) -> JsonValue {
    JsonValue::Object(
        props
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

fn bind(params: &mut Map<String, JsonValue>, name: &str, value: JsonValue) -> Result<()> {
    if params.contains_key(name) {
        return Err(SchemaError::malformed(format!(
            "parameter '{name}' is bound twice in one statement"
        )));
    }
    params.insert(name.to_string(), value);
    Ok(())
}

fn match_clause(specs: &[&MatchSpec], params: &mut Map<String, JsonValue>) -> Result<String> {
    check_compatible(specs)?;
    let patterns: Vec<String> = specs.iter().map(|s| s.fragments().pattern).collect();
    let (condition, merged) = combine(specs)?;
    for (name, value) in merged {
        bind(params, &name, value.to_json())?;
    }
    let mut text = format!("MATCH {}", patterns.join(", "));
    if !condition.is_empty() {
        text.push_str(&format!(" WHERE {condition}"));
    }
    Ok(text)
}

fn edge_clause(pattern: &EdgePattern, params: &mut Map<String, JsonValue>) -> Result<String> {
    let specs: Vec<&MatchSpec> = pattern.from.iter().chain(pattern.to.iter()).collect();
    check_compatible(&specs)?;
    let endpoint = |spec: Option<&MatchSpec>, fallback: &str| match spec {
        Some(spec) => spec.fragments().pattern,
        None => format!("({fallback})"),
    };
    let rel = match &pattern.rel_type {
        Some(t) => format!("[rel:{}]", cypher_ident(t)),
        None => "[rel]".to_string(),
    };
    let (condition, merged) = combine(&specs)?;
    for (name, value) in merged {
        bind(params, &name, value.to_json())?;
    }
    let mut text = format!(
        "MATCH {}-{rel}->{}",
        endpoint(pattern.from.as_ref(), "_from"),
        endpoint(pattern.to.as_ref(), "_to")
    );
    if !condition.is_empty() {
        text.push_str(&format!(" WHERE {condition}"));
    }
    Ok(text)
}

fn update_clauses(
    placeholder: &str,
    update: &NodeUpdate,
    params: &mut Map<String, JsonValue>,
) -> Result<String> {
    let mut text = String::new();
    if !update.set.is_empty() {
        bind(params, "set", map_json(&update.set))?;
        text.push_str(&format!(" SET {placeholder} += $set"));
    }
    if !update.remove.is_empty() {
        let keys: Vec<String> = update
            .remove
            .iter()
            .map(|k| format!("{placeholder}.{}", cypher_ident(k)))
            .collect();
        text.push_str(&format!(" REMOVE {}", keys.join(", ")));
    }
    if !update.add_labels.is_empty() {
        text.push_str(&format!(" SET {placeholder}{}", label_list(&update.add_labels)));
    }
    if !update.remove_labels.is_empty() {
        text.push_str(&format!(
            " REMOVE {placeholder}{}",
            label_list(&update.remove_labels)
        ));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{props, NodeId, Value};

    fn single(statement: &Statement) -> CypherQuery {
        let mut queries = render(statement).unwrap();
        assert_eq!(queries.len(), 1);
        queries.remove(0)
    }

    #[test]
    fn create_node_binds_property_map() {
        let q = single(&Statement::CreateNode {
            labels: vec!["CLASS".into()],
            props: props([("name", "City")]),
        });
        assert_eq!(q.text, "CREATE (n:`CLASS` $props) RETURN n");
        assert_eq!(q.params["props"]["name"], "City");
    }

    #[test]
    fn match_nodes_uses_fragments() {
        let spec = MatchSpec::builder()
            .label("City")
            .key("name", "Berkeley")
            .filter(|p| {
                p.ge("pop", 1000);
            })
            .build()
            .unwrap();
        let q = single(&Statement::MatchNodes {
            spec,
            limit: Some(5),
        });
        assert_eq!(
            q.text,
            "MATCH (n:`City` {`name`: $n_par_1}) WHERE (n.`pop` >= $n_par_2) RETURN n LIMIT 5"
        );
        assert_eq!(q.params.len(), 2);
    }

    #[test]
    fn upsert_replace_keeps_reserved_keys() {
        let q = single(&Statement::UpsertNode {
            labels: vec!["Car".into()],
            key: "VID".into(),
            value: Value::from("c2"),
            props: props([("make", "Honda")]),
            policy: DuplicatePolicy::Replace,
            keep: vec!["_CLASS".into()],
        });
        assert_eq!(
            q.text,
            "MERGE (n:`Car` {`VID`: $value})\nON MATCH SET n = n {.`VID`, .`_CLASS`}\nSET n += $props\nRETURN n"
        );
    }

    #[test]
    fn create_edges_needs_distinct_placeholders() {
        let statement = Statement::CreateEdges {
            from: MatchSpec::id(NodeId(1)),
            to: MatchSpec::id(NodeId(2)),
            rel_type: "IS_IN".into(),
            props: PropertyMap::new(),
            unique: false,
        };
        assert_eq!(render(&statement).unwrap_err().code(), "MalformedSpecification");

        let statement = Statement::CreateEdges {
            from: MatchSpec::id(NodeId(1)),
            to: MatchSpec::id(NodeId(2)).with_placeholder("m").unwrap(),
            rel_type: "IS_IN".into(),
            props: PropertyMap::new(),
            unique: false,
        };
        let q = single(&statement);
        assert_eq!(
            q.text,
            "MATCH (n), (m) WHERE (id(n) = $n_par_1) AND (id(m) = $m_par_1) CREATE (n)-[r:`IS_IN` $props]->(m) RETURN r"
        );
    }

    #[test]
    fn batch_flattens() {
        let statement = Statement::Batch(vec![
            Statement::DeleteNodes {
                spec: MatchSpec::label("A").unwrap(),
            },
            Statement::MatchEdges {
                pattern: EdgePattern {
                    from: None,
                    to: None,
                    rel_type: Some("R".into()),
                },
            },
        ]);
        let queries = render(&statement).unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].text, "MATCH (n:`A`) DETACH DELETE n");
        assert_eq!(queries[1].text, "MATCH (_from)-[rel:`R`]->(_to) RETURN rel");
    }

    #[test]
    fn raw_parameter_colliding_with_statement_parameter_is_rejected() {
        let spec = MatchSpec::builder()
            .raw_with("n.x = $by", props([("by", 1)]))
            .build()
            .unwrap();
        let err = render(&Statement::Increment {
            spec,
            key: "next_count".into(),
            by: 1,
        })
        .unwrap_err();
        assert_eq!(err.code(), "MalformedSpecification");
    }
}
