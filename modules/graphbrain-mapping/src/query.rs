//! Parameterized MERGE generation.
//!
//! Values never reach query text; they are always bound through named
//! parameters. Identifiers (labels, relationship types, property names) are
//! emitted verbatim only when they match a strict allow-list and are
//! backtick-quoted otherwise.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

pub const MAX_IDENTIFIER_LEN: usize = 65_536;

static PLAIN_IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("valid identifier regex"));

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("{kind} must not be empty")]
    EmptyIdentifier { kind: &'static str },

    #[error("{kind} is {len} characters, limit is 65536")]
    IdentifierTooLong { kind: &'static str, len: usize },

    #[error("merge key for {label} has no components")]
    EmptyMergeKey { label: String },
}

/// Query text plus its bound parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedQuery {
    pub cypher: String,
    pub params: Map<String, Value>,
}

/// A node addressed by label and key properties.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    pub label: &'a str,
    pub key: &'a Map<String, Value>,
}

pub fn escape_label(label: &str) -> Result<String, QueryError> {
    escape_identifier(label, "label")
}

pub fn escape_property_name(name: &str) -> Result<String, QueryError> {
    escape_identifier(name, "property name")
}

fn escape_identifier(raw: &str, kind: &'static str) -> Result<String, QueryError> {
    if raw.is_empty() {
        return Err(QueryError::EmptyIdentifier { kind });
    }
    let len = raw.chars().count();
    if len > MAX_IDENTIFIER_LEN {
        return Err(QueryError::IdentifierTooLong { kind, len });
    }
    if PLAIN_IDENTIFIER_RE.is_match(raw) {
        Ok(raw.to_string())
    } else {
        Ok(format!("`{}`", raw.replace('`', "``")))
    }
}

/// `<prefix>_<key>` with every character outside `[A-Za-z0-9_]` replaced.
///
/// The same key under the same prefix always maps to the same name. Distinct
/// keys that sanitize alike are told apart when bound into a query.
pub fn param_name(prefix: &str, key: &str) -> String {
    let sanitized: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("{prefix}_{sanitized}")
}

/// `{a: $key_a, b: $key_b}`, registering the parameters.
fn key_clause(
    key: &Map<String, Value>,
    prefix: &str,
    params: &mut Map<String, Value>,
) -> Result<String, QueryError> {
    let mut parts = Vec::with_capacity(key.len());
    for (name, value) in key {
        let property = escape_property_name(name)?;
        let param = bind(prefix, name, value, params);
        parts.push(format!("{property}: ${param}"));
    }
    Ok(format!("{{{}}}", parts.join(", ")))
}

/// `v.a = $prop_a, v.b = $prop_b`, or `None` for an empty property set.
fn set_list(
    var: &str,
    properties: &Map<String, Value>,
    prefix: &str,
    params: &mut Map<String, Value>,
) -> Result<Option<String>, QueryError> {
    if properties.is_empty() {
        return Ok(None);
    }
    let mut parts = Vec::with_capacity(properties.len());
    for (name, value) in properties {
        let property = escape_property_name(name)?;
        let param = bind(prefix, name, value, params);
        parts.push(format!("{var}.{property} = ${param}"));
    }
    Ok(Some(parts.join(", ")))
}

/// Register `value` under its parameter name. A name already taken by another
/// key gets `_2`, `_3`, ... in key order.
fn bind(prefix: &str, key: &str, value: &Value, params: &mut Map<String, Value>) -> String {
    let base = param_name(prefix, key);
    let mut param = base.clone();
    let mut n = 2;
    while params.contains_key(&param) {
        param = format!("{base}_{n}");
        n += 1;
    }
    params.insert(param.clone(), value.clone());
    param
}

fn push_upsert_sets(lines: &mut Vec<String>, set: Option<String>) {
    if let Some(set) = set {
        lines.push(format!("ON CREATE SET {set}"));
        lines.push(format!("ON MATCH SET {set}"));
    }
}

fn node_pattern(
    var: &str,
    node: NodeRef<'_>,
    prefix: &str,
    params: &mut Map<String, Value>,
) -> Result<String, QueryError> {
    if node.key.is_empty() {
        return Err(QueryError::EmptyMergeKey {
            label: node.label.to_string(),
        });
    }
    Ok(format!(
        "({var}:{} {})",
        escape_label(node.label)?,
        key_clause(node.key, prefix, params)?
    ))
}

/// Full upsert of one node: create and match paths set the same properties.
pub fn generate_node_merge(
    label: &str,
    merge_key: &Map<String, Value>,
    properties: &Map<String, Value>,
) -> Result<GeneratedQuery, QueryError> {
    let mut params = Map::new();
    let pattern = node_pattern("n", NodeRef { label, key: merge_key }, "key", &mut params)?;
    let mut lines = vec![format!("MERGE {pattern}")];
    let set = set_list("n", properties, "prop", &mut params)?;
    push_upsert_sets(&mut lines, set);
    Ok(GeneratedQuery {
        cypher: lines.join("\n"),
        params,
    })
}

/// Relationship upsert between two endpoints that must already exist.
pub fn generate_relationship_merge(
    rel_type: &str,
    from: NodeRef<'_>,
    to: NodeRef<'_>,
    properties: &Map<String, Value>,
) -> Result<GeneratedQuery, QueryError> {
    let mut params = Map::new();
    let mut lines = vec![
        format!("MATCH {}", node_pattern("a", from, "from", &mut params)?),
        format!("MATCH {}", node_pattern("b", to, "to", &mut params)?),
        format!("MERGE (a)-[r:{}]->(b)", escape_label(rel_type)?),
    ];
    let set = set_list("r", properties, "prop", &mut params)?;
    push_upsert_sets(&mut lines, set);
    Ok(GeneratedQuery {
        cypher: lines.join("\n"),
        params,
    })
}

/// Relationship upsert that also MERGEs both endpoints. Endpoint properties
/// are only written when the endpoint is created.
pub fn generate_relationship_merge_with_nodes(
    rel_type: &str,
    from: NodeRef<'_>,
    from_on_create: &Map<String, Value>,
    to: NodeRef<'_>,
    to_on_create: &Map<String, Value>,
    properties: &Map<String, Value>,
) -> Result<GeneratedQuery, QueryError> {
    let mut params = Map::new();
    let mut lines = vec![format!("MERGE {}", node_pattern("a", from, "from", &mut params)?)];
    if let Some(set) = set_list("a", from_on_create, "fromCreate", &mut params)? {
        lines.push(format!("ON CREATE SET {set}"));
    }
    lines.push(format!("MERGE {}", node_pattern("b", to, "to", &mut params)?));
    if let Some(set) = set_list("b", to_on_create, "toCreate", &mut params)? {
        lines.push(format!("ON CREATE SET {set}"));
    }
    lines.push(format!("MERGE (a)-[r:{}]->(b)", escape_label(rel_type)?));
    let set = set_list("r", properties, "prop", &mut params)?;
    push_upsert_sets(&mut lines, set);
    Ok(GeneratedQuery {
        cypher: lines.join("\n"),
        params,
    })
}

/// Fold several statements into one round-trip.
///
/// Every parameter of query `i` is renamed `q<i>_<name>`. Statements are
/// separated by `WITH count(*) AS _q<i>`, which drops earlier variables and
/// always yields one row, so a statement matching nothing does not stop the
/// ones after it.
pub fn combine_queries(queries: &[GeneratedQuery]) -> GeneratedQuery {
    let mut cypher = String::new();
    let mut params = Map::new();

    for (i, query) in queries.iter().enumerate() {
        if i > 0 {
            cypher.push_str(&format!("\nWITH count(*) AS _q{}\n", i - 1));
        }
        let prefix = format!("q{i}");
        cypher.push_str(&rewrite_parameters(&query.cypher, |name| {
            query
                .params
                .contains_key(name)
                .then(|| format!("{prefix}_{name}"))
        }));
        for (name, value) in &query.params {
            params.insert(format!("{prefix}_{name}"), value.clone());
        }
    }

    GeneratedQuery { cypher, params }
}

/// Rewrite `$name` references outside backtick-quoted identifiers.
fn rewrite_parameters<F>(cypher: &str, rename: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(cypher.len() + 16);
    let mut chars = cypher.char_indices().peekable();
    let mut quoted = false;

    while let Some((i, c)) = chars.next() {
        if c == '`' {
            quoted = !quoted;
            out.push(c);
            continue;
        }
        if c != '$' || quoted {
            out.push(c);
            continue;
        }
        let start = i + 1;
        let mut end = start;
        while let Some(&(j, next)) = chars.peek() {
            if next.is_ascii_alphanumeric() || next == '_' {
                end = j + next.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        let name = &cypher[start..end];
        out.push('$');
        match rename(name) {
            Some(renamed) => out.push_str(&renamed),
            None => out.push_str(name),
        }
    }
    out
}
