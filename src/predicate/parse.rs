//! Compiles the declarative filter specification into predicate trees.
//!
//! A filter is an ordered list of phases; each phase is one predicate
//! object or an array of them (implicit AND). Phases are compiled
//! independently and compose as a pipeline, not as one big AND: a cheap
//! index-only phase can run before an expensive scanning one.

use serde_json::Value as Json;

use super::{Predicate, Target};
use crate::error::{Error, Result};
use crate::metadata::ColumnPath;
use crate::types::Scalar;

const KNOWN_KEYS: [&str; 8] = ["path", "value", "min", "max", "and", "or", "index", "source"];

/// Parses a whole `filter` specification: an array of phases in
/// declaration order.
pub fn parse_filter(spec: &Json) -> Result<Vec<Predicate>> {
    let phases = spec
        .as_array()
        .ok_or_else(|| Error::Spec("`filter` must be an array of phases".to_string()))?;
    phases.iter().map(parse_phase).collect()
}

/// Parses one phase: a predicate object, or an array of predicate objects
/// combined with an implicit AND.
pub fn parse_phase(phase: &Json) -> Result<Predicate> {
    match phase {
        Json::Object(_) => parse_node(phase),
        Json::Array(nodes) => {
            if nodes.is_empty() {
                return Err(Error::Spec("a phase array cannot be empty".to_string()));
            }
            let mut children = nodes.iter().map(parse_node).collect::<Result<Vec<_>>>()?;
            if children.len() == 1 {
                Ok(children.remove(0))
            } else {
                Ok(Predicate::And(children))
            }
        }
        other => Err(Error::Spec(format!(
            "a phase must be a predicate object or an array of them, got {}",
            other
        ))),
    }
}

fn parse_node(node: &Json) -> Result<Predicate> {
    let object = node
        .as_object()
        .ok_or_else(|| Error::Spec(format!("a predicate must be an object, got {}", node)))?;

    for key in object.keys() {
        if !KNOWN_KEYS.contains(&key.as_str()) {
            return Err(Error::Spec(format!("unknown predicate key `{}`", key)));
        }
    }

    let index_only = parse_flag(object, "index")?;
    let source = parse_flag(object, "source")?;

    if object.contains_key("and") || object.contains_key("or") {
        return parse_composite(object, index_only, source);
    }

    let path = object
        .get("path")
        .ok_or_else(|| Error::Spec("a predicate requires a `path`".to_string()))?;
    let path = path
        .as_str()
        .map(ColumnPath::from)
        .ok_or_else(|| Error::Spec(format!("`path` must be a string, got {}", path)))?;

    let value = object.get("value");
    let min = object.get("min");
    let max = object.get("max");

    match (value, min, max) {
        (Some(value), None, None) => Ok(Predicate::Value {
            path,
            target: parse_bound("value", value)?,
            index_only,
            source,
        }),
        (Some(_), _, _) => Err(Error::Spec(
            "`value` cannot be combined with `min` or `max`".to_string(),
        )),
        (None, None, None) => {
            if index_only {
                Err(Error::Spec(
                    "`index` requires `value`, `min` or `max`".to_string(),
                ))
            } else {
                Ok(Predicate::Path { path, source })
            }
        }
        (None, min, max) => Ok(Predicate::Range {
            path,
            min: min.map(|v| parse_bound("min", v)).transpose()?,
            max: max.map(|v| parse_bound("max", v)).transpose()?,
            index_only,
            source,
        }),
    }
}

fn parse_composite(
    object: &serde_json::Map<String, Json>,
    index_only: bool,
    source: bool,
) -> Result<Predicate> {
    if index_only || source {
        return Err(Error::Spec(
            "`index` and `source` belong on leaf predicates, not on `and`/`or`".to_string(),
        ));
    }
    for key in ["path", "value", "min", "max"] {
        if object.contains_key(key) {
            return Err(Error::Spec(format!(
                "`{}` cannot be combined with `and`/`or`",
                key
            )));
        }
    }
    if object.contains_key("and") && object.contains_key("or") {
        return Err(Error::Spec(
            "`and` and `or` cannot appear on the same node".to_string(),
        ));
    }

    let (key, is_and) = if object.contains_key("and") {
        ("and", true)
    } else {
        ("or", false)
    };
    let children = object[key]
        .as_array()
        .ok_or_else(|| Error::Spec(format!("`{}` must be an array", key)))?;
    if children.is_empty() {
        return Err(Error::Spec(format!("`{}` cannot be empty", key)));
    }
    let children = children
        .iter()
        .map(parse_node)
        .collect::<Result<Vec<_>>>()?;
    Ok(if is_and {
        Predicate::And(children)
    } else {
        Predicate::Or(children)
    })
}

fn parse_flag(object: &serde_json::Map<String, Json>, key: &str) -> Result<bool> {
    match object.get(key) {
        None => Ok(false),
        Some(Json::Bool(v)) => Ok(*v),
        Some(other) => Err(Error::Spec(format!(
            "`{}` must be a boolean, got {}",
            key, other
        ))),
    }
}

fn parse_bound(key: &str, value: &Json) -> Result<Target> {
    let scalar = Scalar::from_json(value)
        .ok_or_else(|| Error::Spec(format!("`{}` must be a scalar, got {}", key, value)))?;
    Target::new(scalar)
}
