//! In-memory representation of decoded column values.
//!
//! [`Scalar`] is the currency of the whole pipeline: row-group statistics,
//! column-index entries and decoded page values all use it. Comparison is
//! deliberately narrow (numeric with numeric, string with string) because
//! a column's statistic encoding never changes mid-file; a numeric predicate
//! bound compared against string-encoded statistics goes through its
//! stringified form (see [`compare`]).

use std::cmp::Ordering;

use crate::error::{Error, Result};

/// A decoded primitive value of a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Boolean(bool),
    Int64(i64),
    Double(f64),
    Utf8(String),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// The stringified form of this value, as used when a numeric bound is
    /// compared against string-encoded statistics.
    pub fn text(&self) -> String {
        match self {
            Scalar::Null => "null".to_string(),
            Scalar::Boolean(v) => v.to_string(),
            Scalar::Int64(v) => v.to_string(),
            Scalar::Double(v) => v.to_string(),
            Scalar::Utf8(v) => v.clone(),
        }
    }

    /// Converts this value into its JSON representation.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Scalar::Null => serde_json::Value::Null,
            Scalar::Boolean(v) => serde_json::Value::Bool(*v),
            Scalar::Int64(v) => serde_json::Value::from(*v),
            Scalar::Double(v) => serde_json::Value::from(*v),
            Scalar::Utf8(v) => serde_json::Value::from(v.as_str()),
        }
    }

    /// Converts a scalar JSON value. Returns `None` for arrays and objects.
    pub fn from_json(value: &serde_json::Value) -> Option<Scalar> {
        match value {
            serde_json::Value::Null => Some(Scalar::Null),
            serde_json::Value::Bool(v) => Some(Scalar::Boolean(*v)),
            serde_json::Value::Number(v) => {
                if let Some(v) = v.as_i64() {
                    Some(Scalar::Int64(v))
                } else {
                    v.as_f64().map(Scalar::Double)
                }
            }
            serde_json::Value::String(v) => Some(Scalar::Utf8(v.clone())),
            _ => None,
        }
    }
}

fn mixed(a: &Scalar, b: &Scalar) -> Error {
    Error::Invariant(format!(
        "mixed statistic encodings: cannot compare {:?} against {:?}",
        a, b
    ))
}

/// Compares a column-side value (statistic or page value) against a
/// predicate bound. `bound_text` is the bound's precomputed stringified
/// form, used when the column side is string-encoded.
///
/// Returns `None` when the comparison is undecidable (`Null` column side,
/// `NaN`): such a value never satisfies a predicate.
pub fn compare(column: &Scalar, bound: &Scalar, bound_text: &str) -> Result<Option<Ordering>> {
    match (column, bound) {
        (Scalar::Null, _) => Ok(None),
        (Scalar::Int64(c), Scalar::Int64(b)) => Ok(Some(c.cmp(b))),
        (Scalar::Int64(c), Scalar::Double(b)) => Ok((*c as f64).partial_cmp(b)),
        (Scalar::Double(c), Scalar::Int64(b)) => Ok(c.partial_cmp(&(*b as f64))),
        (Scalar::Double(c), Scalar::Double(b)) => Ok(c.partial_cmp(b)),
        (Scalar::Utf8(c), Scalar::Utf8(b)) => Ok(Some(c.as_str().cmp(b.as_str()))),
        // string-encoded statistics against a numeric bound: lexical, via
        // the bound's stringified form
        (Scalar::Utf8(c), Scalar::Int64(_)) | (Scalar::Utf8(c), Scalar::Double(_)) => {
            Ok(Some(c.as_str().cmp(bound_text)))
        }
        (Scalar::Boolean(c), Scalar::Boolean(b)) => Ok(Some(c.cmp(b))),
        _ => Err(mixed(column, bound)),
    }
}

/// Compares two values of the same column (both statistics, or both page
/// values). `None` when undecidable.
pub fn compare_values(a: &Scalar, b: &Scalar) -> Result<Option<Ordering>> {
    match (a, b) {
        (Scalar::Null, _) | (_, Scalar::Null) => Ok(None),
        (Scalar::Int64(a), Scalar::Int64(b)) => Ok(Some(a.cmp(b))),
        (Scalar::Int64(a), Scalar::Double(b)) => Ok((*a as f64).partial_cmp(b)),
        (Scalar::Double(a), Scalar::Int64(b)) => Ok(a.partial_cmp(&(*b as f64))),
        (Scalar::Double(a), Scalar::Double(b)) => Ok(a.partial_cmp(b)),
        (Scalar::Utf8(a), Scalar::Utf8(b)) => Ok(Some(a.as_str().cmp(b.as_str()))),
        (Scalar::Boolean(a), Scalar::Boolean(b)) => Ok(Some(a.cmp(b))),
        _ => Err(mixed(a, b)),
    }
}

/// The smaller of two values of one column; undecidable pairs keep `a`.
pub fn min_of(a: Scalar, b: Scalar) -> Result<Scalar> {
    match compare_values(&a, &b)? {
        Some(Ordering::Greater) => Ok(b),
        _ => Ok(a),
    }
}

/// The larger of two values of one column; undecidable pairs keep `a`.
pub fn max_of(a: Scalar, b: Scalar) -> Result<Scalar> {
    match compare_values(&a, &b)? {
        Some(Ordering::Less) => Ok(b),
        _ => Ok(a),
    }
}

/// A materialized row: column path (or `source`-merged key) to value.
pub type Record = serde_json::Map<String, serde_json::Value>;
