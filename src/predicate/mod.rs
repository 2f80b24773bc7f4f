//! The predicate tree a filter phase compiles to.
//!
//! A closed set of variants; stages dispatch on the variant rather than
//! on trait objects, so every combination is exhaustively checkable.

mod parse;
mod stats;

pub use parse::{parse_filter, parse_phase};

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::metadata::ColumnPath;
use crate::types::{compare, Scalar};

/// A predicate bound, kept in both its scalar and stringified forms so it
/// can be compared against whichever encoding a column's statistics use.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    value: Scalar,
    text: String,
}

impl Target {
    pub fn new(value: Scalar) -> Result<Self> {
        if value.is_null() {
            return Err(Error::Spec("a predicate bound cannot be null".to_string()));
        }
        let text = value.text();
        Ok(Self { value, text })
    }

    pub fn value(&self) -> &Scalar {
        &self.value
    }

    /// Orders a column-side value relative to this bound. `None` when the
    /// column side is undecidable (null, NaN).
    pub fn compare(&self, column: &Scalar) -> Result<Option<Ordering>> {
        compare(column, &self.value, &self.text)
    }
}

/// One node of a compiled filter phase.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Equality against a single value.
    Value {
        path: ColumnPath,
        target: Target,
        index_only: bool,
        source: bool,
    },
    /// Inclusive range; either bound may be absent.
    Range {
        path: ColumnPath,
        min: Option<Target>,
        max: Option<Target>,
        index_only: bool,
        source: bool,
    },
    /// Every child must match.
    And(Vec<Predicate>),
    /// At least one child must match.
    Or(Vec<Predicate>),
    /// Declares a column for loading; always matches.
    Path { path: ColumnPath, source: bool },
}

impl Predicate {
    /// The column path of a leaf node.
    pub fn path(&self) -> Option<&ColumnPath> {
        match self {
            Predicate::Value { path, .. }
            | Predicate::Range { path, .. }
            | Predicate::Path { path, .. } => Some(path),
            Predicate::And(_) | Predicate::Or(_) => None,
        }
    }

    pub fn is_index_only(&self) -> bool {
        match self {
            Predicate::Value { index_only, .. } | Predicate::Range { index_only, .. } => {
                *index_only
            }
            _ => false,
        }
    }

    /// Whether this leaf reads a JSON-blob column. `source` predicates
    /// bypass all statistics and index pruning.
    pub fn is_source(&self) -> bool {
        match self {
            Predicate::Value { source, .. }
            | Predicate::Range { source, .. }
            | Predicate::Path { source, .. } => *source,
            _ => false,
        }
    }

    /// Every leaf path under this node, with its `source` flag.
    pub fn leaf_paths(&self) -> Vec<(&ColumnPath, bool)> {
        match self {
            Predicate::Value { path, source, .. }
            | Predicate::Range { path, source, .. }
            | Predicate::Path { path, source } => vec![(path, *source)],
            Predicate::And(children) | Predicate::Or(children) => children
                .iter()
                .flat_map(|child| child.leaf_paths())
                .collect(),
        }
    }
}
