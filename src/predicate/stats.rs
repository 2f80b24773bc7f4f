//! Statistics-only decisions: can a range be dropped, or emitted, without
//! reading page values?

use std::cmp::Ordering;

use super::{Predicate, Target};
use crate::error::{Error, Result};
use crate::row_range::RowRange;
use crate::types::Scalar;

fn above(target: &Target, column: &Scalar) -> Result<bool> {
    Ok(matches!(target.compare(column)?, Some(Ordering::Greater)))
}

fn below(target: &Target, column: &Scalar) -> Result<bool> {
    Ok(matches!(target.compare(column)?, Some(Ordering::Less)))
}

impl Predicate {
    /// Returns `false` iff the range's effective bounds prove no row can
    /// match. `source` predicates are never prunable this way.
    pub fn fast_filter(&self, range: &RowRange) -> Result<bool> {
        match self {
            Predicate::Value {
                path,
                target,
                source,
                ..
            } => {
                if *source {
                    return Ok(true);
                }
                self.bounds_may_match(
                    range.min_value(path).as_ref(),
                    range.max_value(path).as_ref(),
                    Some(target),
                    Some(target),
                )
            }
            Predicate::Range {
                path,
                min,
                max,
                source,
                ..
            } => {
                if *source {
                    return Ok(true);
                }
                self.bounds_may_match(
                    range.min_value(path).as_ref(),
                    range.max_value(path).as_ref(),
                    min.as_ref(),
                    max.as_ref(),
                )
            }
            Predicate::And(children) => {
                for child in children {
                    if !child.fast_filter(range)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Or(children) => {
                for child in children {
                    if child.fast_filter(range)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Path { .. } => Ok(true),
        }
    }

    /// Returns `true` iff the range's effective bounds prove every row
    /// matches, so it can be emitted without reading page values.
    pub fn fast_pass(&self, range: &RowRange) -> Result<bool> {
        match self {
            Predicate::Value {
                path,
                target,
                source,
                ..
            } => {
                if *source {
                    return Ok(false);
                }
                let (min, max) = (range.min_value(path), range.max_value(path));
                match (min, max) {
                    (Some(min), Some(max)) => Ok(matches!(
                        target.compare(&min)?,
                        Some(Ordering::Equal)
                    ) && matches!(
                        target.compare(&max)?,
                        Some(Ordering::Equal)
                    )),
                    _ => Ok(false),
                }
            }
            Predicate::Range {
                path,
                min,
                max,
                source,
                ..
            } => {
                if *source {
                    return Ok(false);
                }
                let row_min = range.min_value(path);
                let row_max = range.max_value(path);
                let low_holds = match min {
                    // min <= rowMin
                    Some(min) => match &row_min {
                        Some(row_min) => !above(min, row_min)?,
                        None => false,
                    },
                    None => true,
                };
                let high_holds = match max {
                    // rowMax <= max
                    Some(max) => match &row_max {
                        Some(row_max) => !below(max, row_max)?,
                        None => false,
                    },
                    None => true,
                };
                Ok(low_holds && high_holds)
            }
            Predicate::And(children) => {
                for child in children {
                    if !child.fast_pass(range)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            // one child covering every row is enough
            Predicate::Or(children) => {
                for child in children {
                    if child.fast_pass(range)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Path { .. } => Ok(true),
        }
    }

    /// Page-level variant of [`Predicate::fast_filter`]: can a page with
    /// these min/max values contain a match? `None` bounds mean an
    /// all-null page, which never matches. Leaf predicates only.
    pub fn evaluate_bounds(
        &self,
        page_min: Option<&Scalar>,
        page_max: Option<&Scalar>,
    ) -> Result<bool> {
        match self {
            Predicate::Value { target, source, .. } => {
                if *source {
                    return Ok(true);
                }
                match (page_min, page_max) {
                    (Some(min), Some(max)) => {
                        self.bounds_may_match(Some(min), Some(max), Some(target), Some(target))
                    }
                    _ => Ok(false),
                }
            }
            Predicate::Range {
                min, max, source, ..
            } => {
                if *source {
                    return Ok(true);
                }
                match (page_min, page_max) {
                    (Some(page_min), Some(page_max)) => self.bounds_may_match(
                        Some(page_min),
                        Some(page_max),
                        min.as_ref(),
                        max.as_ref(),
                    ),
                    _ => Ok(false),
                }
            }
            Predicate::Path { .. } => Ok(true),
            Predicate::And(_) | Predicate::Or(_) => Err(Error::Invariant(
                "page bounds are evaluated on leaf predicates only".to_string(),
            )),
        }
    }

    /// Row-level evaluation of a single decoded value. Leaf predicates
    /// only; null values never match.
    pub fn evaluate(&self, value: &Scalar) -> Result<bool> {
        match self {
            Predicate::Value { target, .. } => {
                Ok(matches!(target.compare(value)?, Some(Ordering::Equal)))
            }
            Predicate::Range { min, max, .. } => {
                if value.is_null() {
                    return Ok(false);
                }
                let low_holds = match min {
                    Some(min) => !below(min, value)?,
                    None => true,
                };
                let high_holds = match max {
                    Some(max) => !above(max, value)?,
                    None => true,
                };
                Ok(low_holds && high_holds)
            }
            Predicate::Path { .. } => Ok(true),
            Predicate::And(_) | Predicate::Or(_) => Err(Error::Invariant(
                "row values are evaluated on leaf predicates only".to_string(),
            )),
        }
    }

    /// Whether `[row_min, row_max]` can intersect `[min, max]`. Absent
    /// row bounds are unknown: they cannot disprove a match.
    fn bounds_may_match(
        &self,
        row_min: Option<&Scalar>,
        row_max: Option<&Scalar>,
        min: Option<&Target>,
        max: Option<&Target>,
    ) -> Result<bool> {
        // rowMin > max disproves
        if let (Some(row_min), Some(max)) = (row_min, max) {
            if matches!(max.compare(row_min)?, Some(Ordering::Greater)) {
                return Ok(false);
            }
        }
        // rowMax < min disproves
        if let (Some(row_max), Some(min)) = (row_max, min) {
            if matches!(min.compare(row_max)?, Some(Ordering::Less)) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
