use crate::error::{Error, Result};
use crate::types::Scalar;

/// Per-page min/max statistics of one column chunk, parallel to the
/// offset index's page locations.
///
/// An entry is `None` when every value of the page is null; such a page
/// never matches a predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnIndex {
    pub min_values: Vec<Option<Scalar>>,
    pub max_values: Vec<Option<Scalar>>,
}

impl ColumnIndex {
    pub fn new(min_values: Vec<Option<Scalar>>, max_values: Vec<Option<Scalar>>) -> Self {
        Self {
            min_values,
            max_values,
        }
    }

    /// Number of pages this index describes.
    pub fn num_pages(&self) -> usize {
        self.min_values.len()
    }

    /// The min/max entry of page `page`. Errors when the index is shorter
    /// than the offset index it is supposed to parallel.
    pub fn page_bounds(&self, page: usize) -> Result<(Option<&Scalar>, Option<&Scalar>)> {
        match (self.min_values.get(page), self.max_values.get(page)) {
            (Some(min), Some(max)) => Ok((min.as_ref(), max.as_ref())),
            _ => Err(Error::Invariant(format!(
                "column index has {} entries but page {} was requested",
                self.min_values.len(),
                page
            ))),
        }
    }
}
