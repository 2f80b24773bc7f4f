use crate::error::{Error, Result};

/// Location of a page inside a row group, as recorded by the offset index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageLocation {
    /// Index of the first row of the page within its row group.
    pub first_row_index: u64,
}

impl PageLocation {
    pub fn new(first_row_index: u64) -> Self {
        Self { first_row_index }
    }
}

/// Per-page starting row numbers of one column chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetIndex {
    pub page_locations: Vec<PageLocation>,
}

impl OffsetIndex {
    pub fn new(page_locations: Vec<PageLocation>) -> Self {
        Self { page_locations }
    }

    pub fn num_pages(&self) -> usize {
        self.page_locations.len()
    }

    /// The (row) interval covered by page `page`: from its first row index
    /// to the row before the next page's first row index; the last page
    /// extends to `num_rows - 1`.
    pub fn page_interval(&self, page: usize, num_rows: u64) -> Result<(u64, u64)> {
        let location = self.page_locations.get(page).ok_or_else(|| {
            Error::Invariant(format!(
                "offset index has {} pages but page {} was requested",
                self.page_locations.len(),
                page
            ))
        })?;
        let end = match self.page_locations.get(page + 1) {
            Some(next) => next.first_row_index.saturating_sub(1),
            None => num_rows.saturating_sub(1),
        };
        Ok((location.first_row_index, end))
    }

    /// Binary search for the unique page `p` with
    /// `page[p].first_row_index <= row < page[p + 1].first_row_index`
    /// (the last page extends to the end of the row group).
    ///
    /// When only two candidates remain, the higher one wins if its first
    /// row index is `<= row`; ties break toward the later page.
    pub fn find_relevant_page(&self, row: u64) -> Result<usize> {
        if self.page_locations.is_empty() {
            return Err(Error::Invariant(
                "offset index has no pages".to_string(),
            ));
        }
        let mut lo = 0usize;
        let mut hi = self.page_locations.len() - 1;
        while lo < hi {
            // bias up so the two-candidate case tests the higher page
            let mid = (lo + hi + 1) / 2;
            if self.page_locations[mid].first_row_index <= row {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        Ok(lo)
    }
}
