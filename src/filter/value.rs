//! The value filter stage: split a range along page boundaries, then
//! scan the surviving single-page ranges row by row.

use crate::error::{Error, Result};
use crate::predicate::Predicate;
use crate::row_range::RowRange;
use crate::types::{max_of, min_of, Scalar};

/// Splits a range into one single-page range per page it touches,
/// carrying that page's column-index bounds as tightened bounds. Ranges
/// the statistics already decide are dropped or passed through whole.
pub(crate) async fn split_filter(
    predicate: &Predicate,
    range: RowRange,
) -> Result<Vec<RowRange>> {
    if !predicate.fast_filter(&range)? {
        return Ok(vec![]);
    }
    if predicate.fast_pass(&range)? {
        return Ok(vec![range]);
    }
    let path = predicate
        .path()
        .cloned()
        .ok_or_else(|| Error::Invariant("value stage requires a leaf predicate".to_string()))?;

    // source columns carry JSON text: their column index orders nothing
    // useful, so only the offset index is primed
    let (offset, column) = if predicate.is_source() {
        (range.prime_offset_index(&path).await?, None)
    } else {
        let (offset, column) = futures::try_join!(
            range.prime_offset_index(&path),
            range.prime_column_index(&path)
        )?;
        (offset, Some(column))
    };

    let num_rows = range.num_rows();
    let first = offset.find_relevant_page(range.low())?;
    let last = offset.find_relevant_page(range.high())?;

    let mut out = Vec::with_capacity(last - first + 1);
    for page in first..=last {
        let (page_start, page_end) = offset.page_interval(page, num_rows)?;
        let low = page_start.max(range.low());
        let high = page_end.min(range.high());
        if low > high {
            continue;
        }
        let derived = match &column {
            Some(column) => match column.page_bounds(page)? {
                (Some(min), Some(max)) => {
                    range.extend_with(low, high, &path, min.clone(), max.clone())?
                }
                _ => range.extend(low, high)?,
            },
            None => range.extend(low, high)?,
        };
        out.push(derived);
    }
    Ok(out)
}

/// Scans one single-page range row by row and emits the contiguous
/// matching runs, each tightened to its value extrema.
pub(crate) async fn scan_filter(
    predicate: &Predicate,
    range: RowRange,
) -> Result<Vec<RowRange>> {
    // page-level tightened bounds from the split decide most ranges here
    if !predicate.fast_filter(&range)? {
        return Ok(vec![]);
    }
    if predicate.fast_pass(&range)? {
        return Ok(vec![range]);
    }
    let path = predicate
        .path()
        .cloned()
        .ok_or_else(|| Error::Invariant("value stage requires a leaf predicate".to_string()))?;

    let offset = range.prime_offset_index(&path).await?;
    let page = offset.find_relevant_page(range.low())?;
    let (page_start, page_end) = offset.page_interval(page, range.num_rows())?;
    if range.high() > page_end {
        return Err(Error::Invariant(format!(
            "range [{}, {}] of {} spans beyond page {} ending at row {}",
            range.low(),
            range.high(),
            path,
            page,
            page_end
        )));
    }

    let values = range.page_data(&path, page).await?;

    let mut out = Vec::new();
    let mut run: Option<(u64, u64, Scalar, Scalar)> = None;
    for row in range.low()..=range.high() {
        let value = values.get((row - page_start) as usize).ok_or_else(|| {
            Error::Invariant(format!(
                "page {} of {} holds {} values, row {} is out of it",
                page,
                path,
                values.len(),
                row
            ))
        })?;
        if predicate.evaluate(value)? {
            run = Some(match run.take() {
                None => (row, row, value.clone(), value.clone()),
                Some((low, _, min, max)) => (
                    low,
                    row,
                    min_of(min, value.clone())?,
                    max_of(max, value.clone())?,
                ),
            });
        } else if let Some((low, high, min, max)) = run.take() {
            out.push(range.extend_with(low, high, &path, min, max)?);
        }
    }
    if let Some((low, high, min, max)) = run.take() {
        out.push(range.extend_with(low, high, &path, min, max)?);
    }
    Ok(out)
}
