//! The index-only filter stage: narrows a range to the pages whose
//! column-index entries can match, without ever touching page data.

use crate::error::{Error, Result};
use crate::predicate::Predicate;
use crate::row_range::RowRange;
use crate::types::{max_of, min_of, Scalar};

/// A run of consecutive matching pages being assembled.
struct Run {
    low: u64,
    high: u64,
    min: Scalar,
    max: Scalar,
}

pub(crate) async fn index_filter(
    predicate: &Predicate,
    range: RowRange,
) -> Result<Vec<RowRange>> {
    // row-group statistics first: a disproven filter must not fetch any
    // index at all
    if !predicate.fast_filter(&range)? {
        return Ok(vec![]);
    }
    if predicate.fast_pass(&range)? {
        return Ok(vec![range]);
    }
    let path = predicate
        .path()
        .cloned()
        .ok_or_else(|| Error::Invariant("index stage requires a leaf predicate".to_string()))?;

    let (offset, column) = futures::try_join!(
        range.prime_offset_index(&path),
        range.prime_column_index(&path)
    )?;

    let num_rows = range.num_rows();
    let first = offset.find_relevant_page(range.low())?;
    let last = offset.find_relevant_page(range.high())?;

    let mut out = Vec::new();
    let mut run: Option<Run> = None;
    for page in first..=last {
        let (page_start, page_end) = offset.page_interval(page, num_rows)?;
        let low = page_start.max(range.low());
        let high = page_end.min(range.high());
        let (page_min, page_max) = column.page_bounds(page)?;
        let hit = low <= high && predicate.evaluate_bounds(page_min, page_max)?;
        if hit {
            // a hit implies the page carries bounds (all-null pages never
            // match)
            let (page_min, page_max) = match (page_min, page_max) {
                (Some(min), Some(max)) => (min.clone(), max.clone()),
                _ => {
                    return Err(Error::Invariant(format!(
                        "page {} of {} matched without column-index bounds",
                        page, path
                    )))
                }
            };
            run = Some(match run.take() {
                None => Run {
                    low,
                    high,
                    min: page_min,
                    max: page_max,
                },
                Some(current) => Run {
                    low: current.low,
                    high,
                    min: min_of(current.min, page_min)?,
                    max: max_of(current.max, page_max)?,
                },
            });
        } else if let Some(current) = run.take() {
            out.push(range.extend_with(
                current.low,
                current.high,
                &path,
                current.min,
                current.max,
            )?);
        }
    }
    if let Some(current) = run.take() {
        out.push(range.extend_with(
            current.low,
            current.high,
            &path,
            current.min,
            current.max,
        )?);
    }
    Ok(out)
}
