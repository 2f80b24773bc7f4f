//! Optional globally-sorted emission.
//!
//! Pages are merged by their column-index bounds: repeatedly pick the
//! smallest page max among not-yet-read pages, materialize every unread
//! page whose min is below it, sort the buffered rows and flush those at
//! or below the bound. Memory stays proportional to the overlap window
//! of the pages, not to the whole result.

use std::cmp::Ordering;
use std::sync::Arc;

use async_stream::try_stream;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};

use crate::error::Result;
use crate::filter::RangeStream;
use crate::load::{load_fields, FieldSpec};
use crate::metadata::ColumnPath;
use crate::row_range::RowRange;
use crate::types::{compare_values, Record, Scalar};

/// Sorts the emitted records globally by one materialized field,
/// ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub path: ColumnPath,
}

impl SortSpec {
    pub fn new(path: impl Into<ColumnPath>) -> Self {
        Self { path: path.into() }
    }
}

/// One single-page slice of a surviving range, with the page's
/// column-index bounds.
struct PageSlice {
    slice: RowRange,
    min: Option<Scalar>,
    max: Option<Scalar>,
    read: bool,
}

fn rank(value: &Scalar) -> u8 {
    match value {
        Scalar::Null => 0,
        Scalar::Boolean(_) => 1,
        Scalar::Int64(_) | Scalar::Double(_) => 2,
        Scalar::Utf8(_) => 3,
    }
}

/// Total order over sort keys: nulls first, undecidable pairs grouped by
/// kind.
fn key_cmp(a: &Scalar, b: &Scalar) -> Ordering {
    match compare_values(a, b) {
        Ok(Some(ordering)) => ordering,
        _ => rank(a).cmp(&rank(b)),
    }
}

fn bound_cmp(a: &Option<Scalar>, b: &Option<Scalar>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => key_cmp(a, b),
    }
}

/// Materializes `ranges` into records sorted by `sort`, merging across
/// pages and row groups.
pub(crate) fn sorted_stream(
    ranges: RangeStream,
    fields: Arc<Vec<FieldSpec>>,
    sort: SortSpec,
) -> BoxStream<'static, Result<Record>> {
    let key = sort.path.string();
    try_stream! {
        let ranges: Vec<RowRange> = ranges.try_collect().await?;

        // split every range into single-page slices of the sort column
        let mut slices: Vec<PageSlice> = Vec::new();
        for range in ranges {
            let (offset, column) = futures::try_join!(
                range.prime_offset_index(&sort.path),
                range.prime_column_index(&sort.path)
            )?;
            let num_rows = range.num_rows();
            let first = offset.find_relevant_page(range.low())?;
            let last = offset.find_relevant_page(range.high())?;
            for page in first..=last {
                let (page_start, page_end) = offset.page_interval(page, num_rows)?;
                let low = page_start.max(range.low());
                let high = page_end.min(range.high());
                if low > high {
                    continue;
                }
                let (min, max) = column.page_bounds(page)?;
                slices.push(PageSlice {
                    slice: range.extend(low, high)?,
                    min: min.cloned(),
                    max: max.cloned(),
                    read: false,
                });
            }
        }

        let mut buffer: Vec<(Scalar, Record)> = Vec::new();
        while slices.iter().any(|slice| !slice.read) {
            // the smallest page max among unread pages bounds what can be
            // flushed this round
            let bound = slices
                .iter()
                .filter(|slice| !slice.read)
                .map(|slice| slice.max.clone())
                .min_by(bound_cmp)
                .flatten();

            for slice in slices.iter_mut().filter(|slice| !slice.read) {
                let materialize = match (&slice.min, &bound) {
                    (None, _) | (_, None) => true,
                    (Some(min), Some(bound)) => key_cmp(min, bound) != Ordering::Greater,
                };
                if !materialize {
                    continue;
                }
                slice.read = true;
                let records = load_fields(&fields, &slice.slice).await?;
                for record in records {
                    let key_value = record
                        .get(&key)
                        .and_then(Scalar::from_json)
                        .unwrap_or(Scalar::Null);
                    buffer.push((key_value, record));
                }
            }

            buffer.sort_by(|a, b| key_cmp(&a.0, &b.0));
            let flushed = match &bound {
                // every unread page was materialized this round
                None => buffer.len(),
                Some(bound) => buffer
                    .iter()
                    .position(|(key_value, _)| key_cmp(key_value, bound) == Ordering::Greater)
                    .unwrap_or(buffer.len()),
            };
            let flushable: Vec<(Scalar, Record)> = buffer.drain(..flushed).collect();
            for (_, record) in flushable {
                yield record;
            }
        }

        buffer.sort_by(|a, b| key_cmp(&a.0, &b.0));
        for (_, record) in buffer {
            yield record;
        }
    }
    .boxed()
}
