//! The field loader: turns surviving row ranges into records.
//!
//! A range is split so that within each sub-range every requested path
//! sits inside a single page; the per-path pages of a sub-range are then
//! fetched concurrently and rows assembled by indexing each page at
//! `row - first_row_index`.

use std::sync::Arc;

use futures::future::try_join_all;

use crate::error::{Error, Result};
use crate::indexes::OffsetIndex;
use crate::metadata::ColumnPath;
use crate::row_range::RowRange;
use crate::types::{Record, Scalar};

/// A column to materialize into records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub path: ColumnPath,
    /// The column holds JSON documents: parse each and merge its keys
    /// into the record instead of the raw text.
    pub source: bool,
}

impl FieldSpec {
    pub fn new(path: impl Into<ColumnPath>) -> Self {
        Self {
            path: path.into(),
            source: false,
        }
    }

    pub fn source(path: impl Into<ColumnPath>) -> Self {
        Self {
            path: path.into(),
            source: true,
        }
    }
}

/// One sub-range within which every field sits inside a single page.
struct FieldSlice {
    low: u64,
    high: u64,
    /// Per-field page ordinal, parallel to the requested fields.
    pages: Vec<usize>,
}

/// Materializes every row of `range` into records carrying the requested
/// fields.
pub async fn load_fields(fields: &[FieldSpec], range: &RowRange) -> Result<Vec<Record>> {
    let offsets =
        try_join_all(fields.iter().map(|field| range.prime_offset_index(&field.path))).await?;

    // multi-path page split: walk the smallest next page boundary across
    // all fields
    let mut pages = Vec::with_capacity(fields.len());
    for offset in &offsets {
        pages.push(offset.find_relevant_page(range.low())?);
    }
    let mut slices = Vec::new();
    let mut low = range.low();
    loop {
        let mut next_boundary: Option<u64> = None;
        for (field, offset) in offsets.iter().enumerate() {
            if let Some(location) = offset.page_locations.get(pages[field] + 1) {
                let boundary = location.first_row_index;
                if boundary > low && boundary <= range.high() {
                    next_boundary = Some(match next_boundary {
                        Some(current) => current.min(boundary),
                        None => boundary,
                    });
                }
            }
        }
        match next_boundary {
            Some(boundary) => {
                slices.push(FieldSlice {
                    low,
                    high: boundary - 1,
                    pages: pages.clone(),
                });
                // advance every field whose next page starts here
                for (field, offset) in offsets.iter().enumerate() {
                    if let Some(location) = offset.page_locations.get(pages[field] + 1) {
                        if location.first_row_index == boundary {
                            pages[field] += 1;
                        }
                    }
                }
                low = boundary;
            }
            None => {
                slices.push(FieldSlice {
                    low,
                    high: range.high(),
                    pages,
                });
                break;
            }
        }
    }

    let mut records = Vec::with_capacity(range.num_selected() as usize);
    for slice in slices {
        load_slice(fields, &offsets, range, &slice, &mut records).await?;
    }
    Ok(records)
}

async fn load_slice(
    fields: &[FieldSpec],
    offsets: &[Arc<OffsetIndex>],
    range: &RowRange,
    slice: &FieldSlice,
    records: &mut Vec<Record>,
) -> Result<()> {
    let pages = try_join_all(
        fields
            .iter()
            .zip(&slice.pages)
            .map(|(field, page)| range.page_data(&field.path, *page)),
    )
    .await?;

    for row in slice.low..=slice.high {
        let mut record = Record::new();
        for (field, (values, (offset, page))) in fields
            .iter()
            .zip(pages.iter().zip(offsets.iter().zip(&slice.pages)))
        {
            let page_start = offset
                .page_locations
                .get(*page)
                .map(|location| location.first_row_index)
                .ok_or_else(|| {
                    Error::Invariant(format!(
                        "offset index of {} lost page {}",
                        field.path, page
                    ))
                })?;
            let value = values.get((row - page_start) as usize).ok_or_else(|| {
                Error::Invariant(format!(
                    "page {} of {} holds {} values, row {} is out of it",
                    page,
                    field.path,
                    values.len(),
                    row
                ))
            })?;
            if field.source {
                merge_source(&field.path, value, &mut record)?;
            } else {
                record.insert(field.path.string(), value.to_json());
            }
        }
        records.push(record);
    }
    Ok(())
}

/// Parses a `source` column's JSON document and merges its keys into the
/// record. Null cells merge nothing.
fn merge_source(path: &ColumnPath, value: &Scalar, record: &mut Record) -> Result<()> {
    let text = match value {
        Scalar::Null => return Ok(()),
        Scalar::Utf8(text) => text,
        other => {
            return Err(Error::Reader(format!(
                "source column {} holds {:?}, expected JSON text",
                path, other
            )))
        }
    };
    let document: serde_json::Value = serde_json::from_str(text)?;
    match document {
        serde_json::Value::Object(object) => {
            for (key, value) in object {
                record.insert(key, value);
            }
            Ok(())
        }
        other => Err(Error::Reader(format!(
            "source column {} holds a non-object document: {}",
            path, other
        ))),
    }
}
