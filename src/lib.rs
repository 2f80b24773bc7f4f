#![forbid(unsafe_code)]
//! Predicate-pushdown planning and row-range streaming over parquet-like
//! columnar readers.
//!
//! Given a declarative filter specification, the pipeline prunes work in
//! three levels (row-group statistics, page indexes, page values) before
//! decoding only the required fields of the surviving row ranges.
//! Parsing the on-disk format stays behind the [`reader::Reader`] trait;
//! this crate plans and streams.

pub mod cache;
pub mod error;
pub mod filter;
pub mod indexes;
pub mod load;
pub mod metadata;
pub mod predicate;
pub mod reader;
pub mod row_range;
pub mod scan;
pub mod sort;
pub mod types;

pub use cache::{Cache, CacheEvents, CacheKey, DEFAULT_CACHE_CAPACITY};
pub use error::{Error, Result};
pub use filter::RangeStream;
pub use load::FieldSpec;
pub use metadata::{ColumnChunkMetaData, ColumnPath, RowGroupMetaData, Statistics};
pub use predicate::{parse_filter, parse_phase, Predicate};
pub use reader::Reader;
pub use row_range::RowRange;
pub use scan::{
    scan, scan_ranges, PostFilterFn, PostStage, PostTransformFn, Query, RecordStream,
    DEFAULT_FAN_OUT,
};
pub use sort::SortSpec;
pub use types::{Record, Scalar};
