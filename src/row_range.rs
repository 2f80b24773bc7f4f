//! The pipeline's unit of work: a contiguous row interval inside one row
//! group, carrying everything later stages have learned about it.
//!
//! Narrowing never mutates a range. A derived range holds a pointer to
//! its parent and a sparse per-path map of tightened bounds; bound
//! lookups walk the chain. Fetched offset and column indexes live in a
//! store shared by the whole lineage, so children see what their
//! ancestors primed without copying.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::cache::Cache;
use crate::error::{Error, Result};
use crate::indexes::{ColumnIndex, OffsetIndex};
use crate::metadata::{ColumnPath, RowGroupMetaData};
use crate::reader::Reader;
use crate::types::{compare_values, Scalar};

/// Per-lineage store of primed indexes. Writes are confined to the first
/// fetch of each path; concurrent primes are deduplicated by the cache.
#[derive(Default)]
struct IndexStore {
    offset: Mutex<HashMap<ColumnPath, Arc<OffsetIndex>>>,
    column: Mutex<HashMap<ColumnPath, Arc<ColumnIndex>>>,
}

/// What every range of one lineage shares.
struct RangeContext {
    reader: Arc<dyn Reader>,
    cache: Arc<Cache>,
    row_group: RowGroupMetaData,
    row_group_no: usize,
    indexes: IndexStore,
}

struct RangeNode {
    parent: Option<Arc<RangeNode>>,
    low: u64,
    high: u64,
    /// Sparse per-path overrides of the row-group statistics, established
    /// by whichever filter narrowed this range.
    tightened: HashMap<ColumnPath, (Scalar, Scalar)>,
}

/// A contiguous row interval `[low, high]` inside one row group.
#[derive(Clone)]
pub struct RowRange {
    ctx: Arc<RangeContext>,
    node: Arc<RangeNode>,
}

impl std::fmt::Debug for RowRange {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("RowRange")
            .field("reader", &self.ctx.reader.id())
            .field("row_group", &self.ctx.row_group_no)
            .field("low", &self.node.low)
            .field("high", &self.node.high)
            .finish()
    }
}

impl RowRange {
    /// The root range covering a whole row group. `None` for an empty row
    /// group.
    pub fn root(
        reader: Arc<dyn Reader>,
        cache: Arc<Cache>,
        row_group_no: usize,
    ) -> Result<Option<RowRange>> {
        let row_group = reader
            .row_groups()
            .get(row_group_no)
            .ok_or_else(|| {
                Error::Invariant(format!(
                    "reader {} has no row group {}",
                    reader.id(),
                    row_group_no
                ))
            })?
            .clone();
        if row_group.num_rows() == 0 {
            return Ok(None);
        }
        let high = row_group.num_rows() - 1;
        Ok(Some(RowRange {
            ctx: Arc::new(RangeContext {
                reader,
                cache,
                row_group,
                row_group_no,
                indexes: IndexStore::default(),
            }),
            node: Arc::new(RangeNode {
                parent: None,
                low: 0,
                high,
                tightened: HashMap::new(),
            }),
        }))
    }

    pub fn low(&self) -> u64 {
        self.node.low
    }

    pub fn high(&self) -> u64 {
        self.node.high
    }

    /// Number of rows in this range. Never zero: `low <= high` holds by
    /// construction.
    pub fn num_selected(&self) -> u64 {
        self.node.high - self.node.low + 1
    }

    pub fn reader_id(&self) -> &str {
        self.ctx.reader.id()
    }

    pub fn row_group_no(&self) -> usize {
        self.ctx.row_group_no
    }

    pub fn row_group(&self) -> &RowGroupMetaData {
        &self.ctx.row_group
    }

    pub fn num_rows(&self) -> u64 {
        self.ctx.row_group.num_rows()
    }

    /// The effective lower bound of `path` over this range: the tightened
    /// bound when a filter established one, else the row-group statistic.
    pub fn min_value(&self, path: &ColumnPath) -> Option<Scalar> {
        if let Some((min, _)) = self.tightened(path) {
            return Some(min);
        }
        self.ctx
            .row_group
            .column(path)
            .and_then(|c| c.statistics())
            .and_then(|s| s.min_value.clone())
    }

    /// The effective upper bound of `path` over this range.
    pub fn max_value(&self, path: &ColumnPath) -> Option<Scalar> {
        if let Some((_, max)) = self.tightened(path) {
            return Some(max);
        }
        self.ctx
            .row_group
            .column(path)
            .and_then(|c| c.statistics())
            .and_then(|s| s.max_value.clone())
    }

    fn tightened(&self, path: &ColumnPath) -> Option<(Scalar, Scalar)> {
        let mut node = Some(&self.node);
        while let Some(current) = node {
            if let Some(bounds) = current.tightened.get(path) {
                return Some(bounds.clone());
            }
            node = current.parent.as_ref();
        }
        None
    }

    /// Derives a narrowed range `[low, high]` sharing this range's primed
    /// indexes and tightened bounds.
    pub fn extend(&self, low: u64, high: u64) -> Result<RowRange> {
        self.derive(low, high, HashMap::new())
    }

    /// Derives a narrowed range and records tightened bounds for `path`,
    /// valid over the derived range only.
    pub fn extend_with(
        &self,
        low: u64,
        high: u64,
        path: &ColumnPath,
        min: Scalar,
        max: Scalar,
    ) -> Result<RowRange> {
        if let Some(std::cmp::Ordering::Greater) = compare_values(&min, &max)? {
            return Err(Error::Invariant(format!(
                "tightened bounds out of order for {}: {:?} > {:?}",
                path, min, max
            )));
        }
        let mut tightened = HashMap::new();
        tightened.insert(path.clone(), (min, max));
        self.derive(low, high, tightened)
    }

    fn derive(
        &self,
        low: u64,
        high: u64,
        tightened: HashMap<ColumnPath, (Scalar, Scalar)>,
    ) -> Result<RowRange> {
        if low > high || high >= self.ctx.row_group.num_rows() {
            return Err(Error::Invariant(format!(
                "derived range [{}, {}] escapes row group of {} rows",
                low,
                high,
                self.ctx.row_group.num_rows()
            )));
        }
        Ok(RowRange {
            ctx: self.ctx.clone(),
            node: Arc::new(RangeNode {
                parent: Some(self.node.clone()),
                low,
                high,
                tightened,
            }),
        })
    }

    /// Fetches the offset index of `path` through the cache, once per
    /// lineage. Idempotent.
    pub async fn prime_offset_index(&self, path: &ColumnPath) -> Result<Arc<OffsetIndex>> {
        if let Some(index) = self.ctx.indexes.offset.lock().unwrap().get(path) {
            return Ok(index.clone());
        }
        let index = self
            .ctx
            .cache
            .offset_index(&self.ctx.reader, self.ctx.row_group_no, path)
            .await?;
        self.ctx
            .indexes
            .offset
            .lock()
            .unwrap()
            .insert(path.clone(), index.clone());
        Ok(index)
    }

    /// Fetches the column index of `path` through the cache, once per
    /// lineage. Idempotent.
    pub async fn prime_column_index(&self, path: &ColumnPath) -> Result<Arc<ColumnIndex>> {
        if let Some(index) = self.ctx.indexes.column.lock().unwrap().get(path) {
            return Ok(index.clone());
        }
        let index = self
            .ctx
            .cache
            .column_index(&self.ctx.reader, self.ctx.row_group_no, path)
            .await?;
        self.ctx
            .indexes
            .column
            .lock()
            .unwrap()
            .insert(path.clone(), index.clone());
        Ok(index)
    }

    /// The already-primed offset index of `path`, if any.
    pub fn offset_index(&self, path: &ColumnPath) -> Option<Arc<OffsetIndex>> {
        self.ctx.indexes.offset.lock().unwrap().get(path).cloned()
    }

    /// The already-primed column index of `path`, if any.
    pub fn column_index(&self, path: &ColumnPath) -> Option<Arc<ColumnIndex>> {
        self.ctx.indexes.column.lock().unwrap().get(path).cloned()
    }

    /// The page of `path` containing `row`. Requires a primed offset
    /// index.
    pub fn find_relevant_page_index(&self, path: &ColumnPath, row: u64) -> Result<usize> {
        let index = self.offset_index(path).ok_or_else(|| {
            Error::Invariant(format!("offset index of {} was not primed", path))
        })?;
        index.find_relevant_page(row)
    }

    /// The decoded values of one page of `path`. Short-scope fetch: the
    /// cache only deduplicates requesters in flight.
    pub async fn page_data(&self, path: &ColumnPath, page: usize) -> Result<Arc<Vec<Scalar>>> {
        self.ctx
            .cache
            .page(&self.ctx.reader, self.ctx.row_group_no, path, page)
            .await
    }
}
