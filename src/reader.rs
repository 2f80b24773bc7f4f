//! The contract an external data source implements.
//!
//! The pipeline never touches the on-disk format: decoding thrift
//! metadata, page headers and compressed chunks all live behind this
//! trait. The core only needs decoded row-group metadata plus three
//! asynchronous fetch operations.

use async_trait::async_trait;

use crate::error::Result;
use crate::indexes::{ColumnIndex, OffsetIndex};
use crate::metadata::{ColumnPath, RowGroupMetaData};
use crate::types::Scalar;

/// An opened columnar file (or file-like source).
///
/// Implementations are treated as immutable after open, and their `id`
/// must be stable and unique per source: it namespaces the process-wide
/// cache.
#[async_trait]
pub trait Reader: Send + Sync {
    /// A stable unique identifier of this source.
    fn id(&self) -> &str;

    /// The ordered row groups of this source. Ordinals are the positions
    /// in this slice.
    fn row_groups(&self) -> &[RowGroupMetaData];

    /// Fetches and decodes the offset index of one column chunk.
    async fn read_offset_index(
        &self,
        row_group: usize,
        path: &ColumnPath,
    ) -> Result<OffsetIndex>;

    /// Fetches and decodes the column index of one column chunk, parallel
    /// to its offset index.
    async fn read_column_index(
        &self,
        row_group: usize,
        path: &ColumnPath,
    ) -> Result<ColumnIndex>;

    /// Fetches and decodes the values of one page of one column chunk.
    async fn read_page(
        &self,
        row_group: usize,
        path: &ColumnPath,
        page: usize,
    ) -> Result<Vec<Scalar>>;
}
