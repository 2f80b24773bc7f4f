use super::column_chunk_metadata::ColumnChunkMetaData;
use super::column_path::ColumnPath;

/// Metadata for a row group.
#[derive(Debug, Clone)]
pub struct RowGroupMetaData {
    columns: Vec<ColumnChunkMetaData>,
    num_rows: u64,
}

impl RowGroupMetaData {
    pub fn new(columns: Vec<ColumnChunkMetaData>, num_rows: u64) -> Self {
        Self { columns, num_rows }
    }

    /// Number of columns in this row group.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Returns slice of column chunk metadata.
    pub fn columns(&self) -> &[ColumnChunkMetaData] {
        &self.columns
    }

    /// Returns the column chunk at `path`, if the row group carries it.
    pub fn column(&self, path: &ColumnPath) -> Option<&ColumnChunkMetaData> {
        self.columns.iter().find(|c| c.path_in_schema() == path)
    }

    /// Number of rows in this row group.
    pub fn num_rows(&self) -> u64 {
        self.num_rows
    }
}
