use super::column_path::ColumnPath;
use crate::types::Scalar;

/// Row-group-level statistics of a column chunk.
///
/// Either bound is `None` when the writer did not record it; an absent
/// bound can neither prune nor fast-pass a range.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statistics {
    pub min_value: Option<Scalar>,
    pub max_value: Option<Scalar>,
}

impl Statistics {
    pub fn new(min_value: Option<Scalar>, max_value: Option<Scalar>) -> Self {
        Self {
            min_value,
            max_value,
        }
    }
}

/// Metadata for a column chunk, as decoded by the reader.
#[derive(Debug, Clone)]
pub struct ColumnChunkMetaData {
    path_in_schema: ColumnPath,
    statistics: Option<Statistics>,
}

impl ColumnChunkMetaData {
    pub fn new(path_in_schema: ColumnPath, statistics: Option<Statistics>) -> Self {
        Self {
            path_in_schema,
            statistics,
        }
    }

    /// The path of this column in the schema.
    pub fn path_in_schema(&self) -> &ColumnPath {
        &self.path_in_schema
    }

    /// Statistics of this column chunk, when the writer recorded them.
    pub fn statistics(&self) -> Option<&Statistics> {
        self.statistics.as_ref()
    }
}
