mod column_chunk_metadata;
mod column_path;
mod row_metadata;

pub use column_chunk_metadata::{ColumnChunkMetaData, Statistics};
pub use column_path::ColumnPath;
pub use row_metadata::RowGroupMetaData;
