mod index;
mod intervals;

pub use index::ColumnIndex;
pub use intervals::{OffsetIndex, PageLocation};
