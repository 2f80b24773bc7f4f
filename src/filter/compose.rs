//! Composite stages: AND priming and OR union.

use std::sync::Arc;

use futures::future;
use futures::stream::{self, StreamExt, TryStreamExt};

use super::{apply, RangeStream, Stage};
use crate::error::{Error, Result};
use crate::metadata::ColumnPath;
use crate::row_range::RowRange;

/// Primes the offset (and, for non-source paths, column) indexes of every
/// leaf under an AND, all in parallel, before its children run serially.
pub(crate) async fn prime_paths(
    paths: &[(ColumnPath, bool)],
    range: &RowRange,
) -> Result<()> {
    let primes = paths.iter().map(|(path, source)| {
        let range = range.clone();
        let path = path.clone();
        let source = *source;
        async move {
            if source {
                range.prime_offset_index(&path).await?;
            } else {
                futures::try_join!(
                    range.prime_offset_index(&path),
                    range.prime_column_index(&path)
                )?;
            }
            Ok::<_, Error>(())
        }
    });
    future::try_join_all(primes).await?;
    Ok(())
}

/// Runs every child as an independent sub-pipeline over one input range
/// and unions their emissions over the row-index domain.
///
/// A bitmap of already-claimed positions (relative to the input) makes
/// the union first-wins: a row is emitted at most once per input range,
/// attributed to the earliest child that matched it. The final emission
/// is ordered by `low` so a lineage's outputs stay non-decreasing and
/// non-overlapping.
pub(crate) async fn or_filter(
    children: Arc<Vec<Arc<Stage>>>,
    range: RowRange,
    fan_out: usize,
) -> Result<Vec<RowRange>> {
    let len = usize::try_from(range.num_selected())
        .map_err(|_| Error::Invariant("range too large for a union bitmap".to_string()))?;
    let base = range.low();
    let mut claimed = vec![false; len];
    let mut pieces: Vec<RowRange> = Vec::new();

    for child in children.iter() {
        let input: RangeStream = stream::once(future::ready(Ok(range.clone()))).boxed();
        let emitted: Vec<RowRange> =
            apply(child.clone(), input, fan_out).try_collect().await?;
        for child_range in emitted {
            if child_range.low() < base || child_range.high() > range.high() {
                return Err(Error::Invariant(format!(
                    "or child emitted [{}, {}] outside its input [{}, {}]",
                    child_range.low(),
                    child_range.high(),
                    base,
                    range.high()
                )));
            }
            let mut row = child_range.low();
            while row <= child_range.high() {
                if claimed[(row - base) as usize] {
                    row += 1;
                    continue;
                }
                let run_low = row;
                while row <= child_range.high() && !claimed[(row - base) as usize] {
                    claimed[(row - base) as usize] = true;
                    row += 1;
                }
                pieces.push(child_range.extend(run_low, row - 1)?);
            }
        }
    }

    pieces.sort_by_key(|piece| piece.low());
    Ok(pieces)
}
