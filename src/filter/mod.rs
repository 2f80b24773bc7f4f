//! Per-phase stream transducers.
//!
//! A compiled phase turns a stream of [`RowRange`]s into a stream of
//! narrowed, multiplied or dropped ranges. Leaves come in two flavors,
//! index-only pruning and page-value scanning; composites wire their
//! children together without ever looking at page data themselves.

mod compose;
mod index;
mod value;

use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use futures::stream::{self, BoxStream, StreamExt};

use crate::error::Result;
use crate::metadata::ColumnPath;
use crate::predicate::Predicate;
use crate::row_range::RowRange;

use compose::{or_filter, prime_paths};
use index::index_filter;
use value::{scan_filter, split_filter};

/// A backpressured stream of row ranges.
pub type RangeStream = BoxStream<'static, Result<RowRange>>;

/// The execution plan of one phase.
pub(crate) enum Stage {
    /// Index-only pruning; never reads page data.
    Index(Arc<Predicate>),
    /// Split by page, then scan page values.
    Value(Arc<Predicate>),
    /// Declares a path only; every range passes.
    Pass,
    /// Children run serially, each consuming the previous one's output.
    And {
        children: Vec<Arc<Stage>>,
        paths: Vec<(ColumnPath, bool)>,
    },
    /// Children run as independent sub-pipelines whose emissions are
    /// unioned per input range.
    Or(Vec<Arc<Stage>>),
}

impl Stage {
    pub(crate) fn compile(predicate: &Predicate) -> Arc<Stage> {
        match predicate {
            Predicate::And(children) => Arc::new(Stage::And {
                children: children.iter().map(|c| Stage::compile(c)).collect(),
                paths: predicate
                    .leaf_paths()
                    .into_iter()
                    .map(|(path, source)| (path.clone(), source))
                    .collect(),
            }),
            Predicate::Or(children) => {
                Arc::new(Stage::Or(children.iter().map(|c| Stage::compile(c)).collect()))
            }
            Predicate::Path { .. } => Arc::new(Stage::Pass),
            leaf if leaf.is_index_only() && !leaf.is_source() => {
                Arc::new(Stage::Index(Arc::new(leaf.clone())))
            }
            leaf => Arc::new(Stage::Value(Arc::new(leaf.clone()))),
        }
    }
}

/// Applies a compiled phase to a stream of ranges with bounded fan-out.
pub(crate) fn apply(stage: Arc<Stage>, input: RangeStream, fan_out: usize) -> RangeStream {
    match &*stage {
        Stage::Pass => input,
        Stage::Index(predicate) => {
            let predicate = predicate.clone();
            transduce(input, fan_out, move |range| {
                let predicate = predicate.clone();
                async move { index_filter(&predicate, range).await }.boxed()
            })
        }
        Stage::Value(predicate) => {
            let split = {
                let predicate = predicate.clone();
                transduce(input, fan_out, move |range| {
                    let predicate = predicate.clone();
                    async move { split_filter(&predicate, range).await }.boxed()
                })
            };
            let predicate = predicate.clone();
            transduce(split, fan_out, move |range| {
                let predicate = predicate.clone();
                async move { scan_filter(&predicate, range).await }.boxed()
            })
        }
        Stage::And { children, paths } => {
            let paths = Arc::new(paths.clone());
            let primed = transduce(input, fan_out, move |range| {
                let paths = paths.clone();
                async move {
                    prime_paths(&paths, &range).await?;
                    Ok(vec![range])
                }
                .boxed()
            });
            children
                .iter()
                .fold(primed, |acc, child| apply(child.clone(), acc, fan_out))
        }
        Stage::Or(children) => {
            let children: Arc<Vec<Arc<Stage>>> = Arc::new(children.clone());
            transduce(input, fan_out, move |range| {
                let children = children.clone();
                async move { or_filter(children, range, fan_out).await }.boxed()
            })
        }
    }
}

/// Maps every range through `f` with at most `fan_out` calls in flight,
/// preserving input order, and flattens the results.
pub(crate) fn transduce<F>(input: RangeStream, fan_out: usize, f: F) -> RangeStream
where
    F: Fn(RowRange) -> BoxFuture<'static, Result<Vec<RowRange>>> + Send + Sync + 'static,
{
    let f = Arc::new(f);
    input
        .map(move |item| {
            let f = f.clone();
            async move {
                match item {
                    Ok(range) => f(range).await,
                    Err(e) => Err(e),
                }
            }
        })
        .buffered(fan_out.max(1))
        .flat_map(|item| match item {
            Ok(ranges) => stream::iter(ranges.into_iter().map(Ok)).left_stream(),
            Err(e) => stream::once(future::ready(Err(e))).right_stream(),
        })
        .boxed()
}
