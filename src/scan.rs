//! The public query surface: compile a declarative specification, wire
//! the phase pipeline and stream out matching ranges or records.

use std::sync::Arc;

use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value as Json;

use crate::cache::Cache;
use crate::error::{Error, Result};
use crate::filter::{apply, RangeStream, Stage};
use crate::load::{load_fields, FieldSpec};
use crate::metadata::ColumnPath;
use crate::predicate::{parse_filter, Predicate};
use crate::reader::Reader;
use crate::row_range::RowRange;
use crate::sort::{sorted_stream, SortSpec};
use crate::types::Record;

/// Default bound on in-flight operations per stage.
pub const DEFAULT_FAN_OUT: usize = 500;

/// A backpressured stream of materialized records.
pub type RecordStream = BoxStream<'static, Result<Record>>;

/// A user-supplied record predicate; an error terminates the stream.
pub type PostFilterFn =
    Arc<dyn Fn(&Record) -> std::result::Result<bool, String> + Send + Sync>;
/// A user-supplied record rewrite; an error terminates the stream.
pub type PostTransformFn =
    Arc<dyn Fn(Record) -> std::result::Result<Record, String> + Send + Sync>;

/// A stage running over materialized records, after filtering and
/// loading.
#[derive(Clone)]
pub enum PostStage {
    Filter(PostFilterFn),
    Transform(PostTransformFn),
}

/// A compiled query: ordered filter phases, the fields to materialize,
/// optional record post-stages and an optional final sort.
pub struct Query {
    filter: Vec<Predicate>,
    fields: Vec<FieldSpec>,
    post: Vec<PostStage>,
    sort: Option<SortSpec>,
    fan_out: usize,
}

impl Default for Query {
    fn default() -> Self {
        Self::new()
    }
}

impl Query {
    pub fn new() -> Self {
        Self {
            filter: Vec::new(),
            fields: Vec::new(),
            post: Vec::new(),
            sort: None,
            fan_out: DEFAULT_FAN_OUT,
        }
    }

    /// Compiles a declarative specification: an object with `filter` (an
    /// array of phases) and `fields` (an array of `{path, source?}`).
    /// Post stages are closures and attach programmatically.
    pub fn parse(spec: &Json) -> Result<Self> {
        let object = spec
            .as_object()
            .ok_or_else(|| Error::Spec(format!("a query must be an object, got {}", spec)))?;
        let mut query = Query::new();
        for (key, value) in object {
            match key.as_str() {
                "filter" => query.filter = parse_filter(value)?,
                "fields" => query.fields = parse_fields(value)?,
                "post" => {
                    return Err(Error::Spec(
                        "post stages are closures; attach them with `post_filter` \
                         and `post_transform`"
                            .to_string(),
                    ))
                }
                other => {
                    return Err(Error::Spec(format!("unknown query key `{}`", other)));
                }
            }
        }
        Ok(query)
    }

    /// Appends a filter phase; phases narrow in declaration order.
    pub fn phase(mut self, predicate: Predicate) -> Self {
        self.filter.push(predicate);
        self
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn post_filter(mut self, f: PostFilterFn) -> Self {
        self.post.push(PostStage::Filter(f));
        self
    }

    pub fn post_transform(mut self, f: PostTransformFn) -> Self {
        self.post.push(PostStage::Transform(f));
        self
    }

    /// Sorts the emitted records globally by a materialized field.
    pub fn sort_by(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Bounds in-flight operations per stage; defaults to
    /// [`DEFAULT_FAN_OUT`].
    pub fn fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = fan_out;
        self
    }
}

fn parse_fields(spec: &Json) -> Result<Vec<FieldSpec>> {
    let fields = spec
        .as_array()
        .ok_or_else(|| Error::Spec("`fields` must be an array".to_string()))?;
    fields
        .iter()
        .map(|field| {
            let object = field.as_object().ok_or_else(|| {
                Error::Spec(format!("a field must be an object, got {}", field))
            })?;
            let mut path = None;
            let mut source = false;
            for (key, value) in object {
                match key.as_str() {
                    "path" => {
                        path = Some(value.as_str().map(ColumnPath::from).ok_or_else(|| {
                            Error::Spec(format!("field `path` must be a string, got {}", value))
                        })?)
                    }
                    "source" => {
                        source = value.as_bool().ok_or_else(|| {
                            Error::Spec(format!(
                                "field `source` must be a boolean, got {}",
                                value
                            ))
                        })?
                    }
                    other => {
                        return Err(Error::Spec(format!("unknown field key `{}`", other)));
                    }
                }
            }
            let path =
                path.ok_or_else(|| Error::Spec("a field requires a `path`".to_string()))?;
            Ok(FieldSpec { path, source })
        })
        .collect()
}

/// Every path a query references must exist in every row group of every
/// reader; checked synchronously before any stream is built.
fn validate(readers: &[Arc<dyn Reader>], query: &Query) -> Result<()> {
    let mut paths: Vec<&ColumnPath> = Vec::new();
    for phase in &query.filter {
        paths.extend(phase.leaf_paths().into_iter().map(|(path, _)| path));
    }
    for field in &query.fields {
        paths.push(&field.path);
    }
    if let Some(sort) = &query.sort {
        paths.push(&sort.path);
        if !query.fields.iter().any(|field| field.path == sort.path) {
            return Err(Error::Spec(format!(
                "sort path {} must be listed in `fields`",
                sort.path
            )));
        }
    }
    for reader in readers {
        for (no, row_group) in reader.row_groups().iter().enumerate() {
            for path in &paths {
                if row_group.column(path).is_none() {
                    return Err(Error::Schema(format!(
                        "path {} is absent from row group {} of reader {}",
                        path,
                        no,
                        reader.id()
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Runs the filter phases and streams the surviving row ranges, one root
/// range per `(reader, row group)`.
pub fn scan_ranges(
    readers: &[Arc<dyn Reader>],
    query: &Query,
    cache: Arc<Cache>,
) -> Result<RangeStream> {
    validate(readers, query)?;

    let mut roots = Vec::new();
    for reader in readers {
        for no in 0..reader.row_groups().len() {
            if let Some(root) = RowRange::root(reader.clone(), cache.clone(), no)? {
                roots.push(root);
            }
        }
    }
    log::debug!(
        "scanning {} row groups through {} filter phases",
        roots.len(),
        query.filter.len()
    );

    let mut ranges: RangeStream = stream::iter(roots.into_iter().map(Ok)).boxed();
    for phase in &query.filter {
        ranges = apply(Stage::compile(phase), ranges, query.fan_out);
    }
    Ok(until_error(ranges))
}

/// Runs the whole pipeline and streams the materialized records.
pub fn scan(
    readers: &[Arc<dyn Reader>],
    query: &Query,
    cache: Arc<Cache>,
) -> Result<RecordStream> {
    let ranges = scan_ranges(readers, query, cache)?;
    let fields = Arc::new(query.fields.clone());

    let mut records: RecordStream = match &query.sort {
        Some(sort) => sorted_stream(ranges, fields, sort.clone()),
        None => {
            let fan_out = query.fan_out.max(1);
            ranges
                .map(move |item| {
                    let fields = fields.clone();
                    async move {
                        match item {
                            Ok(range) => load_fields(&fields, &range).await,
                            Err(e) => Err(e),
                        }
                    }
                })
                .buffered(fan_out)
                .flat_map(|item| match item {
                    Ok(records) => stream::iter(records.into_iter().map(Ok)).left_stream(),
                    Err(e) => stream::once(future::ready(Err(e))).right_stream(),
                })
                .boxed()
        }
    };

    for stage in &query.post {
        records = apply_post(records, stage.clone());
    }
    Ok(until_error(records))
}

fn apply_post(records: RecordStream, stage: PostStage) -> RecordStream {
    match stage {
        PostStage::Filter(f) => records
            .filter_map(move |item| {
                let out = match item {
                    Ok(record) => match f(&record) {
                        Ok(true) => Some(Ok(record)),
                        Ok(false) => None,
                        Err(message) => Some(Err(Error::Reader(message))),
                    },
                    Err(e) => Some(Err(e)),
                };
                future::ready(out)
            })
            .boxed(),
        PostStage::Transform(f) => records
            .map(move |item| match item {
                Ok(record) => f(record).map_err(Error::Reader),
                Err(e) => Err(e),
            })
            .boxed(),
    }
}

/// Errors terminate the pipeline: nothing is emitted past the first one,
/// while output already emitted stands.
fn until_error<T: Send + 'static>(
    stream: BoxStream<'static, Result<T>>,
) -> BoxStream<'static, Result<T>> {
    stream
        .scan(false, |errored, item| {
            if *errored {
                return future::ready(None);
            }
            *errored = item.is_err();
            future::ready(Some(item))
        })
        .boxed()
}
