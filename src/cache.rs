//! Process-wide content store for fetched indexes and in-flight pages.
//!
//! Two tiers: a bounded LRU for offset and column indexes (small, reused
//! across queries) and a short-scope map of in-flight page fetches that
//! is drained as soon as a consumer resolves them. Both tiers store
//! shared futures, so any number of concurrent requesters of one key ride
//! a single underlying reader call.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;

use crate::error::{Error, Result};
use crate::indexes::{ColumnIndex, OffsetIndex};
use crate::metadata::ColumnPath;
use crate::reader::Reader;
use crate::types::Scalar;

/// Default capacity of the durable index tier.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// What a cache entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    OffsetIndex,
    ColumnIndex,
    Page,
}

/// Key of a cached fetch. The row-group ordinal is always part of the
/// key: column layouts repeat across row groups and must not collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub reader: String,
    pub row_group: usize,
    pub kind: FetchKind,
    pub path: ColumnPath,
    pub page: Option<usize>,
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.page {
            Some(page) => write!(
                f,
                "{}/rg{}/{:?}/{}/p{}",
                self.reader, self.row_group, self.kind, self.path, page
            ),
            None => write!(
                f,
                "{}/rg{}/{:?}/{}",
                self.reader, self.row_group, self.kind, self.path
            ),
        }
    }
}

/// Observability hooks. Implementations must not change cache behavior.
pub trait CacheEvents: Send + Sync {
    /// A key is about to be looked up.
    fn read(&self, _key: &CacheKey) {}
    /// A lookup missed and a reader fetch was scheduled.
    fn miss(&self, _key: &CacheKey) {}
    /// A lookup's future resolved for this requester.
    fn complete(&self, _key: &CacheKey) {}
}

struct NoEvents;

impl CacheEvents for NoEvents {}

/// [`CacheEvents`] implementation that traces through the `log` facade.
pub struct LogEvents;

impl CacheEvents for LogEvents {
    fn read(&self, key: &CacheKey) {
        log::trace!("cache read {}", key);
    }
    fn miss(&self, key: &CacheKey) {
        log::debug!("cache miss {}", key);
    }
    fn complete(&self, key: &CacheKey) {
        log::trace!("cache complete {}", key);
    }
}

#[derive(Clone)]
enum CachedIndex {
    Offset(Arc<OffsetIndex>),
    Column(Arc<ColumnIndex>),
}

type SharedFetch<T> = Shared<BoxFuture<'static, Result<T>>>;

/// The two-tier content store.
pub struct Cache {
    indexes: Mutex<LruCache<CacheKey, SharedFetch<CachedIndex>>>,
    pages: Mutex<HashMap<CacheKey, SharedFetch<Arc<Vec<Scalar>>>>>,
    events: Box<dyn CacheEvents>,
}

impl Cache {
    /// A cache with [`DEFAULT_CACHE_CAPACITY`] durable entries.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            indexes: Mutex::new(LruCache::new(capacity)),
            pages: Mutex::new(HashMap::new()),
            events: Box::new(NoEvents),
        }
    }

    pub fn with_events(mut self, events: Box<dyn CacheEvents>) -> Self {
        self.events = events;
        self
    }

    /// The offset index of one column chunk, fetching it through `reader`
    /// at most once no matter how many requesters race.
    pub async fn offset_index(
        &self,
        reader: &Arc<dyn Reader>,
        row_group: usize,
        path: &ColumnPath,
    ) -> Result<Arc<OffsetIndex>> {
        let key = CacheKey {
            reader: reader.id().to_string(),
            row_group,
            kind: FetchKind::OffsetIndex,
            path: path.clone(),
            page: None,
        };
        let fetch = self.index_fetch(&key, {
            let reader = reader.clone();
            let path = path.clone();
            async move {
                let index = reader.read_offset_index(row_group, &path).await?;
                Ok(CachedIndex::Offset(Arc::new(index)))
            }
            .boxed()
        });
        let out = fetch.await;
        self.events.complete(&key);
        match out? {
            CachedIndex::Offset(index) => Ok(index),
            CachedIndex::Column(_) => Err(Error::Invariant(format!(
                "cache entry {} holds a column index",
                key
            ))),
        }
    }

    /// The column index of one column chunk; same sharing as
    /// [`Cache::offset_index`].
    pub async fn column_index(
        &self,
        reader: &Arc<dyn Reader>,
        row_group: usize,
        path: &ColumnPath,
    ) -> Result<Arc<ColumnIndex>> {
        let key = CacheKey {
            reader: reader.id().to_string(),
            row_group,
            kind: FetchKind::ColumnIndex,
            path: path.clone(),
            page: None,
        };
        let fetch = self.index_fetch(&key, {
            let reader = reader.clone();
            let path = path.clone();
            async move {
                let index = reader.read_column_index(row_group, &path).await?;
                Ok(CachedIndex::Column(Arc::new(index)))
            }
            .boxed()
        });
        let out = fetch.await;
        self.events.complete(&key);
        match out? {
            CachedIndex::Column(index) => Ok(index),
            CachedIndex::Offset(_) => Err(Error::Invariant(format!(
                "cache entry {} holds an offset index",
                key
            ))),
        }
    }

    /// The decoded values of one page. Short-scope: concurrent requesters
    /// share the in-flight fetch, and the entry is dropped once the first
    /// consumer resolves it.
    pub async fn page(
        &self,
        reader: &Arc<dyn Reader>,
        row_group: usize,
        path: &ColumnPath,
        page: usize,
    ) -> Result<Arc<Vec<Scalar>>> {
        let key = CacheKey {
            reader: reader.id().to_string(),
            row_group,
            kind: FetchKind::Page,
            path: path.clone(),
            page: Some(page),
        };
        self.events.read(&key);
        let fetch = {
            let mut pages = self.pages.lock().unwrap();
            if let Some(fetch) = pages.get(&key) {
                fetch.clone()
            } else {
                self.events.miss(&key);
                let reader = reader.clone();
                let path = path.clone();
                let fut: BoxFuture<'static, Result<Arc<Vec<Scalar>>>> = async move {
                    let values = reader.read_page(row_group, &path, page).await?;
                    Ok(Arc::new(values))
                }
                .boxed();
                let shared = fut.shared();
                pages.insert(key.clone(), shared.clone());
                shared
            }
        };
        let out = fetch.await;
        // page futures are short-lived: first resolved consumer evicts
        self.pages.lock().unwrap().remove(&key);
        self.events.complete(&key);
        out
    }

    fn index_fetch(
        &self,
        key: &CacheKey,
        fetch: BoxFuture<'static, Result<CachedIndex>>,
    ) -> SharedFetch<CachedIndex> {
        self.events.read(key);
        let mut indexes = self.indexes.lock().unwrap();
        if let Some(found) = indexes.get(key) {
            found.clone()
        } else {
            self.events.miss(key);
            let shared = fetch.shared();
            indexes.put(key.clone(), shared.clone());
            shared
        }
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}
