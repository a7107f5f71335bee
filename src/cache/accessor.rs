//! Read-through accessor over the key-value store and the books repository.

use std::{future::Future, sync::Arc};

use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    application::{
        pagination::PageRequest,
        repos::{BooksRepo, RepoError},
    },
    domain::entities::BookRecord,
};

use super::{
    keys::{BOOKS_PAGE_PATTERN, CacheKey},
    store::KvStore,
};

pub const METRIC_CACHE_HIT: &str = "bookshelf_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "bookshelf_cache_miss_total";
pub const METRIC_CACHE_ERROR: &str = "bookshelf_cache_error_total";
pub const METRIC_CACHE_POPULATE_FAILED: &str = "bookshelf_cache_populate_failed_total";
pub const METRIC_CACHE_INVALIDATED_KEYS: &str = "bookshelf_cache_invalidated_keys_total";

const SOURCE: &str = "cache::accessor";

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("book not found")]
    NotFound,
    /// The record store failed; the underlying detail is logged here and
    /// never carried further.
    #[error("record store read failed")]
    Internal,
}

fn classify_repo_error(key: CacheKey, err: RepoError) -> AccessError {
    match err {
        RepoError::NotFound => AccessError::NotFound,
        RepoError::Persistence(message) => {
            warn!(
                target = SOURCE,
                cache_key = %key,
                error = %message,
                "Record store read failed"
            );
            AccessError::Internal
        }
    }
}

/// Cache-aside access to books.
///
/// Reads consult the store first and fall back to the repository. A
/// successful fallback schedules a detached task that writes the JSON copy
/// back; the caller never waits on it. Store failures are logged and treated
/// as misses. When built with [`CacheAccessor::disabled`], every read goes
/// straight to the repository.
#[derive(Clone)]
pub struct CacheAccessor {
    store: Option<Arc<dyn KvStore>>,
    books: Arc<dyn BooksRepo>,
}

impl CacheAccessor {
    pub fn new(store: Arc<dyn KvStore>, books: Arc<dyn BooksRepo>) -> Self {
        Self {
            store: Some(store),
            books,
        }
    }

    pub fn disabled(books: Arc<dyn BooksRepo>) -> Self {
        Self { store: None, books }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn books(&self) -> &Arc<dyn BooksRepo> {
        &self.books
    }

    pub async fn get_single(&self, id: i64) -> Result<BookRecord, AccessError> {
        let books = self.books.clone();
        let key = CacheKey::book(id);
        self.read_through(key, || async move {
            match books.find_by_id(id).await {
                Ok(Some(record)) => Ok(record),
                Ok(None) => Err(AccessError::NotFound),
                Err(err) => Err(classify_repo_error(key, err)),
            }
        })
        .await
    }

    /// Caller guarantees `page` and `limit` are positive through [`PageRequest`].
    pub async fn get_page(&self, request: PageRequest) -> Result<Vec<BookRecord>, AccessError> {
        let books = self.books.clone();
        let key = CacheKey::books_page(request);
        self.read_through(key, || async move {
            books
                .list_books(request)
                .await
                .map_err(|err| classify_repo_error(key, err))
        })
        .await
    }

    /// Remove the cached copy of one book. Failures are logged only.
    pub async fn invalidate(&self, id: i64) {
        let Some(store) = &self.store else {
            return;
        };

        let key = CacheKey::book(id);
        match store.delete(&key.to_string()).await {
            Ok(()) => {
                counter!(METRIC_CACHE_INVALIDATED_KEYS, "scope" => key.scope()).increment(1);
                debug!(target = SOURCE, cache_key = %key, "Invalidated cache entry");
            }
            Err(err) => {
                counter!(METRIC_CACHE_ERROR, "scope" => key.scope(), "op" => "delete")
                    .increment(1);
                warn!(
                    target = SOURCE,
                    cache_key = %key,
                    error = %err,
                    "Failed to invalidate cache entry"
                );
            }
        }
    }

    /// Remove every cached listing page in one batch. Failures are logged only.
    pub async fn invalidate_all_listings(&self) {
        let Some(store) = &self.store else {
            return;
        };

        let keys = match store.keys(BOOKS_PAGE_PATTERN).await {
            Ok(keys) => keys,
            Err(err) => {
                counter!(METRIC_CACHE_ERROR, "scope" => "page", "op" => "keys").increment(1);
                warn!(
                    target = SOURCE,
                    pattern = BOOKS_PAGE_PATTERN,
                    error = %err,
                    "Failed to list cached listing pages"
                );
                return;
            }
        };

        if keys.is_empty() {
            return;
        }

        match store.delete_many(&keys).await {
            Ok(()) => {
                counter!(METRIC_CACHE_INVALIDATED_KEYS, "scope" => "page")
                    .increment(keys.len() as u64);
                debug!(
                    target = SOURCE,
                    count = keys.len(),
                    "Invalidated cached listing pages"
                );
            }
            Err(err) => {
                counter!(METRIC_CACHE_ERROR, "scope" => "page", "op" => "delete").increment(1);
                warn!(
                    target = SOURCE,
                    count = keys.len(),
                    error = %err,
                    "Failed to invalidate cached listing pages"
                );
            }
        }
    }

    async fn read_through<T, F, Fut>(&self, key: CacheKey, fetch: F) -> Result<T, AccessError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AccessError>>,
    {
        let Some(store) = &self.store else {
            return fetch().await;
        };

        let rendered = key.to_string();
        if let Some(value) = self.lookup::<T>(store.as_ref(), key, &rendered).await {
            return Ok(value);
        }

        let value = fetch().await?;
        self.populate_detached(store.clone(), key, rendered, &value);
        Ok(value)
    }

    async fn lookup<T: DeserializeOwned>(
        &self,
        store: &dyn KvStore,
        key: CacheKey,
        rendered: &str,
    ) -> Option<T> {
        let scope = key.scope();
        match store.get(rendered).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    counter!(METRIC_CACHE_HIT, "scope" => scope).increment(1);
                    debug!(target = SOURCE, cache_key = rendered, "Cache hit");
                    Some(value)
                }
                Err(err) => {
                    counter!(METRIC_CACHE_ERROR, "scope" => scope, "op" => "decode").increment(1);
                    counter!(METRIC_CACHE_MISS, "scope" => scope).increment(1);
                    warn!(
                        target = SOURCE,
                        cache_key = rendered,
                        error = %err,
                        "Discarding undecodable cache entry"
                    );
                    None
                }
            },
            Ok(None) => {
                counter!(METRIC_CACHE_MISS, "scope" => scope).increment(1);
                debug!(target = SOURCE, cache_key = rendered, "Cache miss");
                None
            }
            Err(err) => {
                counter!(METRIC_CACHE_ERROR, "scope" => scope, "op" => "get").increment(1);
                counter!(METRIC_CACHE_MISS, "scope" => scope).increment(1);
                warn!(
                    target = SOURCE,
                    cache_key = rendered,
                    backend = store.backend_name(),
                    error = %err,
                    "Cache read failed; falling back to record store"
                );
                None
            }
        }
    }

    fn populate_detached<T: Serialize>(
        &self,
        store: Arc<dyn KvStore>,
        key: CacheKey,
        rendered: String,
        value: &T,
    ) {
        let scope = key.scope();
        // Serialize on the request task so the spawned job owns only a string.
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(err) => {
                counter!(METRIC_CACHE_POPULATE_FAILED, "scope" => scope).increment(1);
                warn!(
                    target = SOURCE,
                    cache_key = %rendered,
                    error = %err,
                    "Failed to encode cache entry"
                );
                return;
            }
        };

        tokio::spawn(async move {
            if let Err(err) = store.set(&rendered, payload).await {
                counter!(METRIC_CACHE_POPULATE_FAILED, "scope" => scope).increment(1);
                warn!(
                    target = SOURCE,
                    cache_key = %rendered,
                    error = %err,
                    "Failed to populate cache entry"
                );
            }
        });
    }
}

impl std::fmt::Debug for CacheAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheAccessor")
            .field(
                "backend",
                &self.store.as_ref().map(|store| store.backend_name()),
            )
            .finish_non_exhaustive()
    }
}
