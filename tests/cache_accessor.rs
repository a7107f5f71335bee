use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bookshelf::application::pagination::PageRequest;
use bookshelf::application::repos::{BooksRepo, CreateBookParams, RepoError, UpdateBookParams};
use bookshelf::cache::{AccessError, CacheAccessor, KvStore, MemoryStore, StoreError};
use bookshelf::domain::entities::BookRecord;
use futures::future::join_all;

#[derive(Default)]
struct CountingRepo {
    rows: Mutex<BTreeMap<i64, BookRecord>>,
    finds: AtomicUsize,
    lists: AtomicUsize,
    broken: bool,
}

impl CountingRepo {
    fn with_books(count: i64) -> Self {
        let repo = Self::default();
        {
            let mut rows = repo.rows.lock().expect("rows");
            for id in 1..=count {
                rows.insert(id, book(id));
            }
        }
        repo
    }

    fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), RepoError> {
        if self.broken {
            return Err(RepoError::from_persistence("database is locked"));
        }
        Ok(())
    }
}

#[async_trait]
impl BooksRepo for CountingRepo {
    async fn list_books(&self, page: PageRequest) -> Result<Vec<BookRecord>, RepoError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let rows = self.rows.lock().expect("rows");
        Ok(rows
            .values()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<BookRecord>, RepoError> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.rows.lock().expect("rows").get(&id).cloned())
    }

    async fn create_book(&self, _params: CreateBookParams) -> Result<BookRecord, RepoError> {
        unreachable!("accessor never writes")
    }

    async fn update_book(&self, _params: UpdateBookParams) -> Result<BookRecord, RepoError> {
        unreachable!("accessor never writes")
    }

    async fn delete_book(&self, _id: i64) -> Result<(), RepoError> {
        unreachable!("accessor never writes")
    }
}

/// Store whose every command fails, like an unreachable Redis.
struct DownStore;

#[async_trait]
impl KvStore for DownStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn set(&self, _key: &str, _value: String) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn delete_many(&self, _keys: &[String]) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn keys(&self, _pattern: &str) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    fn backend_name(&self) -> &'static str {
        "down"
    }
}

fn book(id: i64) -> BookRecord {
    BookRecord {
        id,
        title: format!("Book {id}"),
        author: "Anon".to_string(),
        year: 1900 + id as i32,
    }
}

fn page(page: u32, limit: u32) -> PageRequest {
    PageRequest::new(page, limit).expect("positive page")
}

async fn wait_for_key(store: &MemoryStore, key: &str) {
    for _ in 0..200 {
        if store.get(key).await.expect("memory get").is_some() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("cache key {key} was never populated");
}

#[tokio::test]
async fn clean_hit_skips_the_record_store() {
    let store = Arc::new(MemoryStore::new());
    let repo = Arc::new(CountingRepo::with_books(3));
    let accessor = CacheAccessor::new(store.clone(), repo.clone());

    assert_eq!(accessor.get_single(2).await.expect("miss path"), book(2));
    assert_eq!(repo.finds(), 1);
    wait_for_key(&store, "book:2").await;

    assert_eq!(accessor.get_single(2).await.expect("hit path"), book(2));
    assert_eq!(repo.finds(), 1);
}

#[tokio::test]
async fn population_stores_json_copy_under_exact_key() {
    let store = Arc::new(MemoryStore::new());
    let accessor = CacheAccessor::new(store.clone(), Arc::new(CountingRepo::with_books(1)));

    accessor.get_single(1).await.expect("get");
    wait_for_key(&store, "book:1").await;

    let raw = store.get("book:1").await.expect("get").expect("present");
    let cached: BookRecord = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(cached, book(1));
}

#[tokio::test]
async fn invalidate_forces_the_next_read_to_the_store() {
    let store = Arc::new(MemoryStore::new());
    let repo = Arc::new(CountingRepo::with_books(1));
    let accessor = CacheAccessor::new(store.clone(), repo.clone());

    accessor.get_single(1).await.expect("get");
    wait_for_key(&store, "book:1").await;

    accessor.invalidate(1).await;
    assert!(store.get("book:1").await.expect("get").is_none());

    accessor.get_single(1).await.expect("get");
    assert_eq!(repo.finds(), 2);
}

#[tokio::test]
async fn invalidate_all_listings_leaves_single_keys() {
    let store = Arc::new(MemoryStore::new());
    let accessor = CacheAccessor::new(store.clone(), Arc::new(CountingRepo::with_books(30)));

    accessor.get_single(1).await.expect("get");
    for request in [page(1, 10), page(2, 10), page(1, 5)] {
        accessor.get_page(request).await.expect("page");
    }
    wait_for_key(&store, "book:1").await;
    for key in [
        "books:page_1_limit_10",
        "books:page_2_limit_10",
        "books:page_1_limit_5",
    ] {
        wait_for_key(&store, key).await;
    }

    accessor.invalidate_all_listings().await;

    assert!(
        store
            .keys("books:page_*")
            .await
            .expect("keys")
            .is_empty()
    );
    assert!(store.get("book:1").await.expect("get").is_some());
}

#[tokio::test]
async fn invalidating_with_nothing_cached_is_a_no_op() {
    let store = Arc::new(MemoryStore::new());
    let accessor = CacheAccessor::new(store.clone(), Arc::new(CountingRepo::default()));

    accessor.invalidate(99).await;
    accessor.invalidate_all_listings().await;
    assert!(store.is_empty());
}

#[tokio::test]
async fn pages_hold_at_most_limit_records() {
    let accessor = CacheAccessor::new(
        Arc::new(MemoryStore::new()),
        Arc::new(CountingRepo::with_books(7)),
    );

    for (request, expected) in [
        (page(1, 3), 3),
        (page(3, 3), 1),
        (page(4, 3), 0),
        (page(1, 100), 7),
    ] {
        let books = accessor.get_page(request).await.expect("page");
        assert!(books.len() <= request.limit() as usize);
        assert_eq!(books.len(), expected);
    }
}

#[tokio::test]
async fn empty_page_is_cached_like_any_other() {
    let store = Arc::new(MemoryStore::new());
    let repo = Arc::new(CountingRepo::default());
    let accessor = CacheAccessor::new(store.clone(), repo.clone());

    assert!(accessor.get_page(page(1, 10)).await.expect("page").is_empty());
    wait_for_key(&store, "books:page_1_limit_10").await;
    assert!(accessor.get_page(page(1, 10)).await.expect("page").is_empty());
    assert_eq!(repo.lists(), 1);
}

#[tokio::test]
async fn unreachable_store_degrades_to_record_store_reads() {
    let repo = Arc::new(CountingRepo::with_books(2));
    let accessor = CacheAccessor::new(Arc::new(DownStore), repo.clone());

    assert_eq!(accessor.get_single(1).await.expect("fallback"), book(1));
    assert_eq!(accessor.get_page(page(1, 10)).await.expect("fallback").len(), 2);
    assert!(matches!(
        accessor.get_single(9).await,
        Err(AccessError::NotFound)
    ));

    accessor.invalidate(1).await;
    accessor.invalidate_all_listings().await;
    assert_eq!(repo.finds(), 2);
}

#[tokio::test]
async fn undecodable_entry_is_treated_as_a_miss() {
    let store = Arc::new(MemoryStore::new());
    store
        .set("book:1", "{not json".to_string())
        .await
        .expect("seed");
    let repo = Arc::new(CountingRepo::with_books(1));
    let accessor = CacheAccessor::new(store.clone(), repo.clone());

    assert_eq!(accessor.get_single(1).await.expect("fallback"), book(1));
    assert_eq!(repo.finds(), 1);

    for _ in 0..200 {
        let raw = store.get("book:1").await.expect("get").expect("present");
        if serde_json::from_str::<BookRecord>(&raw).is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("corrupt entry was never replaced");
}

#[tokio::test]
async fn missing_book_is_not_cached() {
    let store = Arc::new(MemoryStore::new());
    let accessor = CacheAccessor::new(store.clone(), Arc::new(CountingRepo::default()));

    assert!(matches!(
        accessor.get_single(5).await,
        Err(AccessError::NotFound)
    ));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(store.is_empty());
}

#[tokio::test]
async fn record_store_failures_surface_without_detail() {
    let accessor = CacheAccessor::new(
        Arc::new(MemoryStore::new()),
        Arc::new(CountingRepo::broken()),
    );

    assert!(matches!(
        accessor.get_single(1).await,
        Err(AccessError::Internal)
    ));
    let err = accessor.get_page(page(1, 10)).await.expect_err("broken repo");
    assert!(matches!(err, AccessError::Internal));
    assert!(!err.to_string().contains("database is locked"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cold_reads_agree_with_a_sequential_read() {
    let store = Arc::new(MemoryStore::new());
    let repo = Arc::new(CountingRepo::with_books(25));
    let accessor = CacheAccessor::new(store.clone(), repo.clone());

    let reads = (0..8).map(|_| {
        let accessor = accessor.clone();
        async move { accessor.get_page(page(1, 10)).await }
    });
    let results = join_all(reads).await;

    let sequential = CacheAccessor::disabled(repo.clone())
        .get_page(page(1, 10))
        .await
        .expect("sequential read");

    for result in results {
        assert_eq!(result.expect("concurrent read"), sequential);
    }
}

#[tokio::test]
async fn disabled_accessor_always_reads_the_record_store() {
    let repo = Arc::new(CountingRepo::with_books(1));
    let accessor = CacheAccessor::disabled(repo.clone());
    assert!(!accessor.is_enabled());

    accessor.get_single(1).await.expect("get");
    accessor.get_single(1).await.expect("get");
    accessor.invalidate(1).await;
    accessor.invalidate_all_listings().await;
    assert_eq!(repo.finds(), 2);
}
