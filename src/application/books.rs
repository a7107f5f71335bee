use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::pagination::PageRequest;
use crate::application::repos::{CreateBookParams, RepoError, UpdateBookParams};
use crate::cache::{AccessError, CacheAccessor};
use crate::domain::books::BookDraft;
use crate::domain::entities::BookRecord;
use crate::domain::error::DomainError;
use crate::events::{BookEvent, EventPublisher, emit_detached};

const SOURCE: &str = "application::books";

#[derive(Debug, Error)]
pub enum BookServiceError {
    #[error("book not found")]
    NotFound,
    #[error("{0}")]
    InvalidInput(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RepoError> for BookServiceError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::NotFound,
            RepoError::Persistence(message) => Self::Internal(message),
        }
    }
}

impl From<AccessError> for BookServiceError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::NotFound => Self::NotFound,
            AccessError::Internal => Self::Internal(err.to_string()),
        }
    }
}

impl From<DomainError> for BookServiceError {
    fn from(err: DomainError) -> Self {
        Self::InvalidInput(err.public_message())
    }
}

/// Unvalidated fields of a create or update request.
#[derive(Debug, Clone)]
pub struct BookCommand {
    pub title: String,
    pub author: String,
    pub year: i32,
}

/// Book reads and writes.
///
/// Reads go through the cache accessor. Writes hit the record store first;
/// only a successful write invalidates cache keys and emits an event.
#[derive(Clone)]
pub struct BookService {
    cache: CacheAccessor,
    publisher: Arc<dyn EventPublisher>,
    topic: String,
}

impl BookService {
    pub fn new(
        cache: CacheAccessor,
        publisher: Arc<dyn EventPublisher>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            publisher,
            topic: topic.into(),
        }
    }

    pub async fn list(&self, page: PageRequest) -> Result<Vec<BookRecord>, BookServiceError> {
        Ok(self.cache.get_page(page).await?)
    }

    pub async fn get(&self, id: i64) -> Result<BookRecord, BookServiceError> {
        Ok(self.cache.get_single(id).await?)
    }

    pub async fn create(&self, command: BookCommand) -> Result<BookRecord, BookServiceError> {
        let draft = BookDraft::parse(&command.title, &command.author, command.year)?;

        let record = self
            .cache
            .books()
            .create_book(CreateBookParams {
                title: draft.title,
                author: draft.author,
                year: draft.year,
            })
            .await?;

        self.cache.invalidate_all_listings().await;
        emit_detached(
            self.publisher.clone(),
            BookEvent::created(&self.topic, &record),
        );

        info!(target = SOURCE, book_id = record.id, "Book created");
        Ok(record)
    }

    pub async fn update(
        &self,
        id: i64,
        command: BookCommand,
    ) -> Result<BookRecord, BookServiceError> {
        let draft = BookDraft::parse(&command.title, &command.author, command.year)?;

        let record = self
            .cache
            .books()
            .update_book(UpdateBookParams {
                id,
                title: draft.title,
                author: draft.author,
                year: draft.year,
            })
            .await?;

        self.cache.invalidate(id).await;
        self.cache.invalidate_all_listings().await;
        emit_detached(
            self.publisher.clone(),
            BookEvent::updated(&self.topic, &record),
        );

        info!(target = SOURCE, book_id = id, "Book updated");
        Ok(record)
    }

    pub async fn delete(&self, id: i64) -> Result<(), BookServiceError> {
        self.cache.books().delete_book(id).await?;

        self.cache.invalidate(id).await;
        self.cache.invalidate_all_listings().await;
        emit_detached(self.publisher.clone(), BookEvent::deleted(&self.topic, id));

        info!(target = SOURCE, book_id = id, "Book deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::broadcast;

    use super::*;
    use crate::application::repos::BooksRepo;
    use crate::cache::{KvStore, MemoryStore, StoreError};
    use crate::events::{ChannelPublisher, DEFAULT_TOPIC, EventKind, PublishError};

    #[derive(Default)]
    struct InMemoryBooks {
        rows: Mutex<BTreeMap<i64, BookRecord>>,
    }

    #[async_trait]
    impl BooksRepo for InMemoryBooks {
        async fn list_books(&self, page: PageRequest) -> Result<Vec<BookRecord>, RepoError> {
            let rows = self.rows.lock().expect("rows");
            Ok(rows
                .values()
                .skip(page.offset() as usize)
                .take(page.limit() as usize)
                .cloned()
                .collect())
        }

        async fn find_by_id(&self, id: i64) -> Result<Option<BookRecord>, RepoError> {
            Ok(self.rows.lock().expect("rows").get(&id).cloned())
        }

        async fn create_book(&self, params: CreateBookParams) -> Result<BookRecord, RepoError> {
            let mut rows = self.rows.lock().expect("rows");
            let id = rows.keys().next_back().copied().unwrap_or(0) + 1;
            let record = BookRecord {
                id,
                title: params.title,
                author: params.author,
                year: params.year,
            };
            rows.insert(id, record.clone());
            Ok(record)
        }

        async fn update_book(&self, params: UpdateBookParams) -> Result<BookRecord, RepoError> {
            let mut rows = self.rows.lock().expect("rows");
            let row = rows.get_mut(&params.id).ok_or(RepoError::NotFound)?;
            row.title = params.title;
            row.author = params.author;
            row.year = params.year;
            Ok(row.clone())
        }

        async fn delete_book(&self, id: i64) -> Result<(), RepoError> {
            self.rows
                .lock()
                .expect("rows")
                .remove(&id)
                .map(|_| ())
                .ok_or(RepoError::NotFound)
        }
    }

    /// Every command fails, as if the cache backend were unreachable.
    struct UnreachableStore;

    #[async_trait]
    impl KvStore for UnreachableStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn set(&self, _key: &str, _value: String) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn delete(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::command("DEL", "connection refused"))
        }

        async fn delete_many(&self, _keys: &[String]) -> Result<(), StoreError> {
            Err(StoreError::command("DEL", "connection refused"))
        }

        async fn keys(&self, _pattern: &str) -> Result<Vec<String>, StoreError> {
            Err(StoreError::command("KEYS", "connection refused"))
        }

        fn backend_name(&self) -> &'static str {
            "unreachable"
        }
    }

    struct RejectingPublisher;

    #[async_trait]
    impl EventPublisher for RejectingPublisher {
        async fn publish(&self, _event: &BookEvent) -> Result<(), PublishError> {
            Err(PublishError::Rejected { status: 503 })
        }

        fn sink_name(&self) -> &'static str {
            "rejecting"
        }
    }

    struct Harness {
        service: BookService,
        store: Arc<MemoryStore>,
        events: broadcast::Receiver<BookEvent>,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let publisher = ChannelPublisher::new(16);
        let events = publisher.subscribe();
        let accessor = CacheAccessor::new(store.clone(), Arc::new(InMemoryBooks::default()));
        Harness {
            service: BookService::new(accessor, Arc::new(publisher), DEFAULT_TOPIC),
            store,
            events,
        }
    }

    fn dune(year: i32) -> BookCommand {
        BookCommand {
            title: "Dune".to_string(),
            author: "Herbert".to_string(),
            year,
        }
    }

    async fn wait_for_key(store: &MemoryStore, key: &str) {
        for _ in 0..100 {
            if store.get(key).await.expect("get").is_some() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("cache key {key} never populated");
    }

    async fn next_kind(events: &mut broadcast::Receiver<BookEvent>) -> EventKind {
        tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("event in time")
            .expect("channel open")
            .kind
    }

    #[tokio::test]
    async fn dune_lifecycle() {
        let Harness {
            service,
            store,
            mut events,
        } = harness();

        let created = service.create(dune(1965)).await.expect("create");
        assert_eq!(created.id, 1);
        assert_eq!(next_kind(&mut events).await, EventKind::BookCreated);

        let fetched = service.get(1).await.expect("get");
        assert_eq!(fetched, created);
        wait_for_key(&store, "book:1").await;

        let updated = service.update(1, dune(1966)).await.expect("update");
        assert_eq!(updated.year, 1966);
        assert_eq!(next_kind(&mut events).await, EventKind::BookUpdated);
        assert_eq!(service.get(1).await.expect("get").year, 1966);
        wait_for_key(&store, "book:1").await;

        service.delete(1).await.expect("delete");
        assert_eq!(next_kind(&mut events).await, EventKind::BookDeleted);
        assert!(matches!(
            service.get(1).await,
            Err(BookServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_the_store() {
        let Harness { service, .. } = harness();

        let err = service.create(dune(400)).await.expect_err("old book");
        assert!(matches!(err, BookServiceError::InvalidInput(ref msg) if msg.contains("500")));

        let blank = BookCommand {
            title: " ".to_string(),
            ..dune(1965)
        };
        assert!(matches!(
            service.create(blank).await,
            Err(BookServiceError::InvalidInput(_))
        ));
        assert!(service.list(PageRequest::default()).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn writes_drop_cached_listings() {
        let Harness { service, store, .. } = harness();
        service.create(dune(1965)).await.expect("create");

        assert_eq!(service.list(PageRequest::default()).await.expect("list").len(), 1);
        wait_for_key(&store, "books:page_1_limit_10").await;

        service.create(dune(1970)).await.expect("create");
        assert!(store.get("books:page_1_limit_10").await.expect("get").is_none());
        assert_eq!(service.list(PageRequest::default()).await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn missing_book_writes_report_not_found() {
        let Harness { service, mut events, .. } = harness();

        assert!(matches!(
            service.update(42, dune(1965)).await,
            Err(BookServiceError::NotFound)
        ));
        assert!(matches!(
            service.delete(42).await,
            Err(BookServiceError::NotFound)
        ));
        assert!(matches!(
            events.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn writes_succeed_when_cache_and_events_fail() {
        let accessor =
            CacheAccessor::new(Arc::new(UnreachableStore), Arc::new(InMemoryBooks::default()));
        let service = BookService::new(accessor, Arc::new(RejectingPublisher), DEFAULT_TOPIC);

        let created = service.create(dune(1965)).await.expect("create");
        let updated = service
            .update(created.id, dune(1966))
            .await
            .expect("update");
        assert_eq!(updated.year, 1966);
        assert_eq!(service.get(created.id).await.expect("get").year, 1966);
        service.delete(created.id).await.expect("delete");
        assert!(matches!(
            service.get(created.id).await,
            Err(BookServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn failed_writes_leave_cache_untouched() {
        let Harness { service, store, .. } = harness();
        store
            .set("book:42", r#"{"id":42,"title":"Dune","author":"Herbert","year":1965}"#.to_string())
            .await
            .expect("seed book");
        store
            .set("books:page_1_limit_10", "[]".to_string())
            .await
            .expect("seed listing");

        assert!(matches!(
            service.update(42, dune(1966)).await,
            Err(BookServiceError::NotFound)
        ));
        assert!(matches!(
            service.delete(42).await,
            Err(BookServiceError::NotFound)
        ));
        assert!(store.get("book:42").await.expect("get").is_some());
        assert!(store.get("books:page_1_limit_10").await.expect("get").is_some());
    }

    #[tokio::test]
    async fn delete_twice_reports_not_found_second_time() {
        let Harness { service, .. } = harness();
        let created = service.create(dune(1965)).await.expect("create");

        service.delete(created.id).await.expect("first delete");
        assert!(matches!(
            service.delete(created.id).await,
            Err(BookServiceError::NotFound)
        ));
    }
}
