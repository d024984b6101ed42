//! In-memory URL repository with optional write-through backup log.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, warn};
use url::Url;

use super::backup_log::{BackupLog, BackupRecord};
use crate::domain::context::CallContext;
use crate::domain::entities::{BatchInsertion, Insertion};
use crate::domain::hasher;
use crate::domain::repositories::{RepositoryError, RepositoryResult, UrlRepository};

/// URL store backed by a sharded concurrent map.
///
/// Inserts use the map's atomic entry API, so two concurrent creates of the
/// same URL produce exactly one `Inserted` and one `Duplicate`. When a backup
/// log is attached, each new record is appended before `create` returns.
///
/// Soft-delete is not available on this backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryUrlRepository {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    urls: DashMap<String, Url>,
    backup: Option<BackupLog>,
}

impl MemoryUrlRepository {
    /// Creates an empty repository without a backup log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository seeded from `records` that appends new records to
    /// `backup`.
    pub fn with_backup(backup: BackupLog, records: Vec<BackupRecord>) -> Self {
        let repository = Self {
            inner: Arc::new(Inner {
                urls: DashMap::with_capacity(records.len()),
                backup: Some(backup),
            }),
        };
        repository.replay(records);
        repository
    }

    /// Loads records in order; a repeated key keeps the last value.
    fn replay(&self, records: Vec<BackupRecord>) {
        let count = records.len();
        for record in records {
            self.inner.urls.insert(record.key, record.value);
        }
        debug!(count, "Replayed backup records");
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.inner.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.urls.is_empty()
    }
}

impl Inner {
    async fn insert(&self, url: Url) -> RepositoryResult<Insertion> {
        let id = hasher::hash(&url);

        match self.urls.entry(id.as_str().to_owned()) {
            Entry::Occupied(existing) => {
                if existing.get() != &url {
                    warn!(
                        id = %id,
                        stored = %existing.get(),
                        submitted = %url,
                        "Short id collision, keeping the stored URL"
                    );
                }
                return Ok(Insertion::Duplicate(id));
            }
            Entry::Vacant(slot) => {
                slot.insert(url.clone());
            }
        }

        if let Some(backup) = &self.backup {
            let record = BackupRecord::new(id.as_str(), url);
            if let Err(e) = backup.append(&record).await {
                warn!(id = %id, error = %e, "Stored URL but failed to append backup record");
                return Err(RepositoryError::Io(e));
            }
        }

        Ok(Insertion::Inserted(id))
    }

    async fn insert_all(&self, urls: Vec<Url>) -> RepositoryResult<BatchInsertion> {
        let mut insertions = Vec::with_capacity(urls.len());
        for url in urls {
            insertions.push(self.insert(url).await?);
        }
        Ok(BatchInsertion::from_insertions(insertions))
    }

    fn get(&self, id: String) -> RepositoryResult<Url> {
        match self.urls.get(&id) {
            Some(url) => Ok(url.clone()),
            None => Err(RepositoryError::NotFound(id)),
        }
    }
}

#[async_trait]
impl UrlRepository for MemoryUrlRepository {
    async fn create(&self, ctx: &CallContext, url: &Url) -> RepositoryResult<Insertion> {
        let inner = self.inner.clone();
        let url = url.clone();
        ctx.run(async move { inner.insert(url).await }).await
    }

    async fn create_many(
        &self,
        ctx: &CallContext,
        urls: &[Url],
    ) -> RepositoryResult<BatchInsertion> {
        let inner = self.inner.clone();
        let urls = urls.to_vec();
        ctx.run(async move { inner.insert_all(urls).await }).await
    }

    async fn read(&self, ctx: &CallContext, id: &str) -> RepositoryResult<Url> {
        let inner = self.inner.clone();
        let id = id.to_owned();
        ctx.run(async move { inner.get(id) }).await
    }

    async fn update(&self, ctx: &CallContext, id: &str, url: &Url) -> RepositoryResult<()> {
        let inner = self.inner.clone();
        let id = id.to_owned();
        let url = url.clone();
        ctx.run(async move {
            inner.urls.insert(id, url);
            Ok(())
        })
        .await
    }

    async fn delete(&self, _ctx: &CallContext, _ids: &[String]) -> RepositoryResult<()> {
        Err(RepositoryError::Unsupported("delete"))
    }

    async fn ping(&self, _ctx: &CallContext) -> RepositoryResult<()> {
        Err(RepositoryError::Unsupported("ping"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_duplicate() {
        let repo = MemoryUrlRepository::new();
        let ctx = CallContext::background();
        let target = url("https://example.com/a");

        let first = repo.create(&ctx, &target).await.unwrap();
        let second = repo.create(&ctx, &target).await.unwrap();

        assert_eq!(first, Insertion::Inserted(hasher::hash(&target)));
        assert_eq!(first.id().as_str(), "c4ed1");
        assert_eq!(second, Insertion::Duplicate(hasher::hash(&target)));
    }

    #[tokio::test]
    async fn test_read_created_url() {
        let repo = MemoryUrlRepository::new();
        let ctx = CallContext::background();
        let target = url("https://example.com/a");

        let id = repo.create(&ctx, &target).await.unwrap().into_id();
        let stored = repo.read(&ctx, id.as_str()).await.unwrap();

        assert_eq!(stored.as_str(), "https://example.com/a");
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let repo = MemoryUrlRepository::new();

        let err = repo
            .read(&CallContext::background(), "zzzzz")
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::NotFound(id) if id == "zzzzz"));
    }

    #[tokio::test]
    async fn test_collision_keeps_first_value() {
        let repo = MemoryUrlRepository::new();
        let ctx = CallContext::background();
        let first = url("https://example.com/a");
        let second = url("https://example.com/b");
        let id = hasher::hash(&second);

        // Another URL already occupies the id `second` hashes to.
        repo.inner.urls.insert(id.to_string(), first.clone());

        let outcome = repo.create(&ctx, &second).await.unwrap();

        assert_eq!(outcome, Insertion::Duplicate(id.clone()));
        assert_eq!(repo.read(&ctx, id.as_str()).await.unwrap(), first);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_create_many_preserves_order_and_flags_duplicates() {
        let repo = MemoryUrlRepository::new();
        let ctx = CallContext::background();
        let a = url("https://example.com/a");
        let b = url("https://example.com/b");

        repo.create(&ctx, &a).await.unwrap();
        let batch = repo.create_many(&ctx, &[b.clone(), a.clone()]).await.unwrap();

        assert!(batch.duplicate);
        assert_eq!(batch.ids, vec![hasher::hash(&b), hasher::hash(&a)]);
    }

    #[tokio::test]
    async fn test_update_overwrites() {
        let repo = MemoryUrlRepository::new();
        let ctx = CallContext::background();
        let a = url("https://example.com/a");
        let replacement = url("https://example.com/replacement");

        let id = repo.create(&ctx, &a).await.unwrap().into_id();
        repo.update(&ctx, id.as_str(), &replacement).await.unwrap();

        assert_eq!(repo.read(&ctx, id.as_str()).await.unwrap(), replacement);
    }

    #[tokio::test]
    async fn test_delete_is_unsupported() {
        let repo = MemoryUrlRepository::new();

        let err = repo
            .delete(&CallContext::background(), &["aaaaa".to_string()])
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::Unsupported("delete")));
    }

    #[tokio::test]
    async fn test_canceled_context_returns_promptly() {
        let repo = MemoryUrlRepository::new();
        let ctx = CallContext::background();
        ctx.cancel();

        let started = std::time::Instant::now();
        let err = repo
            .create(&ctx, &url("https://example.com/a"))
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::Canceled));
        assert!(started.elapsed() < Duration::from_millis(10));
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_expired_deadline_is_reported() {
        let repo = MemoryUrlRepository::new();
        let ctx = CallContext::background().with_timeout(Duration::ZERO);

        let err = repo.read(&ctx, "aaaaa").await.unwrap_err();

        assert!(matches!(err, RepositoryError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_concurrent_creates_yield_single_insert() {
        let repo = MemoryUrlRepository::new();
        let target = url("https://example.com/race");
        let mut handles = Vec::new();

        for _ in 0..16 {
            let repo = repo.clone();
            let target = target.clone();
            handles.push(tokio::spawn(async move {
                repo.create(&CallContext::background(), &target)
                    .await
                    .unwrap()
            }));
        }

        let mut inserted = 0;
        for handle in handles {
            if !handle.await.unwrap().is_duplicate() {
                inserted += 1;
            }
        }

        assert_eq!(inserted, 1);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_backup_written_once_per_new_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");
        let ctx = CallContext::background();

        {
            let (log, records) = BackupLog::open(&path).await.unwrap();
            let repo = MemoryUrlRepository::with_backup(log, records);
            repo.create(&ctx, &url("https://example.com/a"))
                .await
                .unwrap();
            repo.create(&ctx, &url("https://example.com/a"))
                .await
                .unwrap();
            repo.create(&ctx, &url("https://example.com/b"))
                .await
                .unwrap();
        }

        let (_log, records) = BackupLog::open(&path).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key, "c4ed1");
        assert_eq!(records[1].key, "69a42");
    }

    #[tokio::test]
    async fn test_replay_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");
        let ctx = CallContext::background();
        let urls: Vec<Url> = (0..10)
            .map(|i| url(&format!("https://example.com/page/{i}")))
            .collect();

        let mut ids = Vec::new();
        {
            let (log, records) = BackupLog::open(&path).await.unwrap();
            let repo = MemoryUrlRepository::with_backup(log, records);
            for u in &urls {
                ids.push(repo.create(&ctx, u).await.unwrap().into_id());
            }
        }

        let (log, records) = BackupLog::open(&path).await.unwrap();
        let restored = MemoryUrlRepository::with_backup(log, records);

        assert_eq!(restored.len(), urls.len());
        for (id, expected) in ids.iter().zip(&urls) {
            assert_eq!(&restored.read(&ctx, id.as_str()).await.unwrap(), expected);
        }
    }

    #[test]
    fn test_replay_last_write_wins() {
        let repo = MemoryUrlRepository::new();
        repo.replay(vec![
            BackupRecord::new("aaaaa", url("https://example.com/old")),
            BackupRecord::new("aaaaa", url("https://example.com/new")),
        ]);

        assert_eq!(repo.len(), 1);
        assert_eq!(
            repo.inner.urls.get("aaaaa").unwrap().as_str(),
            "https://example.com/new"
        );
    }
}
