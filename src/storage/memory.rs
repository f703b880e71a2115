use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{Storage, StorageError};
use crate::db::{CategoryCount, NewPost, Post};

/// In-memory storage for tests and ephemeral runs.
///
/// Mirrors the SQLite backend's semantics: surrogate ids are monotonically
/// assigned and never reused, upserts preserve `id` and `created_at`, and
/// listings order by `event_time` then `id`, both descending.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    posts: Vec<Post>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Matches SQLite's `datetime('now')` format.
fn now_timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| {
        b.event_time
            .cmp(&a.event_time)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upsert(&self, post: &NewPost) -> Result<(), StorageError> {
        let mut inner = self.write();
        if let Some(existing) = inner
            .posts
            .iter_mut()
            .find(|p| p.source_message_id == post.source_message_id)
        {
            existing.content = post.content.clone();
            existing.media_kind = post.media_kind.as_str().to_string();
            existing.category = post.category.clone();
            existing.event_time = post.event_time;
            existing.updated_at = now_timestamp();
        } else {
            inner.next_id += 1;
            let now = now_timestamp();
            let id = inner.next_id;
            inner.posts.push(Post {
                id,
                source_message_id: post.source_message_id,
                content: post.content.clone(),
                media_kind: post.media_kind.as_str().to_string(),
                category: post.category.clone(),
                event_time: post.event_time,
                created_at: now.clone(),
                updated_at: now,
            });
        }
        Ok(())
    }

    async fn fetch(
        &self,
        category: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>, StorageError> {
        let inner = self.read();
        let mut matching: Vec<Post> = inner
            .posts
            .iter()
            .filter(|p| category.is_none_or(|c| p.category == c))
            .cloned()
            .collect();
        newest_first(&mut matching);
        Ok(matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count(&self, category: Option<&str>) -> Result<i64, StorageError> {
        let inner = self.read();
        Ok(inner
            .posts
            .iter()
            .filter(|p| category.is_none_or(|c| p.category == c))
            .count() as i64)
    }

    async fn list_categories(&self) -> Result<Vec<CategoryCount>, StorageError> {
        let inner = self.read();
        let mut counts: std::collections::BTreeMap<&str, i64> = std::collections::BTreeMap::new();
        for post in &inner.posts {
            *counts.entry(post.category.as_str()).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(name, count)| CategoryCount {
                name: name.to_string(),
                count,
            })
            .collect())
    }

    async fn search(
        &self,
        substring: &str,
        category: Option<&str>,
    ) -> Result<Vec<Post>, StorageError> {
        let needle = substring.to_lowercase();
        let inner = self.read();
        let mut matching: Vec<Post> = inner
            .posts
            .iter()
            .filter(|p| category.is_none_or(|c| p.category == c))
            .filter(|p| p.content.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        newest_first(&mut matching);
        Ok(matching)
    }

    async fn get_by_id(&self, source_message_id: i64) -> Result<Option<Post>, StorageError> {
        let inner = self.read();
        Ok(inner
            .posts
            .iter()
            .find(|p| p.source_message_id == source_message_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MediaKind;

    fn record(id: i64, content: &str, category: &str, event_time: i64) -> NewPost {
        NewPost {
            source_message_id: id,
            content: content.to_string(),
            media_kind: MediaKind::Text,
            category: category.to_string(),
            event_time,
        }
    }

    #[tokio::test]
    async fn upsert_is_idempotent_per_source_id() {
        let storage = MemoryStorage::new();
        storage.upsert(&record(42, "first", "news", 100)).await.unwrap();
        storage.upsert(&record(42, "second", "news", 101)).await.unwrap();

        assert_eq!(storage.count(None).await.unwrap(), 1);
        let post = storage.get_by_id(42).await.unwrap().unwrap();
        assert_eq!(post.content, "second");
        assert_eq!(post.id, 1);
    }

    #[tokio::test]
    async fn fetch_orders_newest_first_with_id_tiebreak() {
        let storage = MemoryStorage::new();
        storage.upsert(&record(1, "a", "general", 100)).await.unwrap();
        storage.upsert(&record(2, "b", "general", 300)).await.unwrap();
        storage.upsert(&record(3, "c", "general", 300)).await.unwrap();

        let posts = storage.fetch(None, 10, 0).await.unwrap();
        let ids: Vec<i64> = posts.iter().map(|p| p.source_message_id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn search_is_case_insensitive() {
        let storage = MemoryStorage::new();
        storage
            .upsert(&record(1, "Breaking News Today", "news", 100))
            .await
            .unwrap();

        let hits = storage.search("breaking", None).await.unwrap();
        assert_eq!(hits.len(), 1);
        let misses = storage.search("breaking", Some("general")).await.unwrap();
        assert!(misses.is_empty());
    }
}
