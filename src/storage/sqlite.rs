use async_trait::async_trait;

use super::{Storage, StorageError};
use crate::db::{self, CategoryCount, Database, NewPost, Post};

/// Persistent storage backed by SQLite.
///
/// Thin adapter over the query layer; upsert atomicity comes from the
/// single-statement `INSERT ... ON CONFLICT DO UPDATE` in
/// [`db::upsert_post`].
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    db: Database,
}

impl SqliteStorage {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn upsert(&self, post: &NewPost) -> Result<(), StorageError> {
        db::upsert_post(self.db.pool(), post).await?;
        Ok(())
    }

    async fn fetch(
        &self,
        category: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>, StorageError> {
        Ok(db::fetch_posts(self.db.pool(), category, limit, offset).await?)
    }

    async fn count(&self, category: Option<&str>) -> Result<i64, StorageError> {
        Ok(db::count_posts(self.db.pool(), category).await?)
    }

    async fn list_categories(&self) -> Result<Vec<CategoryCount>, StorageError> {
        Ok(db::list_categories(self.db.pool()).await?)
    }

    async fn search(
        &self,
        substring: &str,
        category: Option<&str>,
    ) -> Result<Vec<Post>, StorageError> {
        Ok(db::search_posts(self.db.pool(), substring, category).await?)
    }

    async fn get_by_id(&self, source_message_id: i64) -> Result<Option<Post>, StorageError> {
        Ok(db::get_post_by_source_id(self.db.pool(), source_message_id).await?)
    }
}
