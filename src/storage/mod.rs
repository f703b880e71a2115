mod memory;
mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use thiserror::Error;

use crate::db::{CategoryCount, NewPost, Post};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),
}

/// Capability interface over the posts archive.
///
/// Exactly two implementations exist: [`SqliteStorage`] for production and
/// [`MemoryStorage`] for tests and ephemeral runs. The backend is selected
/// once at composition time from configuration, never swapped at runtime.
///
/// All listing operations return posts ordered by `event_time` descending
/// with `id` descending as tiebreak.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Insert or overwrite the post with the same `source_message_id`.
    ///
    /// Atomic per source message id: concurrent upserts for different ids
    /// proceed independently, concurrent upserts for the same id serialize
    /// and the later write wins. `id` and `created_at` of an existing row
    /// are preserved, `updated_at` is refreshed.
    async fn upsert(&self, post: &NewPost) -> Result<(), StorageError>;

    /// Fetch up to `limit` posts starting at `offset`, optionally filtered
    /// by category.
    async fn fetch(
        &self,
        category: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>, StorageError>;

    /// Total matching rows.
    async fn count(&self, category: Option<&str>) -> Result<i64, StorageError>;

    /// Every distinct category currently present, with its count.
    async fn list_categories(&self) -> Result<Vec<CategoryCount>, StorageError>;

    /// Case-insensitive substring match on content.
    ///
    /// Case folding is guaranteed for ASCII only: the SQLite backend folds
    /// with SQLite's `lower()`, which leaves non-ASCII characters as-is,
    /// while the in-memory backend folds full Unicode. Matching on
    /// non-ASCII case differences is backend-defined.
    async fn search(
        &self,
        substring: &str,
        category: Option<&str>,
    ) -> Result<Vec<Post>, StorageError>;

    /// Look up a post by its source message id.
    async fn get_by_id(&self, source_message_id: i64) -> Result<Option<Post>, StorageError>;
}
