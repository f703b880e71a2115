//! Query and statistics service over the posts archive.
//!
//! Validates and clamps pagination input, composes storage calls, and
//! computes aggregate statistics. Bad pagination input is corrected, never
//! surfaced as an error.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::db::{CategoryCount, Post};
use crate::storage::{Storage, StorageError};

/// Default page size when the caller supplies none, zero, or a negative
/// limit.
pub const DEFAULT_LIMIT: i64 = 100;

/// Hard ceiling on page size; larger requests are clamped down to this.
pub const MAX_LIMIT: i64 = 1000;

/// Number of most recent posts the media-kind histogram is computed over.
const STATS_WINDOW: i64 = 1000;

/// One page of posts plus pagination bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct PostPage {
    pub items: Vec<Post>,
    pub total: i64,
    pub has_more: bool,
}

/// Substring search results.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub items: Vec<Post>,
    pub count: usize,
}

/// Aggregate archive statistics.
///
/// `media_kind_histogram` is computed over the most recent 1000 posts, not
/// the full table; for archives larger than that window it is an
/// approximation of the overall distribution. `total_posts` is exact.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveStats {
    pub total_posts: i64,
    pub media_kind_histogram: BTreeMap<String, i64>,
    pub categories_count: usize,
}

#[derive(Clone)]
pub struct QueryService {
    storage: Arc<dyn Storage>,
}

impl QueryService {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Fetch a page of posts, optionally filtered by category.
    ///
    /// Non-positive or missing `limit` becomes [`DEFAULT_LIMIT`], anything
    /// above [`MAX_LIMIT`] is clamped down to it. Negative `offset` becomes
    /// zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub async fn get_posts(
        &self,
        category: Option<&str>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<PostPage, StorageError> {
        let limit = clamp_limit(limit);
        let offset = clamp_offset(offset);

        let items = self.storage.fetch(category, limit, offset).await?;
        let total = self.storage.count(category).await?;
        let has_more = offset + (items.len() as i64) < total;

        Ok(PostPage {
            items,
            total,
            has_more,
        })
    }

    /// Look up a single post by its source message id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub async fn get_post(&self, source_message_id: i64) -> Result<Option<Post>, StorageError> {
        self.storage.get_by_id(source_message_id).await
    }

    /// Every distinct category with its exact count.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub async fn get_categories(&self) -> Result<Vec<CategoryCount>, StorageError> {
        self.storage.list_categories().await
    }

    /// Aggregate statistics; see [`ArchiveStats`] for the bounded-window
    /// caveat on the histogram.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub async fn get_stats(&self) -> Result<ArchiveStats, StorageError> {
        let total_posts = self.storage.count(None).await?;
        let categories_count = self.storage.list_categories().await?.len();

        let recent = self.storage.fetch(None, STATS_WINDOW, 0).await?;
        let mut media_kind_histogram = BTreeMap::new();
        for post in &recent {
            *media_kind_histogram
                .entry(post.media_kind.clone())
                .or_default() += 1;
        }

        Ok(ArchiveStats {
            total_posts,
            media_kind_histogram,
            categories_count,
        })
    }

    /// Case-insensitive substring search. An empty or whitespace-only query
    /// returns an empty result set, never all posts.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub async fn search(
        &self,
        query: &str,
        category: Option<&str>,
    ) -> Result<SearchResults, StorageError> {
        if query.trim().is_empty() {
            return Ok(SearchResults {
                items: Vec::new(),
                count: 0,
            });
        }

        let items = self.storage.search(query, category).await?;
        let count = items.len();
        Ok(SearchResults { items, count })
    }
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    match limit {
        Some(l) if l >= 1 => l.min(MAX_LIMIT),
        _ => DEFAULT_LIMIT,
    }
}

fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}
