use sqlx::SqlitePool;

use super::models::{CategoryCount, NewPost, Post};

/// Ordering shared by every listing query: newest first, surrogate id as
/// tiebreak for posts carrying the same event time.
const LISTING_ORDER: &str = "ORDER BY event_time DESC, id DESC";

/// Insert a post or overwrite the existing row with the same
/// `source_message_id`.
///
/// The conflict clause keeps `id` and `created_at` from the original row and
/// refreshes `updated_at`, so re-ingesting an edited message never creates a
/// duplicate. A single statement, atomic per row.
pub async fn upsert_post(pool: &SqlitePool, post: &NewPost) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
        INSERT INTO posts (source_message_id, content, media_kind, category, event_time)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT (source_message_id) DO UPDATE SET
            content = excluded.content,
            media_kind = excluded.media_kind,
            category = excluded.category,
            event_time = excluded.event_time,
            updated_at = datetime('now')
        ",
    )
    .bind(post.source_message_id)
    .bind(&post.content)
    .bind(post.media_kind.as_str())
    .bind(&post.category)
    .bind(post.event_time)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a post by its source message id.
pub async fn get_post_by_source_id(
    pool: &SqlitePool,
    source_message_id: i64,
) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM posts WHERE source_message_id = ?")
        .bind(source_message_id)
        .fetch_optional(pool)
        .await
}

/// Fetch posts newest-first, optionally filtered by category.
pub async fn fetch_posts(
    pool: &SqlitePool,
    category: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Post>, sqlx::Error> {
    if let Some(category) = category {
        sqlx::query_as(&format!(
            "SELECT * FROM posts WHERE category = ? {LISTING_ORDER} LIMIT ? OFFSET ?"
        ))
        .bind(category)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    } else {
        sqlx::query_as(&format!(
            "SELECT * FROM posts {LISTING_ORDER} LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }
}

/// Count posts, optionally filtered by category.
pub async fn count_posts(pool: &SqlitePool, category: Option<&str>) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = if let Some(category) = category {
        sqlx::query_as("SELECT COUNT(*) FROM posts WHERE category = ?")
            .bind(category)
            .fetch_one(pool)
            .await?
    } else {
        sqlx::query_as("SELECT COUNT(*) FROM posts")
            .fetch_one(pool)
            .await?
    };

    Ok(count)
}

/// Every distinct category currently present, with its row count.
pub async fn list_categories(pool: &SqlitePool) -> Result<Vec<CategoryCount>, sqlx::Error> {
    sqlx::query_as(
        r"
        SELECT category AS name, COUNT(*) AS count
        FROM posts
        GROUP BY category
        ",
    )
    .fetch_all(pool)
    .await
}

/// Case-insensitive substring search over post content.
///
/// `instr` over lowered text avoids LIKE wildcard escaping; SQLite's
/// `lower()` folds ASCII only, which matches the keyword vocabulary.
pub async fn search_posts(
    pool: &SqlitePool,
    substring: &str,
    category: Option<&str>,
) -> Result<Vec<Post>, sqlx::Error> {
    if let Some(category) = category {
        sqlx::query_as(&format!(
            r"
            SELECT * FROM posts
            WHERE instr(lower(content), lower(?)) > 0 AND category = ?
            {LISTING_ORDER}
            "
        ))
        .bind(substring)
        .bind(category)
        .fetch_all(pool)
        .await
    } else {
        sqlx::query_as(&format!(
            r"
            SELECT * FROM posts
            WHERE instr(lower(content), lower(?)) > 0
            {LISTING_ORDER}
            "
        ))
        .bind(substring)
        .fetch_all(pool)
        .await
    }
}
