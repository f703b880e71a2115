//! Integration tests for the SQLite storage backend.

use channel_post_archiver::db::{
    count_posts, fetch_posts, get_post_by_source_id, list_categories, search_posts, upsert_post,
    Database, MediaKind, NewPost,
};
use channel_post_archiver::storage::{SqliteStorage, Storage};
use tempfile::TempDir;

async fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");
    (db, temp_dir)
}

fn post(source_message_id: i64, content: &str, category: &str, event_time: i64) -> NewPost {
    NewPost {
        source_message_id,
        content: content.to_string(),
        media_kind: MediaKind::Text,
        category: category.to_string(),
        event_time,
    }
}

#[tokio::test]
async fn test_upsert_and_get() {
    let (db, _temp_dir) = setup_db().await;

    upsert_post(db.pool(), &post(42, "Breaking news today", "news", 1000))
        .await
        .expect("Failed to upsert");

    let stored = get_post_by_source_id(db.pool(), 42)
        .await
        .expect("Failed to get post")
        .expect("Post not found");

    assert_eq!(stored.source_message_id, 42);
    assert_eq!(stored.content, "Breaking news today");
    assert_eq!(stored.category, "news");
    assert_eq!(stored.media_kind, "text");
    assert_eq!(stored.media_kind_enum(), Some(MediaKind::Text));
    assert!(!stored.created_at.is_empty());
}

#[tokio::test]
async fn test_reingest_updates_in_place() {
    let (db, _temp_dir) = setup_db().await;

    upsert_post(db.pool(), &post(42, "Breaking news today", "news", 1000))
        .await
        .unwrap();
    let original = get_post_by_source_id(db.pool(), 42).await.unwrap().unwrap();

    upsert_post(db.pool(), &post(42, "Breaking news updated", "news", 1001))
        .await
        .unwrap();

    // Exactly one row, holding the latest content.
    assert_eq!(count_posts(db.pool(), None).await.unwrap(), 1);

    let updated = get_post_by_source_id(db.pool(), 42).await.unwrap().unwrap();
    assert_eq!(updated.content, "Breaking news updated");
    assert_eq!(updated.event_time, 1001);

    // Surrogate key and creation time survive the overwrite.
    assert_eq!(updated.id, original.id);
    assert_eq!(updated.created_at, original.created_at);
}

#[tokio::test]
async fn test_source_message_ids_stay_unique() {
    let (db, _temp_dir) = setup_db().await;

    for round in 0..3 {
        for id in 1..=5 {
            upsert_post(db.pool(), &post(id, &format!("round {round}"), "general", id))
                .await
                .unwrap();
        }
    }

    let all = fetch_posts(db.pool(), None, 100, 0).await.unwrap();
    assert_eq!(all.len(), 5);
    let mut ids: Vec<i64> = all.iter().map(|p| p.source_message_id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 5);
}

#[tokio::test]
async fn test_fetch_ordering_newest_first_with_id_tiebreak() {
    let (db, _temp_dir) = setup_db().await;

    // Out-of-order arrival; two posts share an event time.
    upsert_post(db.pool(), &post(10, "a", "general", 500)).await.unwrap();
    upsert_post(db.pool(), &post(11, "b", "general", 900)).await.unwrap();
    upsert_post(db.pool(), &post(12, "c", "general", 900)).await.unwrap();
    upsert_post(db.pool(), &post(13, "d", "general", 100)).await.unwrap();

    let posts = fetch_posts(db.pool(), None, 100, 0).await.unwrap();
    let order: Vec<i64> = posts.iter().map(|p| p.source_message_id).collect();
    // event_time desc; id 12 was inserted after 11, so it wins the tie.
    assert_eq!(order, vec![12, 11, 10, 13]);

    for pair in posts.windows(2) {
        assert!(pair[0].event_time >= pair[1].event_time);
        if pair[0].event_time == pair[1].event_time {
            assert!(pair[0].id > pair[1].id);
        }
    }
}

#[tokio::test]
async fn test_pagination_returns_min_of_limit_and_remaining() {
    let (db, _temp_dir) = setup_db().await;

    for id in 1..=7 {
        upsert_post(db.pool(), &post(id, "x", "general", id)).await.unwrap();
    }

    let total = count_posts(db.pool(), None).await.unwrap();
    assert_eq!(total, 7);

    for (limit, offset, expected) in [(3, 0, 3), (3, 6, 1), (3, 7, 0), (10, 2, 5)] {
        let page = fetch_posts(db.pool(), None, limit, offset).await.unwrap();
        assert_eq!(
            page.len() as i64,
            expected,
            "limit={limit} offset={offset}"
        );
    }
}

#[tokio::test]
async fn test_category_filter_and_counts() {
    let (db, _temp_dir) = setup_db().await;

    upsert_post(db.pool(), &post(1, "n1", "news", 1)).await.unwrap();
    upsert_post(db.pool(), &post(2, "n2", "news", 2)).await.unwrap();
    upsert_post(db.pool(), &post(3, "g1", "general", 3)).await.unwrap();
    upsert_post(db.pool(), &post(4, "g2", "general", 4)).await.unwrap();
    upsert_post(db.pool(), &post(5, "g3", "general", 5)).await.unwrap();

    let news = fetch_posts(db.pool(), Some("news"), 100, 0).await.unwrap();
    assert_eq!(news.len(), 2);
    assert!(news.iter().all(|p| p.category == "news"));

    assert_eq!(count_posts(db.pool(), Some("news")).await.unwrap(), 2);
    assert_eq!(count_posts(db.pool(), Some("general")).await.unwrap(), 3);
    assert_eq!(count_posts(db.pool(), Some("missing")).await.unwrap(), 0);

    let mut categories = list_categories(db.pool()).await.unwrap();
    categories.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(categories.len(), 2);
    assert_eq!(categories[0].name, "general");
    assert_eq!(categories[0].count, 3);
    assert_eq!(categories[1].name, "news");
    assert_eq!(categories[1].count, 2);
}

#[tokio::test]
async fn test_search_case_insensitive_substring() {
    let (db, _temp_dir) = setup_db().await;

    upsert_post(db.pool(), &post(1, "The Quick Brown Fox", "general", 1))
        .await
        .unwrap();
    upsert_post(db.pool(), &post(2, "lazy dog", "general", 2)).await.unwrap();
    upsert_post(db.pool(), &post(3, "quick update", "news", 3)).await.unwrap();

    let hits = search_posts(db.pool(), "QUICK", None).await.unwrap();
    assert_eq!(hits.len(), 2);
    // fetch ordering applies to search results too
    assert_eq!(hits[0].source_message_id, 3);

    let filtered = search_posts(db.pool(), "quick", Some("news")).await.unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].source_message_id, 3);

    let none = search_posts(db.pool(), "zebra", None).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_get_by_unknown_id_is_none() {
    let (db, _temp_dir) = setup_db().await;

    let missing = get_post_by_source_id(db.pool(), 999).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_trait_object_over_sqlite_backend() {
    let (db, _temp_dir) = setup_db().await;
    let storage: Box<dyn Storage> = Box::new(SqliteStorage::new(db));

    storage
        .upsert(&post(7, "through the trait", "general", 70))
        .await
        .unwrap();

    assert_eq!(storage.count(None).await.unwrap(), 1);
    let found = storage.get_by_id(7).await.unwrap().unwrap();
    assert_eq!(found.content, "through the trait");
}

#[tokio::test]
async fn test_concurrent_upserts_for_different_ids() {
    let (db, _temp_dir) = setup_db().await;
    let storage = std::sync::Arc::new(SqliteStorage::new(db));

    let mut handles = Vec::new();
    for id in 1..=20 {
        let storage = std::sync::Arc::clone(&storage);
        handles.push(tokio::spawn(async move {
            storage
                .upsert(&post(id, &format!("post {id}"), "general", id))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(storage.count(None).await.unwrap(), 20);
}
