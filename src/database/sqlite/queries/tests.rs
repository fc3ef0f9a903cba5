use super::*;
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;

async fn create_test_pool() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(&db_path)
                .create_if_missing(true)
                .foreign_keys(true),
        )
        .await
        .expect("Failed to create test pool");

    sqlx::query(include_str!("../migrations/0001_initial.sql"))
        .execute(&pool)
        .await
        .expect("Failed to run migrations");

    (temp_dir, pool)
}

#[tokio::test]
async fn page_crud_operations() {
    let (_temp_dir, pool) = create_test_pool().await;

    let new_page = NewPage {
        page_id: "a1b2c3d4".to_string(),
        title: "Team Handbook".to_string(),
    };

    let created = PageQueries::create(&pool, new_page)
        .await
        .expect("Failed to create page");

    assert_eq!(created.title, "Team Handbook");
    assert_eq!(created.status, PageStatus::Pending);
    assert_eq!(created.chunk_count, 0);
    assert!(created.content_complete);

    let retrieved = PageQueries::get_by_id(&pool, created.id)
        .await
        .expect("Failed to get page")
        .expect("Page should exist");

    assert_eq!(retrieved.id, created.id);
    assert_eq!(retrieved.page_id, "a1b2c3d4");

    let update = PageUpdate {
        status: Some(PageStatus::Completed),
        chunk_count: Some(8),
        content_complete: Some(false),
        indexed_date: Some(Utc::now().naive_utc()),
        ..PageUpdate::default()
    };

    let updated = PageQueries::update(&pool, created.id, update)
        .await
        .expect("Failed to update page")
        .expect("Page should exist");

    assert_eq!(updated.status, PageStatus::Completed);
    assert_eq!(updated.chunk_count, 8);
    assert!(!updated.content_complete);
    assert!(updated.indexed_date.is_some());

    let deleted = PageQueries::delete(&pool, created.id)
        .await
        .expect("Failed to delete page");
    assert!(deleted);

    let gone = PageQueries::get_by_id(&pool, created.id)
        .await
        .expect("Failed to query page");
    assert!(gone.is_none());
}

#[tokio::test]
async fn get_by_page_id_lookup() {
    let (_temp_dir, pool) = create_test_pool().await;

    let created = PageQueries::create(
        &pool,
        NewPage {
            page_id: "root-page".to_string(),
            title: "Root".to_string(),
        },
    )
    .await
    .expect("Failed to create page");

    let found = PageQueries::get_by_page_id(&pool, "root-page")
        .await
        .expect("Failed to query page")
        .expect("Page should exist");
    assert_eq!(found.id, created.id);

    let missing = PageQueries::get_by_page_id(&pool, "no-such-page")
        .await
        .expect("Failed to query page");
    assert!(missing.is_none());
}

#[tokio::test]
async fn list_by_status_filters() {
    let (_temp_dir, pool) = create_test_pool().await;

    let first = PageQueries::create(
        &pool,
        NewPage {
            page_id: "one".to_string(),
            title: "One".to_string(),
        },
    )
    .await
    .expect("Failed to create page");

    PageQueries::create(
        &pool,
        NewPage {
            page_id: "two".to_string(),
            title: "Two".to_string(),
        },
    )
    .await
    .expect("Failed to create page");

    PageQueries::update(
        &pool,
        first.id,
        PageUpdate {
            status: Some(PageStatus::Failed),
            error_message: Some("Connection error".to_string()),
            ..PageUpdate::default()
        },
    )
    .await
    .expect("Failed to update page");

    let failed = PageQueries::list_by_status(&pool, PageStatus::Failed)
        .await
        .expect("Failed to list pages");
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].page_id, "one");

    let pending = PageQueries::list_by_status(&pool, PageStatus::Pending)
        .await
        .expect("Failed to list pages");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].page_id, "two");

    let all = PageQueries::list_all(&pool).await.expect("Failed to list pages");
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn empty_update_returns_current_row() {
    let (_temp_dir, pool) = create_test_pool().await;

    let created = PageQueries::create(
        &pool,
        NewPage {
            page_id: "noop".to_string(),
            title: "Noop".to_string(),
        },
    )
    .await
    .expect("Failed to create page");

    let unchanged = PageQueries::update(&pool, created.id, PageUpdate::default())
        .await
        .expect("Failed to update page")
        .expect("Page should exist");

    assert_eq!(unchanged, created);
}

#[tokio::test]
async fn count_chunks_sums_completed_pages() {
    let (_temp_dir, pool) = create_test_pool().await;

    for (page_id, chunks, status) in [
        ("a", 5, PageStatus::Completed),
        ("b", 7, PageStatus::Completed),
        ("c", 3, PageStatus::Failed),
    ] {
        let page = PageQueries::create(
            &pool,
            NewPage {
                page_id: page_id.to_string(),
                title: page_id.to_uppercase(),
            },
        )
        .await
        .expect("Failed to create page");

        PageQueries::update(
            &pool,
            page.id,
            PageUpdate {
                status: Some(status),
                chunk_count: Some(chunks),
                ..PageUpdate::default()
            },
        )
        .await
        .expect("Failed to update page");
    }

    let total = PageQueries::count_chunks(&pool)
        .await
        .expect("Failed to count chunks");
    assert_eq!(total, 12);
}

#[tokio::test]
async fn completion_clears_earlier_failure_error() {
    let (_temp_dir, pool) = create_test_pool().await;

    let page = PageQueries::create(
        &pool,
        NewPage {
            page_id: "retry".to_string(),
            title: "Retry".to_string(),
        },
    )
    .await
    .expect("Failed to create page");

    PageQueries::update(
        &pool,
        page.id,
        PageUpdate {
            status: Some(PageStatus::Failed),
            error_message: Some("Connection error".to_string()),
            ..PageUpdate::default()
        },
    )
    .await
    .expect("Failed to update page");

    let recovered = PageQueries::update(
        &pool,
        page.id,
        PageUpdate {
            status: Some(PageStatus::Completed),
            chunk_count: Some(4),
            ..PageUpdate::default()
        },
    )
    .await
    .expect("Failed to update page")
    .expect("Page should exist");

    assert_eq!(recovered.status, PageStatus::Completed);
    assert_eq!(recovered.chunk_count, 4);
    assert!(recovered.error_message.is_none());
}

#[tokio::test]
async fn duplicate_page_id_rejected() {
    let (_temp_dir, pool) = create_test_pool().await;

    PageQueries::create(
        &pool,
        NewPage {
            page_id: "dup".to_string(),
            title: "First".to_string(),
        },
    )
    .await
    .expect("Failed to create page");

    let result = PageQueries::create(
        &pool,
        NewPage {
            page_id: "dup".to_string(),
            title: "Second".to_string(),
        },
    )
    .await;

    assert!(result.is_err());
}
