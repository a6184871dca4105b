//! Database initialization tests
//!
//! Verifies first-run database creation and idempotent schema setup.

use lineage_common::db::{init_database, topics};
use lineage_common::CourseRecord;
use tempfile::TempDir;

#[tokio::test]
async fn test_init_creates_database_and_parent_directory() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("lineage.db");

    assert!(!db_path.exists());
    let pool = init_database(&db_path).await.unwrap();
    assert!(db_path.exists(), "Database file should be created");

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(tables, vec!["courses".to_string(), "topics".to_string()]);
}

#[tokio::test]
async fn test_init_is_idempotent_and_preserves_data() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("lineage.db");

    {
        let pool = init_database(&db_path).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        topics::insert_topic(&mut conn, 7).await.unwrap();
        topics::insert_course(&mut conn, &CourseRecord::new(70, "2021A", "CIS", "1600", 7), None)
            .await
            .unwrap();
        drop(conn);
        pool.close().await;
    }

    let pool = init_database(&db_path).await.unwrap();
    let mut conn = pool.acquire().await.unwrap();
    let snapshot = topics::load_snapshot(&mut conn).await.unwrap();
    assert_eq!(snapshot.topics.len(), 1);
    assert_eq!(snapshot.topics[0].id, 7);
    assert_eq!(snapshot.courses[0].full_code, "CIS-1600");
}
