//! Database test utilities
//!
//! Temporary catalog databases and seeding helpers.

use anyhow::Result;
use lineage_common::db::{init_database, topics};
use lineage_common::{CourseId, CourseRecord, TopicId};
use sqlx::SqlitePool;
use std::collections::{BTreeMap, BTreeSet};
use tempfile::TempDir;

/// Create a temporary catalog database with the schema applied
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> Result<(TempDir, SqlitePool)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test_lineage.db");
    let pool = init_database(&db_path).await?;
    Ok((temp_dir, pool))
}

/// A course to seed, optionally cross-listed under a primary listing
pub struct SeedCourse {
    pub course: CourseRecord,
    pub primary_listing: Option<CourseId>,
}

impl From<CourseRecord> for SeedCourse {
    fn from(course: CourseRecord) -> Self {
        Self {
            course,
            primary_listing: None,
        }
    }
}

/// Course `full_code` (`DEPT-CODE`) in `semester`, owned by `topic`
pub fn course(id: CourseId, topic: TopicId, semester: &str, full_code: &str) -> CourseRecord {
    let (dept, code) = full_code
        .split_once('-')
        .expect("full code must be DEPT-CODE");
    CourseRecord::new(id, semester, dept, code, topic)
}

/// Cross-list `course` under the primary listing `primary`
pub fn crosslisted(course: CourseRecord, primary: CourseId) -> SeedCourse {
    SeedCourse {
        course,
        primary_listing: Some(primary),
    }
}

/// Insert each course's topic (once) and then the courses, in order
///
/// Primary listings must come before the courses cross-listed under them.
pub async fn seed_catalog(pool: &SqlitePool, courses: Vec<SeedCourse>) -> Result<()> {
    let mut conn = pool.acquire().await?;

    let topic_ids: BTreeSet<TopicId> = courses.iter().map(|s| s.course.topic_id).collect();
    for id in topic_ids {
        topics::insert_topic(&mut conn, id).await?;
    }
    for seed in &courses {
        topics::insert_course(&mut conn, &seed.course, seed.primary_listing).await?;
    }
    Ok(())
}

/// Insert a topic that owns no courses
pub async fn seed_empty_topic(pool: &SqlitePool, id: TopicId) -> Result<()> {
    let mut conn = pool.acquire().await?;
    topics::insert_topic(&mut conn, id).await?;
    Ok(())
}

/// Topic ids in the store, ascending
pub async fn topic_ids(pool: &SqlitePool) -> Result<Vec<TopicId>> {
    let ids = sqlx::query_scalar::<_, TopicId>("SELECT id FROM topics ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(ids)
}

/// Owning topic of every course
pub async fn assignments(pool: &SqlitePool) -> Result<BTreeMap<CourseId, Option<TopicId>>> {
    let mut conn = pool.acquire().await?;
    Ok(topics::course_topic_assignments(&mut conn).await?)
}

pub async fn most_recent_id(pool: &SqlitePool, topic: TopicId) -> Result<Option<CourseId>> {
    let id = sqlx::query_scalar::<_, Option<CourseId>>("SELECT most_recent_id FROM topics WHERE id = ?")
        .bind(topic)
        .fetch_one(pool)
        .await?;
    Ok(id)
}
