//! Topic and course persistence
//!
//! Read side: a full snapshot of topics with their course records, cross-listing
//! groups resolved. Write side: the three statements a topic merge needs.
//! Write functions take a connection so callers can run them inside one
//! transaction.

use crate::models::{CourseId, CourseRecord, Semester, Topic, TopicId};
use crate::Result;
use sqlx::{Row, SqliteConnection};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::warn;

/// Every topic with its course records, as loaded at run start
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    /// Topics ordered by id
    pub topics: Vec<Topic>,
    /// Course records owned by the topics above
    pub courses: Vec<CourseRecord>,
}

impl CatalogSnapshot {
    /// Course records keyed by id
    pub fn course_index(&self) -> HashMap<CourseId, &CourseRecord> {
        self.courses.iter().map(|c| (c.id, c)).collect()
    }

    /// Courses whose semester token won't order chronologically
    pub fn malformed_semesters(&self) -> Vec<&CourseRecord> {
        self.courses
            .iter()
            .filter(|c| !c.semester.is_well_formed())
            .collect()
    }
}

/// Load every topic and its courses
pub async fn load_snapshot(conn: &mut SqliteConnection) -> Result<CatalogSnapshot> {
    load_filtered(conn, None).await
}

/// Load only the listed topics (ids that don't exist are simply absent)
pub async fn load_topics(conn: &mut SqliteConnection, ids: &[TopicId]) -> Result<CatalogSnapshot> {
    let wanted: HashSet<TopicId> = ids.iter().copied().collect();
    load_filtered(conn, Some(&wanted)).await
}

async fn load_filtered(
    conn: &mut SqliteConnection,
    wanted: Option<&HashSet<TopicId>>,
) -> Result<CatalogSnapshot> {
    let topic_rows = sqlx::query("SELECT id, most_recent_id FROM topics ORDER BY id")
        .fetch_all(&mut *conn)
        .await?;

    let mut topics: BTreeMap<TopicId, Topic> = BTreeMap::new();
    for row in topic_rows {
        let id: TopicId = row.get("id");
        if wanted.map_or(true, |w| w.contains(&id)) {
            let mut topic = Topic::new(id, Vec::new());
            topic.most_recent_id = row.get("most_recent_id");
            topics.insert(id, topic);
        }
    }

    // Cross-listing groups are keyed by the primary listing (a course with no
    // primary listing is its own primary).
    let listing_rows = sqlx::query(
        "SELECT id, full_code, COALESCE(primary_listing_id, id) AS group_id FROM courses ORDER BY id",
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut groups: HashMap<CourseId, Vec<String>> = HashMap::new();
    let mut group_of: HashMap<CourseId, CourseId> = HashMap::new();
    for row in listing_rows {
        let id: CourseId = row.get("id");
        let group_id: CourseId = row.get("group_id");
        let full_code: String = row.get("full_code");
        groups.entry(group_id).or_default().push(full_code);
        group_of.insert(id, group_id);
    }

    let course_rows = sqlx::query(
        r#"
        SELECT id, semester, department, code, full_code, title, description, topic_id
        FROM courses
        WHERE topic_id IS NOT NULL
        ORDER BY semester, id
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut courses = Vec::new();
    for row in course_rows {
        let topic_id: TopicId = row.get("topic_id");
        let Some(topic) = topics.get_mut(&topic_id) else {
            continue;
        };

        let id: CourseId = row.get("id");
        let full_code: String = row.get("full_code");
        let crosslistings = group_of
            .get(&id)
            .and_then(|g| groups.get(g))
            .cloned()
            .unwrap_or_else(|| vec![full_code.clone()]);

        topic.course_ids.push(id);
        courses.push(CourseRecord {
            id,
            semester: Semester::new(row.get::<String, _>("semester")),
            department: row.get("department"),
            code: row.get("code"),
            full_code,
            title: row.get("title"),
            description: row.get("description"),
            topic_id,
            crosslistings,
        });
    }

    let snapshot = CatalogSnapshot {
        topics: topics.into_values().collect(),
        courses,
    };
    for course in snapshot.malformed_semesters() {
        warn!(
            course_id = course.id,
            semester = %course.semester,
            "Malformed semester token; timeline order may be wrong"
        );
    }
    Ok(snapshot)
}

/// Move every course of topic `from` onto topic `to`
pub async fn reassign_courses(
    conn: &mut SqliteConnection,
    from: TopicId,
    to: TopicId,
) -> Result<u64> {
    let result = sqlx::query("UPDATE courses SET topic_id = ? WHERE topic_id = ?")
        .bind(to)
        .bind(from)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Delete a topic row (its courses must already be reassigned)
pub async fn delete_topic(conn: &mut SqliteConnection, id: TopicId) -> Result<u64> {
    let result = sqlx::query("DELETE FROM topics WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Point a topic at its most recent course
pub async fn set_most_recent(
    conn: &mut SqliteConnection,
    topic: TopicId,
    course: Option<CourseId>,
) -> Result<()> {
    sqlx::query("UPDATE topics SET most_recent_id = ? WHERE id = ?")
        .bind(course)
        .bind(topic)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Insert a topic row
pub async fn insert_topic(conn: &mut SqliteConnection, id: TopicId) -> Result<()> {
    sqlx::query("INSERT INTO topics (id) VALUES (?)")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Insert a course row; `primary_listing` links it into a cross-listing group
pub async fn insert_course(
    conn: &mut SqliteConnection,
    course: &CourseRecord,
    primary_listing: Option<CourseId>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO courses (
            id, semester, department, code, full_code, title, description,
            topic_id, primary_listing_id
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(course.id)
    .bind(course.semester.as_str())
    .bind(&course.department)
    .bind(&course.code)
    .bind(&course.full_code)
    .bind(&course.title)
    .bind(&course.description)
    .bind(course.topic_id)
    .bind(primary_listing)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Topic id owning each course, for verifying a committed partition
pub async fn course_topic_assignments(
    conn: &mut SqliteConnection,
) -> Result<BTreeMap<CourseId, Option<TopicId>>> {
    let rows = sqlx::query("SELECT id, topic_id FROM courses ORDER BY id")
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows
        .into_iter()
        .map(|row| (row.get("id"), row.get("topic_id")))
        .collect())
}
