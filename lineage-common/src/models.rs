//! Course catalog domain models
//!
//! A [`CourseRecord`] is one semester's offering of a course. A [`Topic`] groups
//! course records across semesters that denote the same underlying course.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Primary key of a topic row
pub type TopicId = i64;

/// Primary key of a course row
pub type CourseId = i64;

/// Semester token of the form `YYYYx` (x = A spring, B summer, C fall)
///
/// Tokens sort chronologically under plain string ordering, which is the only
/// ordering the merge engine relies on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Semester(String);

impl Semester {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for tokens shaped like `2019C`
    pub fn is_well_formed(&self) -> bool {
        let bytes = self.0.as_bytes();
        bytes.len() == 5
            && bytes[..4].iter().all(u8::is_ascii_digit)
            && matches!(bytes[4], b'A' | b'B' | b'C')
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Semester {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

/// One semester's offering record for a course
///
/// Read-only to the merge engine: the only field a merge changes is the owning
/// topic, and that change is applied by the store at commit time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub id: CourseId,
    pub semester: Semester,
    /// Department code, e.g. `CIS`
    pub department: String,
    /// Course number within the department, e.g. `1200`
    pub code: String,
    /// Dash-joined department and code, e.g. `CIS-1200`
    pub full_code: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub topic_id: TopicId,
    /// Full codes of every listing of the same physical offering, this one included
    pub crosslistings: Vec<String>,
}

impl CourseRecord {
    /// Build a record that is not cross-listed with anything
    pub fn new(
        id: CourseId,
        semester: impl Into<Semester>,
        department: impl Into<String>,
        code: impl Into<String>,
        topic_id: TopicId,
    ) -> Self {
        let department = department.into();
        let code = code.into();
        let full_code = format!("{}-{}", department, code);
        Self {
            id,
            semester: semester.into(),
            crosslistings: vec![full_code.clone()],
            department,
            code,
            full_code,
            title: None,
            description: None,
            topic_id,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replace the offering group with the given full codes (own code is always kept)
    pub fn with_crosslistings<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut listings: Vec<String> = codes.into_iter().map(Into::into).collect();
        if !listings.contains(&self.full_code) {
            listings.push(self.full_code.clone());
        }
        self.crosslistings = listings;
        self
    }

    /// True when `other` denotes the same course identity as `self`:
    /// the same full code, or a cross-listed sibling of this offering.
    pub fn is_same_course(&self, other: &CourseRecord) -> bool {
        self.full_code == other.full_code
            || self.crosslistings.iter().any(|code| *code == other.full_code)
    }

    /// Multi-line rendering shown to a human reviewer
    pub fn full_str(&self) -> String {
        format!(
            "{} ({}): {}\n{}",
            self.full_code,
            self.semester,
            self.title.as_deref().unwrap_or("<no title>"),
            self.description.as_deref().unwrap_or("<no description>")
        )
    }
}

impl fmt::Display for CourseRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.full_code, self.semester)
    }
}

/// A lineage group: course records across semesters believed to be the same course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: TopicId,
    pub course_ids: Vec<CourseId>,
    /// Course with the latest semester in this topic
    pub most_recent_id: Option<CourseId>,
}

impl Topic {
    pub fn new(id: TopicId, course_ids: Vec<CourseId>) -> Self {
        Self {
            id,
            course_ids,
            most_recent_id: None,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Topic {} ({} courses)", self.id, self.course_ids.len())
    }
}
