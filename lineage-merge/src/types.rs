//! Core types shared by the oracle, merge engine and coordinator

use chrono::{DateTime, Utc};
use lineage_common::{CourseId, CourseRecord, TopicId};
use serde::Serialize;
use std::fmt;

/// Outcome of asking whether two course records should be linked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LinkDecision {
    /// Same lineage entry; safe to merge across
    Definite,
    /// Similar enough to flag for review, never merged automatically
    Possible,
    /// Not the same course
    No,
}

impl fmt::Display for LinkDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LinkDecision::Definite => "DEFINITE",
            LinkDecision::Possible => "POSSIBLE",
            LinkDecision::No => "NONE",
        };
        f.write_str(label)
    }
}

/// Semester-adjacent pair of records straddling two lineages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CandidateLink {
    pub older: CourseId,
    pub newer: CourseId,
}

impl CandidateLink {
    pub fn new(older: CourseId, newer: CourseId) -> Self {
        Self { older, newer }
    }
}

/// One topic absorbing another
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeStep {
    pub survivor: TopicId,
    pub absorbed: TopicId,
    /// Most recent course of the merged topic
    pub most_recent_id: Option<CourseId>,
}

/// A POSSIBLE link recorded in batch mode for later audit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PossibleLink {
    pub course_a: CourseId,
    pub full_code_a: String,
    pub semester_a: String,
    pub course_b: CourseId,
    pub full_code_b: String,
    pub semester_b: String,
    pub found_at: DateTime<Utc>,
}

impl PossibleLink {
    pub fn between(course_a: &CourseRecord, course_b: &CourseRecord) -> Self {
        Self {
            course_a: course_a.id,
            full_code_a: course_a.full_code.clone(),
            semester_a: course_a.semester.to_string(),
            course_b: course_b.id,
            full_code_b: course_b.full_code.clone(),
            semester_b: course_b.semester.to_string(),
            found_at: Utc::now(),
        }
    }
}

/// Summary of one discovery run
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeReport {
    pub steps: Vec<MergeStep>,
    /// Lineage pairs rejected outright for a same-semester conflict
    pub same_semester_conflicts: usize,
    /// Lineage pairs rejected because a boundary pair was not DEFINITE
    pub rejected_pairs: usize,
    /// Pairs that reached similarity scoring
    pub similarity_checks: usize,
    /// Reviewer prompts shown (interactive mode)
    pub prompts: usize,
    pub possible_links: Vec<PossibleLink>,
    pub committed: bool,
}

impl MergeReport {
    pub fn merge_count(&self) -> usize {
        self.steps.len()
    }
}
