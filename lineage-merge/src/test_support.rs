//! Fakes shared by unit tests

use crate::crosswalk::{CrosswalkRow, RenumberingMap};
use crate::oracle::LinkOracle;
use crate::review::{ReviewMode, Reviewer};
use crate::similarity::{CourseTextHeuristics, EmbeddingError, SentenceEmbedder, SimilarityScorer};
use async_trait::async_trait;
use lineage_common::config::Thresholds;
use lineage_common::CourseRecord;
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Every sentence maps to the same vector: all non-empty texts are maximally similar
pub struct UniformEmbedder {
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl SentenceEmbedder for UniformEmbedder {
    async fn embed(&self, sentences: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(sentences.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

/// Interactive reviewer answering from a script (no once the script runs out)
pub struct ScriptedReviewer {
    answers: VecDeque<bool>,
    pub asked: Arc<AtomicUsize>,
}

impl ScriptedReviewer {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Reviewer for ScriptedReviewer {
    fn mode(&self) -> ReviewMode {
        ReviewMode::Interactive
    }

    fn confirm(&mut self, _courses: &[&CourseRecord]) -> io::Result<bool> {
        self.asked.fetch_add(1, Ordering::SeqCst);
        Ok(self.answers.pop_front().unwrap_or(false))
    }
}

/// Crosswalk from `(old_full_code, new_full_code)` pairs
pub fn crosswalk(pairs: &[(&str, &str)]) -> RenumberingMap {
    let split = |code: &str| -> (String, String) {
        let (dept, number) = code.split_once('-').unwrap();
        (dept.to_string(), number.to_string())
    };
    RenumberingMap::from_rows(pairs.iter().map(|(old, new)| {
        let (old_department, old_number) = split(old);
        let (new_department, new_number) = split(new);
        CrosswalkRow {
            old_department,
            old_number,
            new_department,
            new_number,
        }
    }))
}

/// Oracle over a uniform embedder; returns the embedder's call counter
pub fn oracle(crosswalk: RenumberingMap, reviewer: Box<dyn Reviewer>) -> (LinkOracle, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let scorer = SimilarityScorer::new(
        Box::new(UniformEmbedder {
            calls: calls.clone(),
        }),
        Box::new(CourseTextHeuristics),
        Thresholds::default(),
    );
    (LinkOracle::new(crosswalk, scorer, reviewer), calls)
}

/// Course record with a shared title and description, so similarity fires
pub fn course(id: i64, topic: i64, semester: &str, full_code: &str) -> CourseRecord {
    let (dept, code) = full_code.split_once('-').unwrap();
    CourseRecord::new(id, semester, dept, code, topic)
        .with_title("Software Design")
        .with_description("Design of software systems.")
}
