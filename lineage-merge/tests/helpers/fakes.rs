//! Fakes for the embedding service and the human reviewer

use async_trait::async_trait;
use lineage_common::config::Thresholds;
use lineage_common::CourseRecord;
use lineage_merge::similarity::{CourseTextHeuristics, EmbeddingError, SentenceEmbedder};
use lineage_merge::{LinkOracle, RenumberingMap, ReviewMode, Reviewer, SimilarityScorer};
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Embeds every sentence as the same vector and counts requests
pub struct CountingEmbedder {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl SentenceEmbedder for CountingEmbedder {
    async fn embed(&self, sentences: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(sentences.iter().map(|_| vec![0.6, 0.8]).collect())
    }
}

/// Embedding service that is always down
pub struct FailingEmbedder;

#[async_trait]
impl SentenceEmbedder for FailingEmbedder {
    async fn embed(&self, _sentences: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::Api(503, "service unavailable".to_string()))
    }
}

/// Interactive reviewer answering from a script; records what it was shown
pub struct ScriptedReviewer {
    answers: VecDeque<bool>,
    pub asked: Arc<AtomicUsize>,
    pub shown: Arc<std::sync::Mutex<Vec<Vec<String>>>>,
}

impl ScriptedReviewer {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: Arc::new(AtomicUsize::new(0)),
            shown: Arc::default(),
        }
    }
}

impl Reviewer for ScriptedReviewer {
    fn mode(&self) -> ReviewMode {
        ReviewMode::Interactive
    }

    fn confirm(&mut self, courses: &[&CourseRecord]) -> io::Result<bool> {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.shown
            .lock()
            .unwrap()
            .push(courses.iter().map(|c| c.full_code.clone()).collect());
        Ok(self.answers.pop_front().unwrap_or(false))
    }
}

/// Oracle backed by [`CountingEmbedder`]; returns the embedder call counter
pub fn counting_oracle(crosswalk: RenumberingMap, reviewer: Box<dyn Reviewer>) -> (LinkOracle, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let scorer = SimilarityScorer::new(
        Box::new(CountingEmbedder {
            calls: calls.clone(),
        }),
        Box::new(CourseTextHeuristics),
        Thresholds::default(),
    );
    (LinkOracle::new(crosswalk, scorer, reviewer), calls)
}

/// Oracle whose embedding service fails on first use
pub fn failing_oracle(reviewer: Box<dyn Reviewer>) -> LinkOracle {
    let scorer = SimilarityScorer::new(
        Box::new(FailingEmbedder),
        Box::new(CourseTextHeuristics),
        Thresholds::default(),
    );
    LinkOracle::new(RenumberingMap::empty(), scorer, reviewer)
}
