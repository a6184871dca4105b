//! Similarity scoring for course pairs
//!
//! Two independent measures:
//! - **Title distance ratio**: Levenshtein distance divided by the average title
//!   length (so `2 * d / (len_a + len_b)`); 0.0 when either title is missing.
//! - **Semantic similarity**: sentence-aligned cosine similarity of embeddings
//!   (see [`semantic`]).
//!
//! Exclusion heuristics can veto either kind of match.
//!
//! The title signal fires when the ratio is strictly *above* the configured
//! threshold (0.8). Under the usual reading of an edit-distance ratio that
//! means very different titles; the comparator is kept literally as the
//! catalog tooling has always applied it.

pub mod embedder;
pub mod heuristics;
pub mod semantic;

pub use embedder::{EmbeddingError, HttpEmbedder, SentenceEmbedder};
pub use heuristics::{CourseTextHeuristics, ExclusionHeuristics};

use lineage_common::config::Thresholds;
use lineage_common::CourseRecord;
use std::collections::HashMap;
use tracing::debug;

/// `2 * levenshtein(a, b) / (len(a) + len(b))`, or 0.0 if either title is missing
pub fn title_distance_ratio(title_a: Option<&str>, title_b: Option<&str>) -> f64 {
    let (Some(a), Some(b)) = (title_a, title_b) else {
        return 0.0;
    };
    let total_len = a.chars().count() + b.chars().count();
    if total_len == 0 {
        return 0.0;
    }
    2.0 * strsim::levenshtein(a, b) as f64 / total_len as f64
}

/// Scores course text pairs; caches sentence embeddings for the run
pub struct SimilarityScorer {
    embedder: Box<dyn SentenceEmbedder>,
    heuristics: Box<dyn ExclusionHeuristics>,
    thresholds: Thresholds,
    embedding_cache: HashMap<String, Vec<f32>>,
}

impl SimilarityScorer {
    pub fn new(
        embedder: Box<dyn SentenceEmbedder>,
        heuristics: Box<dyn ExclusionHeuristics>,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            embedder,
            heuristics,
            thresholds,
            embedding_cache: HashMap::new(),
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Semantic similarity of two texts in `[0.0, 1.0]`; empty texts score 0.0
    pub async fn semantic_similarity(
        &mut self,
        text_a: &str,
        text_b: &str,
    ) -> Result<f64, EmbeddingError> {
        let sentences_a = semantic::split_sentences(text_a);
        let sentences_b = semantic::split_sentences(text_b);
        if sentences_a.is_empty() || sentences_b.is_empty() {
            return Ok(0.0);
        }

        self.ensure_embedded(&sentences_a, &sentences_b).await?;

        let lookup = |sentences: &[String]| -> Vec<Vec<f32>> {
            sentences
                .iter()
                .map(|s| self.embedding_cache.get(s).cloned().unwrap_or_default())
                .collect()
        };
        let matrix = semantic::similarity_matrix(&lookup(&sentences_a), &lookup(&sentences_b));
        Ok(semantic::best_diagonal_mean(&matrix))
    }

    /// Embed every sentence not yet cached, in one request
    async fn ensure_embedded(
        &mut self,
        sentences_a: &[String],
        sentences_b: &[String],
    ) -> Result<(), EmbeddingError> {
        let mut missing: Vec<String> = Vec::new();
        for sentence in sentences_a.iter().chain(sentences_b) {
            if !self.embedding_cache.contains_key(sentence) && !missing.contains(sentence) {
                missing.push(sentence.clone());
            }
        }
        if missing.is_empty() {
            return Ok(());
        }

        let vectors = self.embedder.embed(&missing).await?;
        if vectors.len() != missing.len() {
            return Err(EmbeddingError::DimensionMismatch {
                expected: missing.len(),
                actual: vectors.len(),
            });
        }
        self.embedding_cache.extend(missing.into_iter().zip(vectors));
        Ok(())
    }

    /// True if the two courses look like the same course
    ///
    /// Either the title signal fires and the title heuristics don't veto, or
    /// both description and title semantic similarity clear the threshold and
    /// the description heuristics don't veto.
    pub async fn similar_courses(
        &mut self,
        course_a: &CourseRecord,
        course_b: &CourseRecord,
    ) -> Result<bool, EmbeddingError> {
        let title_a = course_a.title.as_deref();
        let title_b = course_b.title.as_deref();

        let ratio = title_distance_ratio(title_a, title_b);
        if ratio > self.thresholds.title_distance
            && !self
                .heuristics
                .veto_titles(title_a.unwrap_or_default(), title_b.unwrap_or_default())
        {
            debug!(a = %course_a, b = %course_b, ratio, "Title signal fired");
            return Ok(true);
        }

        let description_a = course_a.description.as_deref().unwrap_or_default();
        let description_b = course_b.description.as_deref().unwrap_or_default();

        let description_similarity = self.semantic_similarity(description_a, description_b).await?;
        if description_similarity <= self.thresholds.semantic {
            return Ok(false);
        }

        let title_similarity = self
            .semantic_similarity(title_a.unwrap_or_default(), title_b.unwrap_or_default())
            .await?;
        if title_similarity <= self.thresholds.semantic {
            return Ok(false);
        }

        debug!(
            a = %course_a,
            b = %course_b,
            description_similarity,
            title_similarity,
            "Semantic signal fired"
        );
        Ok(!self.heuristics.veto_descriptions(description_a, description_b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Maps each sentence to a one-hot vector by its first keyword
    struct KeywordEmbedder {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SentenceEmbedder for KeywordEmbedder {
        async fn embed(&self, sentences: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(sentences
                .iter()
                .map(|s| {
                    let mut v = vec![0.0f32; 4];
                    let idx = if s.contains("program") {
                        0
                    } else if s.contains("data") {
                        1
                    } else if s.contains("logic") {
                        2
                    } else {
                        3
                    };
                    v[idx] = 1.0;
                    v
                })
                .collect())
        }
    }

    fn scorer() -> (SimilarityScorer, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let scorer = SimilarityScorer::new(
            Box::new(KeywordEmbedder {
                calls: calls.clone(),
            }),
            Box::new(CourseTextHeuristics),
            Thresholds::default(),
        );
        (scorer, calls)
    }

    #[test]
    fn test_title_distance_ratio_values() {
        assert_eq!(title_distance_ratio(Some("Robotics"), Some("Robotics")), 0.0);
        // "kitten" → "sitting": distance 3, lengths 6 + 7
        let ratio = title_distance_ratio(Some("kitten"), Some("sitting"));
        assert!((ratio - 6.0 / 13.0).abs() < 1e-9);
        assert_eq!(title_distance_ratio(None, Some("Robotics")), 0.0);
        assert_eq!(title_distance_ratio(Some(""), Some("")), 0.0);
    }

    #[tokio::test]
    async fn test_title_signal_fires_above_ratio_threshold_as_written() {
        // Literal comparator: a *large* distance ratio fires the title signal,
        // identical titles do not.
        let (mut scorer, calls) = scorer();
        let a = CourseRecord::new(1, "2019A", "CIS", "120", 1).with_title("Programming Languages");
        let b = CourseRecord::new(2, "2020A", "CIS", "1200", 2).with_title("Data Structures");
        assert!(title_distance_ratio(a.title.as_deref(), b.title.as_deref()) > 0.8);
        assert!(scorer.similar_courses(&a, &b).await.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 0, "Title signal short-circuits embeddings");
    }

    #[tokio::test]
    async fn test_vetoed_title_signal_falls_through_to_semantic() {
        let (mut scorer, calls) = scorer();
        let a = CourseRecord::new(1, "2019A", "CIS", "120", 1)
            .with_title("Calculus I")
            .with_description("Learn to program.");
        let b = CourseRecord::new(2, "2020A", "CIS", "1200", 2)
            .with_title("Advanced Robotics II")
            .with_description("Learn to program.");
        assert!(title_distance_ratio(a.title.as_deref(), b.title.as_deref()) > 0.8);

        // Numerals differ, so only the semantic signal can match
        assert!(scorer.similar_courses(&a, &b).await.unwrap());
        assert!(calls.load(Ordering::SeqCst) >= 1);

        let c = b.clone().with_description("Formal logic.");
        assert!(!scorer.similar_courses(&a, &c).await.unwrap());
    }

    #[tokio::test]
    async fn test_identical_titles_fall_through_to_semantic() {
        let (mut scorer, calls) = scorer();
        let a = CourseRecord::new(1, "2019A", "CIS", "120", 1)
            .with_title("Programming")
            .with_description("Learn to program. Study data.");
        let b = CourseRecord::new(2, "2020A", "CIS", "1200", 2)
            .with_title("Programming")
            .with_description("Learn to program. Study data.");
        assert!(scorer.similar_courses(&a, &b).await.unwrap());
        assert!(calls.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_semantic_mismatch_is_not_similar() {
        let (mut scorer, _) = scorer();
        let a = CourseRecord::new(1, "2019A", "CIS", "120", 1)
            .with_title("Programming")
            .with_description("Learn to program.");
        let b = CourseRecord::new(2, "2020A", "PHIL", "1200", 2)
            .with_title("Programming")
            .with_description("Formal logic.");
        assert!(!scorer.similar_courses(&a, &b).await.unwrap());
    }

    #[tokio::test]
    async fn test_description_veto_blocks_semantic_match() {
        let (mut scorer, _) = scorer();
        let a = CourseRecord::new(1, "2019A", "CIS", "120", 1)
            .with_title("Programming")
            .with_description("A continuation of program design.");
        let b = CourseRecord::new(2, "2020A", "CIS", "1200", 2)
            .with_title("Programming")
            .with_description("Program design from scratch.");
        assert!(!scorer.similar_courses(&a, &b).await.unwrap());
    }

    #[tokio::test]
    async fn test_semantic_similarity_aligns_extra_leading_sentence() {
        let (mut scorer, _) = scorer();
        let score = scorer
            .semantic_similarity("Programs. Data.", "Welcome. Programs. Data.")
            .await
            .unwrap();
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_embeddings_are_cached_across_calls() {
        let (mut scorer, calls) = scorer();
        scorer.semantic_similarity("Programs.", "Data.").await.unwrap();
        scorer.semantic_similarity("Data.", "Programs.").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_text_scores_zero_without_embedding() {
        let (mut scorer, calls) = scorer();
        assert_eq!(scorer.semantic_similarity("", "Programs.").await.unwrap(), 0.0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
