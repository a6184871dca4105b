//! Link oracle
//!
//! Classifies an ordered pair of course records (older, newer) as
//! DEFINITE / POSSIBLE / NO:
//! 1. same course identity (full code or cross-listed sibling) → DEFINITE
//! 2. direct crosswalk link from the older code to the newer one → DEFINITE
//! 3. same semester → NO
//! 4. exactly one side graduate-coded → NO
//! 5. similar texts → POSSIBLE, escalated to the reviewer; otherwise NO
//!
//! An interactive "yes" promotes POSSIBLE to DEFINITE and any other answer
//! demotes it to NO. In batch mode POSSIBLE stays POSSIBLE, which the merge
//! engine never links across.

use crate::crosswalk::RenumberingMap;
use crate::error::{MergeError, MergeResult};
use crate::review::{ReviewMode, Reviewer};
use crate::similarity::SimilarityScorer;
use crate::types::{CandidateLink, LinkDecision, PossibleLink};
use lineage_common::CourseRecord;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Per-run memo of oracle decisions and rejected boundary pairs
///
/// Owned by one merge run and dropped with it.
#[derive(Debug, Default)]
pub struct DecisionCache {
    decisions: HashMap<CandidateLink, LinkDecision>,
    do_not_link: HashSet<CandidateLink>,
}

impl DecisionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decision(&self, link: &CandidateLink) -> Option<LinkDecision> {
        self.decisions.get(link).copied()
    }

    pub fn is_blocked(&self, link: &CandidateLink) -> bool {
        self.do_not_link.contains(link)
    }

    pub fn block(&mut self, link: CandidateLink) {
        self.do_not_link.insert(link);
    }

    pub fn blocked_count(&self) -> usize {
        self.do_not_link.len()
    }
}

/// Decides whether two course records belong to the same lineage
pub struct LinkOracle {
    crosswalk: RenumberingMap,
    scorer: SimilarityScorer,
    reviewer: Box<dyn Reviewer>,
    similarity_checks: usize,
    prompts: usize,
}

impl LinkOracle {
    pub fn new(
        crosswalk: RenumberingMap,
        scorer: SimilarityScorer,
        reviewer: Box<dyn Reviewer>,
    ) -> Self {
        Self {
            crosswalk,
            scorer,
            reviewer,
            similarity_checks: 0,
            prompts: 0,
        }
    }

    /// Pairs that reached similarity scoring so far
    pub fn similarity_checks(&self) -> usize {
        self.similarity_checks
    }

    /// Interactive prompts shown so far
    pub fn prompts(&self) -> usize {
        self.prompts
    }

    /// Drain the reviewer's possible-link audit log
    pub fn take_audit_log(&mut self) -> Vec<PossibleLink> {
        self.reviewer.take_audit_log()
    }

    /// Memoized [`Self::classify`]: a pair is evaluated (and prompted) at most once per run
    pub async fn decide(
        &mut self,
        older: &CourseRecord,
        newer: &CourseRecord,
        cache: &mut DecisionCache,
    ) -> MergeResult<LinkDecision> {
        let link = CandidateLink::new(older.id, newer.id);
        if let Some(decision) = cache.decision(&link) {
            return Ok(decision);
        }
        let decision = self.classify(older, newer).await?;
        cache.decisions.insert(link, decision);
        Ok(decision)
    }

    /// Evaluate one pair without memoization
    pub async fn classify(
        &mut self,
        older: &CourseRecord,
        newer: &CourseRecord,
    ) -> MergeResult<LinkDecision> {
        let decision = if let Some(shortcut) = self.shortcut(older, newer) {
            shortcut
        } else if self.similar(older, newer).await? {
            self.escalate(older, newer)?
        } else {
            LinkDecision::No
        };

        debug!(older = %older, newer = %newer, %decision, "Classified candidate link");
        Ok(decision)
    }

    /// Steps that decide without looking at course text
    fn shortcut(&self, older: &CourseRecord, newer: &CourseRecord) -> Option<LinkDecision> {
        if older.is_same_course(newer) {
            return Some(LinkDecision::Definite);
        }
        if self.crosswalk.links(&older.full_code, &newer.full_code) {
            return Some(LinkDecision::Definite);
        }
        if older.semester == newer.semester {
            return Some(LinkDecision::No);
        }
        let boundary = self.scorer.thresholds().graduate_code_boundary.as_str();
        if (older.code.as_str() < boundary) != (newer.code.as_str() < boundary) {
            return Some(LinkDecision::No);
        }
        None
    }

    async fn similar(&mut self, older: &CourseRecord, newer: &CourseRecord) -> MergeResult<bool> {
        self.similarity_checks += 1;
        Ok(self.scorer.similar_courses(older, newer).await?)
    }

    fn escalate(&mut self, older: &CourseRecord, newer: &CourseRecord) -> MergeResult<LinkDecision> {
        let mode = self.reviewer.mode();
        if mode == ReviewMode::Interactive {
            self.prompts += 1;
        }
        let confirmed = self
            .reviewer
            .confirm(&[older, newer])
            .map_err(MergeError::Review)?;

        Ok(match (confirmed, mode) {
            (true, _) => LinkDecision::Definite,
            (false, ReviewMode::Interactive) => LinkDecision::No,
            (false, ReviewMode::Batch) => LinkDecision::Possible,
        })
    }
}
