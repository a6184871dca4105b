//! Lineage merge engine
//!
//! Greedy fixpoint clustering over topics. For the current topic, every other
//! topic is tried in id order. The two timelines are interleaved by semester and
//! each adjacent pair of records that straddles the two topics (a boundary pair)
//! must resolve to DEFINITE for the merge to happen. After a merge, the scan
//! restarts for the merged topic. Passes repeat until one produces no merge.
//!
//! The result depends on enumeration order when more than two topics are
//! mutually near-linkable: the first qualifying partner wins.

use crate::error::MergeResult;
use crate::oracle::{DecisionCache, LinkOracle};
use crate::types::{CandidateLink, LinkDecision, MergeReport, MergeStep};
use indicatif::{ProgressBar, ProgressStyle};
use lineage_common::db::CatalogSnapshot;
use lineage_common::{CourseId, CourseRecord, Topic, TopicId};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// In-memory topics and the course records they own, keyed by id
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    topics: BTreeMap<TopicId, Topic>,
    courses: HashMap<CourseId, CourseRecord>,
}

impl WorkingSet {
    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        Self {
            topics: snapshot.topics.into_iter().map(|t| (t.id, t)).collect(),
            courses: snapshot.courses.into_iter().map(|c| (c.id, c)).collect(),
        }
    }

    /// Topic ids in ascending order
    pub fn topic_ids(&self) -> Vec<TopicId> {
        self.topics.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn contains(&self, id: TopicId) -> bool {
        self.topics.contains_key(&id)
    }

    pub fn topic(&self, id: TopicId) -> Option<&Topic> {
        self.topics.get(&id)
    }

    /// Total course records owned by all topics
    pub fn course_count(&self) -> usize {
        self.topics.values().map(|t| t.course_ids.len()).sum()
    }

    fn has_courses(&self, id: TopicId) -> bool {
        self.topics.get(&id).is_some_and(|t| !t.course_ids.is_empty())
    }

    fn records(&self, id: TopicId) -> impl Iterator<Item = &CourseRecord> {
        self.topics
            .get(&id)
            .into_iter()
            .flat_map(|t| t.course_ids.iter())
            .filter_map(|cid| self.courses.get(cid))
    }

    /// Latest course of a topic by (semester, id)
    pub fn most_recent(&self, id: TopicId) -> Option<&CourseRecord> {
        self.records(id)
            .max_by(|a, b| a.semester.cmp(&b.semester).then(a.id.cmp(&b.id)))
    }

    /// Both topics' records ordered by (semester, topic, course id)
    pub fn timeline(&self, a: TopicId, b: TopicId) -> Vec<&CourseRecord> {
        let mut records: Vec<&CourseRecord> = self.records(a).chain(self.records(b)).collect();
        records.sort_by(|x, y| {
            x.semester
                .cmp(&y.semester)
                .then(x.topic_id.cmp(&y.topic_id))
                .then(x.id.cmp(&y.id))
        });
        records
    }

    /// Fold two topics into one; the topic with the newer most recent course survives
    ///
    /// Ties on semester go to the lower id. Returns `None` if either topic is
    /// missing or both ids are the same.
    pub fn merge(&mut self, a: TopicId, b: TopicId) -> Option<MergeStep> {
        if a == b || !self.contains(a) || !self.contains(b) {
            return None;
        }
        let (survivor, absorbed) = self.pick_survivor(a, b);

        let absorbed_topic = self.topics.remove(&absorbed)?;
        for course_id in &absorbed_topic.course_ids {
            if let Some(course) = self.courses.get_mut(course_id) {
                course.topic_id = survivor;
            }
        }
        if let Some(topic) = self.topics.get_mut(&survivor) {
            topic.course_ids.extend(absorbed_topic.course_ids);
        }

        let most_recent_id = self.most_recent(survivor).map(|c| c.id);
        if let Some(topic) = self.topics.get_mut(&survivor) {
            topic.most_recent_id = most_recent_id;
        }

        Some(MergeStep {
            survivor,
            absorbed,
            most_recent_id,
        })
    }

    fn pick_survivor(&self, a: TopicId, b: TopicId) -> (TopicId, TopicId) {
        let latest = |id| self.most_recent(id).map(|c| c.semester.clone());
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        if latest(high) > latest(low) {
            (high, low)
        } else {
            (low, high)
        }
    }

    pub fn into_topics(self) -> Vec<Topic> {
        self.topics.into_values().collect()
    }
}

/// Adjacent records of a timeline that belong to different topics, as (older, newer)
pub fn boundary_pairs<'a>(timeline: &[&'a CourseRecord]) -> Vec<(&'a CourseRecord, &'a CourseRecord)> {
    timeline
        .windows(2)
        .filter(|w| w[0].topic_id != w[1].topic_id)
        .map(|w| (w[0], w[1]))
        .collect()
}

/// Verdict on one pair of topics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairVerdict {
    Link,
    SameSemesterConflict,
    Rejected,
}

/// Final topics and the report of one discovery run
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub topics: Vec<Topic>,
    pub report: MergeReport,
}

/// Discovery driver; owns the per-run decision cache
pub struct MergeEngine {
    show_progress: bool,
}

impl Default for MergeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeEngine {
    pub fn new() -> Self {
        Self {
            show_progress: false,
        }
    }

    /// Show a progress bar over outer topics
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Run discovery to a fixpoint over the snapshot
    pub async fn run(
        &self,
        snapshot: CatalogSnapshot,
        oracle: &mut LinkOracle,
    ) -> MergeResult<MergeOutcome> {
        let mut working = WorkingSet::from_snapshot(snapshot);
        let mut cache = DecisionCache::new();
        let mut report = MergeReport::default();
        let checks_before = oracle.similarity_checks();
        let prompts_before = oracle.prompts();

        info!(
            topics = working.len(),
            courses = working.course_count(),
            "Starting topic merge discovery"
        );

        let mut pass = 0;
        loop {
            pass += 1;
            let progress = self.progress_bar(working.len(), pass);
            let mut merged_this_pass = 0;

            for outer in working.topic_ids() {
                progress.inc(1);
                if !working.has_courses(outer) {
                    continue;
                }
                let mut current = outer;
                while let Some(step) =
                    Self::scan_partners(&mut working, current, oracle, &mut cache, &mut report)
                        .await?
                {
                    current = step.survivor;
                    merged_this_pass += 1;
                    report.steps.push(step);
                }
            }

            progress.finish_and_clear();
            debug!(pass, merges = merged_this_pass, "Discovery pass complete");
            if merged_this_pass == 0 {
                break;
            }
        }

        report.similarity_checks = oracle.similarity_checks() - checks_before;
        report.prompts = oracle.prompts() - prompts_before;
        report.possible_links = oracle.take_audit_log();

        info!(
            merges = report.merge_count(),
            topics = working.len(),
            do_not_link = cache.blocked_count(),
            "Topic merge discovery finished"
        );

        Ok(MergeOutcome {
            topics: working.into_topics(),
            report,
        })
    }

    /// Try every other topic against `current`; merge the first that links
    async fn scan_partners(
        working: &mut WorkingSet,
        current: TopicId,
        oracle: &mut LinkOracle,
        cache: &mut DecisionCache,
        report: &mut MergeReport,
    ) -> MergeResult<Option<MergeStep>> {
        for other in working.topic_ids() {
            if other == current || !working.has_courses(other) {
                continue;
            }
            match Self::evaluate_pair(working, current, other, oracle, cache).await? {
                PairVerdict::Link => {
                    let step = working.merge(current, other);
                    if let Some(step) = &step {
                        info!(
                            survivor = step.survivor,
                            absorbed = step.absorbed,
                            "Merging topics"
                        );
                    }
                    return Ok(step);
                }
                PairVerdict::SameSemesterConflict => report.same_semester_conflicts += 1,
                PairVerdict::Rejected => report.rejected_pairs += 1,
            }
        }
        Ok(None)
    }

    async fn evaluate_pair(
        working: &WorkingSet,
        a: TopicId,
        b: TopicId,
        oracle: &mut LinkOracle,
        cache: &mut DecisionCache,
    ) -> MergeResult<PairVerdict> {
        let timeline = working.timeline(a, b);
        let boundaries = boundary_pairs(&timeline);

        if boundaries
            .iter()
            .any(|(older, newer)| older.semester == newer.semester && !older.is_same_course(newer))
        {
            return Ok(PairVerdict::SameSemesterConflict);
        }

        for (older, newer) in boundaries {
            let link = CandidateLink::new(older.id, newer.id);
            if cache.is_blocked(&link) {
                return Ok(PairVerdict::Rejected);
            }
            let decision = oracle.decide(older, newer, cache).await?;
            if decision != LinkDecision::Definite {
                debug!(older = %older, newer = %newer, %decision, "Boundary pair blocks merge");
                cache.block(link);
                return Ok(PairVerdict::Rejected);
            }
        }
        Ok(PairVerdict::Link)
    }

    fn progress_bar(&self, len: usize, pass: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb.set_message(format!("pass {}", pass));
        pb
    }
}

/// Merge plan for an explicit list of topics, folded pairwise left to right
///
/// Ids must already be validated against the snapshot; unknown ids are skipped.
pub fn plan_manual_merge(snapshot: CatalogSnapshot, ids: &[TopicId]) -> (Option<TopicId>, Vec<MergeStep>) {
    let mut working = WorkingSet::from_snapshot(snapshot);
    let mut rest = ids.iter().copied();

    let Some(mut survivor) = rest.by_ref().find(|id| working.contains(*id)) else {
        return (None, Vec::new());
    };
    let mut steps = Vec::new();
    for next in rest {
        if !working.contains(next) {
            continue;
        }
        if let Some(step) = working.merge(survivor, next) {
            survivor = step.survivor;
            steps.push(step);
        }
    }
    (Some(survivor), steps)
}
