//! Transaction coordinator
//!
//! Runs discovery (or a manual merge) against one SQLite transaction: the
//! snapshot is read, every merge step is applied, and the whole run is either
//! committed or rolled back. Nothing is written until the engine has finished,
//! and a failure anywhere rolls back every step applied so far.

use crate::engine::{plan_manual_merge, MergeEngine};
use crate::error::{MergeError, MergeResult};
use crate::oracle::LinkOracle;
use crate::review::{ReviewMode, Reviewer};
use crate::types::{MergeReport, MergeStep};
use lineage_common::db::topics;
use lineage_common::{CourseRecord, TopicId};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::time::Instant;
use tracing::{debug, info, warn};

/// How a discovery run should finish
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Apply every step, then roll back instead of committing
    pub dry_run: bool,
    /// Show a progress bar over topics
    pub show_progress: bool,
}

/// Result of a manual merge request
#[derive(Debug, Clone, PartialEq)]
pub enum ManualMergeOutcome {
    Merged {
        survivor: TopicId,
        steps: Vec<MergeStep>,
        committed: bool,
    },
    /// The reviewer declined; nothing was written
    Declined,
}

pub struct TransactionCoordinator {
    pool: SqlitePool,
}

impl TransactionCoordinator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Discover and apply merges over every topic as one atomic unit
    pub async fn run_discovery(
        &self,
        oracle: &mut LinkOracle,
        options: RunOptions,
    ) -> MergeResult<MergeReport> {
        let started = Instant::now();
        let mut tx = self.pool.begin().await?;

        let result = Self::discover(&mut tx, oracle, options).await;
        match result {
            Ok(mut report) => {
                report.committed = finish(tx, options.dry_run, started).await?;
                Ok(report)
            }
            Err(e) => {
                abort(tx, &e, started).await;
                Err(e)
            }
        }
    }

    async fn discover(
        tx: &mut Transaction<'static, Sqlite>,
        oracle: &mut LinkOracle,
        options: RunOptions,
    ) -> MergeResult<MergeReport> {
        let snapshot = topics::load_snapshot(&mut **tx).await?;
        let outcome = MergeEngine::new()
            .with_progress(options.show_progress)
            .run(snapshot, oracle)
            .await?;

        apply_steps(&mut **tx, &outcome.report.steps).await?;
        Ok(outcome.report)
    }

    /// Merge an explicit list of topics, folded left to right
    ///
    /// Ids are validated before anything is read: non-integer ids abort with
    /// [`MergeError::InvalidTopicIds`], unknown ids with
    /// [`MergeError::TopicsNotFound`]. With `require_confirmation` the reviewer
    /// is asked once for the whole batch; a batch-mode reviewer is never asked
    /// and the merge is declined.
    pub async fn run_manual(
        &self,
        raw_ids: &[String],
        reviewer: &mut dyn Reviewer,
        require_confirmation: bool,
        dry_run: bool,
    ) -> MergeResult<ManualMergeOutcome> {
        let ids = parse_topic_ids(raw_ids)?;
        if ids.is_empty() {
            return Err(lineage_common::Error::InvalidInput("No topic IDs given".to_string()).into());
        }

        let started = Instant::now();
        let mut tx = self.pool.begin().await?;

        let result = Self::manual(&mut tx, &ids, reviewer, require_confirmation).await;
        match result {
            Ok(Some((survivor, steps))) => {
                let committed = finish(tx, dry_run, started).await?;
                Ok(ManualMergeOutcome::Merged {
                    survivor,
                    steps,
                    committed,
                })
            }
            Ok(None) => {
                tx.rollback().await?;
                info!("Manual merge declined; nothing written");
                Ok(ManualMergeOutcome::Declined)
            }
            Err(e) => {
                abort(tx, &e, started).await;
                Err(e)
            }
        }
    }

    async fn manual(
        tx: &mut Transaction<'static, Sqlite>,
        ids: &[TopicId],
        reviewer: &mut dyn Reviewer,
        require_confirmation: bool,
    ) -> MergeResult<Option<(TopicId, Vec<MergeStep>)>> {
        let snapshot = topics::load_topics(&mut **tx, ids).await?;

        let missing: Vec<TopicId> = ids
            .iter()
            .copied()
            .filter(|id| !snapshot.topics.iter().any(|t| t.id == *id))
            .collect();
        if !missing.is_empty() {
            return Err(MergeError::TopicsNotFound(missing));
        }

        if require_confirmation {
            if reviewer.mode() == ReviewMode::Batch {
                info!(
                    topics = ids.len(),
                    "Manual merge needs confirmation and nobody can answer; declining"
                );
                return Ok(None);
            }
            let courses: Vec<&CourseRecord> = snapshot.courses.iter().collect();
            if !reviewer.confirm(&courses).map_err(MergeError::Review)? {
                return Ok(None);
            }
        }

        let (survivor, steps) = plan_manual_merge(snapshot, ids);
        let Some(survivor) = survivor else {
            return Ok(None);
        };
        apply_steps(&mut **tx, &steps).await?;
        info!(survivor, merged = steps.len(), "Manual merge applied");
        Ok(Some((survivor, steps)))
    }
}

/// Parse manual-merge ids; every non-integer id is reported at once
///
/// Duplicates are dropped, keeping first-seen order.
pub fn parse_topic_ids(raw_ids: &[String]) -> MergeResult<Vec<TopicId>> {
    let mut invalid = Vec::new();
    let mut ids: Vec<TopicId> = Vec::new();

    for raw in raw_ids {
        let trimmed = raw.trim();
        let parsed = if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
            trimmed.parse::<TopicId>().ok()
        } else {
            None
        };
        match parsed {
            Some(id) if !ids.contains(&id) => ids.push(id),
            Some(_) => {}
            None => invalid.push(raw.clone()),
        }
    }

    if invalid.is_empty() {
        Ok(ids)
    } else {
        Err(MergeError::InvalidTopicIds(invalid))
    }
}

/// Write merge steps in order: reassign courses, delete the absorbed topic, update the survivor
pub async fn apply_steps(conn: &mut SqliteConnection, steps: &[MergeStep]) -> MergeResult<()> {
    for step in steps {
        let moved = topics::reassign_courses(conn, step.absorbed, step.survivor).await?;
        let deleted = topics::delete_topic(conn, step.absorbed).await?;
        if deleted == 0 {
            return Err(lineage_common::Error::NotFound(format!(
                "Topic {} vanished during merge",
                step.absorbed
            ))
            .into());
        }
        topics::set_most_recent(conn, step.survivor, step.most_recent_id).await?;
        debug!(
            survivor = step.survivor,
            absorbed = step.absorbed,
            moved,
            "Applied merge step"
        );
    }
    Ok(())
}

/// Commit, or roll back on a dry run; returns whether the run was committed
async fn finish(
    tx: Transaction<'static, Sqlite>,
    dry_run: bool,
    started: Instant,
) -> MergeResult<bool> {
    let held_ms = started.elapsed().as_millis();
    if dry_run {
        tx.rollback().await?;
        info!(held_ms, "Dry run: rolled back all merges");
        Ok(false)
    } else {
        tx.commit().await?;
        info!(held_ms, "Committed merge run");
        Ok(true)
    }
}

async fn abort(tx: Transaction<'static, Sqlite>, error: &MergeError, started: Instant) {
    let held_ms = started.elapsed().as_millis();
    warn!(held_ms, error = %error, "Merge run failed; rolling back");
    if let Err(rollback_error) = tx.rollback().await {
        warn!(error = %rollback_error, "Rollback failed; transaction dropped");
    }
}
