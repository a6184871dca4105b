//! lineage-merge library interface
//!
//! Course-lineage resolution: decides which per-semester course records are
//! the same underlying course and merges their topics in one atomic run.

pub mod coordinator;
pub mod crosswalk;
pub mod engine;
pub mod error;
pub mod oracle;
pub mod review;
pub mod similarity;
pub mod types;

#[cfg(test)]
mod test_support;

pub use crate::coordinator::{ManualMergeOutcome, RunOptions, TransactionCoordinator};
pub use crate::crosswalk::RenumberingMap;
pub use crate::engine::{MergeEngine, MergeOutcome};
pub use crate::error::{MergeError, MergeResult};
pub use crate::oracle::{DecisionCache, LinkOracle};
pub use crate::review::{AuditReviewer, ConsoleReviewer, ReviewMode, Reviewer};
pub use crate::similarity::SimilarityScorer;
pub use crate::types::{LinkDecision, MergeReport, MergeStep, PossibleLink};
