//! Test Helper Utilities
//!
//! Shared utilities for testing lineage-merge

#![allow(dead_code)]

pub mod db_utils;
pub mod fakes;
pub mod log_capture;

pub use db_utils::{
    assignments, course, create_test_db, crosslisted, most_recent_id, seed_catalog,
    seed_empty_topic, topic_ids, SeedCourse,
};
pub use fakes::{counting_oracle, failing_oracle, ScriptedReviewer};
pub use log_capture::capture_logs;
