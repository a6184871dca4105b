//! # Lineage Common Library
//!
//! Shared code for the course lineage tools:
//! - Course catalog models (`CourseRecord`, `Topic`, `Semester`)
//! - Catalog database schema and queries
//! - Configuration loading
//! - Common error type

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use error::{Error, Result};
pub use models::{CourseId, CourseRecord, Semester, Topic, TopicId};
