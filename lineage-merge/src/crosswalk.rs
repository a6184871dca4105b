//! Renumbering map (crosswalk) loader
//!
//! Parses the registrar's crosswalk of old course codes to new course codes.
//! Rows are grouped by old full code:
//! - exactly one distinct destination → `direct` link, applied automatically
//! - more than one distinct destination → `branch` link, kept for inspection only

use crate::error::MergeResult;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// One crosswalk row: an old department+number mapped to a new one
#[derive(Debug, Clone, Deserialize)]
pub struct CrosswalkRow {
    #[serde(rename = "SRS_SUBJ_CODE")]
    pub old_department: String,
    #[serde(rename = "SRS_COURSE_NUMBER")]
    pub old_number: String,
    #[serde(rename = "NGSS_SUBJECT")]
    pub new_department: String,
    #[serde(rename = "NGSS_COURSE_NUMBER")]
    pub new_number: String,
}

impl CrosswalkRow {
    pub fn old_full_code(&self) -> String {
        format!("{}-{}", self.old_department.trim(), self.old_number.trim())
    }

    pub fn new_full_code(&self) -> String {
        format!("{}-{}", self.new_department.trim(), self.new_number.trim())
    }
}

/// Derived, read-only indexes over the crosswalk
#[derive(Debug, Clone, Default)]
pub struct RenumberingMap {
    direct: HashMap<String, String>,
    branch: BTreeMap<String, Vec<String>>,
}

impl RenumberingMap {
    /// Empty map (no crosswalk supplied)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a delimiter-separated crosswalk file with a header row
    pub fn from_path(path: &Path, delimiter: u8) -> MergeResult<Self> {
        let reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_path(path)?;
        let map = Self::from_csv(reader)?;
        info!(
            path = %path.display(),
            direct = map.direct.len(),
            branched = map.branch.len(),
            "Loaded crosswalk"
        );
        Ok(map)
    }

    /// Parse a crosswalk from any reader
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> MergeResult<Self> {
        let reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_reader(reader);
        Self::from_csv(reader)
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> MergeResult<Self> {
        let mut rows = Vec::new();
        for result in reader.deserialize::<CrosswalkRow>() {
            rows.push(result?);
        }
        Ok(Self::from_rows(rows))
    }

    /// Group rows by old code into direct and branch indexes
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = CrosswalkRow>,
    {
        let mut destinations: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for row in rows {
            let targets = destinations.entry(row.old_full_code()).or_default();
            let new_code = row.new_full_code();
            if !targets.contains(&new_code) {
                targets.push(new_code);
            }
        }

        let mut map = Self::default();
        for (old_code, mut targets) in destinations {
            if targets.len() == 1 {
                map.direct.insert(old_code, targets.remove(0));
            } else {
                debug!(old_code = %old_code, destinations = ?targets, "Branched crosswalk entry");
                map.branch.insert(old_code, targets);
            }
        }
        map
    }

    /// Unambiguous destination of `old_code`, if any
    pub fn direct(&self, old_code: &str) -> Option<&str> {
        self.direct.get(old_code).map(String::as_str)
    }

    /// All destinations of a branched `old_code`, if it branched
    pub fn branch(&self, old_code: &str) -> Option<&[String]> {
        self.branch.get(old_code).map(Vec::as_slice)
    }

    /// Branched entries, ordered by old code
    pub fn branches(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.branch.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// True if `old_code` was renumbered directly to `new_code`
    ///
    /// Links only run forward in time: a later offering that carries an old
    /// code does not link back to an earlier one carrying its new code.
    pub fn links(&self, old_code: &str, new_code: &str) -> bool {
        self.direct(old_code) == Some(new_code)
    }

    pub fn direct_len(&self) -> usize {
        self.direct.len()
    }

    pub fn branch_len(&self) -> usize {
        self.branch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.branch.is_empty()
    }
}
