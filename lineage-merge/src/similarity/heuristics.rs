//! Exclusion heuristics
//!
//! Domain rules that veto a match between two course texts despite high
//! surface similarity, e.g. "Calculus I" vs "Calculus II" or
//! "Introduction to Robotics" vs "Advanced Robotics".

use std::collections::BTreeSet;

/// Vetoes for title and description matches (`true` = do not match)
pub trait ExclusionHeuristics: Send + Sync {
    fn veto_titles(&self, title_a: &str, title_b: &str) -> bool;
    fn veto_descriptions(&self, description_a: &str, description_b: &str) -> bool;
}

/// Course-catalog heuristics used by default
#[derive(Debug, Default, Clone)]
pub struct CourseTextHeuristics;

const ROMAN_NUMERALS: &[&str] = &["i", "ii", "iii", "iv", "v", "vi", "vii", "viii", "ix", "x"];
const TERM_WORDS: &[&str] = &["spring", "summer", "fall", "autumn", "winter"];
const CONTINUATION_MARKERS: &[&str] = &[
    "continuation of",
    "second half of",
    "second semester of",
    "sequel to",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Level {
    Introductory,
    Intermediate,
    Advanced,
}

fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Sequence markers: roman numerals and bare numbers ("Calculus II", "Physics 2")
fn sequence_markers(tokens: &[String]) -> BTreeSet<String> {
    tokens
        .iter()
        .filter(|t| ROMAN_NUMERALS.contains(&t.as_str()) || t.chars().all(|c| c.is_ascii_digit()))
        .map(|t| roman_to_arabic(t).unwrap_or_else(|| t.clone()))
        .collect()
}

fn roman_to_arabic(token: &str) -> Option<String> {
    ROMAN_NUMERALS
        .iter()
        .position(|r| *r == token)
        .map(|idx| (idx + 1).to_string())
}

fn levels(tokens: &[String]) -> BTreeSet<Level> {
    tokens
        .iter()
        .filter_map(|t| match t.as_str() {
            "intro" | "introduction" | "introductory" | "elementary" | "beginning" | "basic" => {
                Some(Level::Introductory)
            }
            "intermediate" => Some(Level::Intermediate),
            "advanced" => Some(Level::Advanced),
            _ => None,
        })
        .collect()
}

fn term_markers(tokens: &[String]) -> BTreeSet<String> {
    tokens
        .iter()
        .filter(|t| TERM_WORDS.contains(&t.as_str()))
        .cloned()
        .collect()
}

fn is_continuation(text: &str) -> bool {
    let lower = text.to_lowercase();
    CONTINUATION_MARKERS.iter().any(|m| lower.contains(m))
}

impl ExclusionHeuristics for CourseTextHeuristics {
    fn veto_titles(&self, title_a: &str, title_b: &str) -> bool {
        let (a, b) = (tokens(title_a), tokens(title_b));

        if sequence_markers(&a) != sequence_markers(&b) {
            return true;
        }
        if term_markers(&a) != term_markers(&b) {
            return true;
        }
        let (level_a, level_b) = (levels(&a), levels(&b));
        !level_a.is_empty() && !level_b.is_empty() && level_a != level_b
    }

    fn veto_descriptions(&self, description_a: &str, description_b: &str) -> bool {
        is_continuation(description_a) != is_continuation(description_b)
    }
}
