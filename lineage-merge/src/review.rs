//! Human-in-the-loop review
//!
//! A [`Reviewer`] is asked whether a group of course records should be linked.
//! Interactive runs prompt on the console; batch runs never link and keep an
//! audit log of what they were asked instead.

use crate::types::PossibleLink;
use lineage_common::CourseRecord;
use std::io::{self, BufRead, Write};
use tracing::info;

/// How a reviewer's "no" should be read by the oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewMode {
    /// A human answered: "no" means the courses are not linked
    Interactive,
    /// Nobody answered: "no" means the question is still open
    Batch,
}

pub trait Reviewer {
    fn mode(&self) -> ReviewMode;

    /// Should these courses be linked?
    fn confirm(&mut self, courses: &[&CourseRecord]) -> io::Result<bool>;

    /// Drain any possible links recorded for audit
    fn take_audit_log(&mut self) -> Vec<PossibleLink> {
        Vec::new()
    }
}

/// Prompts on a console; only `y`/`Y` counts as yes
pub struct ConsoleReviewer<R, W> {
    input: R,
    output: W,
    extra_newlines: bool,
}

impl<R: BufRead, W: Write> ConsoleReviewer<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            extra_newlines: true,
        }
    }

    /// Skip the blank lines printed after each answer
    pub fn compact(mut self) -> Self {
        self.extra_newlines = false;
        self
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Reviewer for ConsoleReviewer<R, W> {
    fn mode(&self) -> ReviewMode {
        ReviewMode::Interactive
    }

    fn confirm(&mut self, courses: &[&CourseRecord]) -> io::Result<bool> {
        writeln!(self.output, "\n\n============>\n")?;
        let rendered: Vec<String> = courses.iter().map(|c| c.full_str()).collect();
        writeln!(self.output, "{}", rendered.join("\n"))?;
        writeln!(self.output, "\n<============")?;
        write!(
            self.output,
            "Should the above {} courses be linked? (y/N) ",
            courses.len()
        )?;
        self.output.flush()?;

        let mut answer = String::new();
        self.input.read_line(&mut answer)?;

        if self.extra_newlines {
            writeln!(self.output, "\n\n")?;
        }
        Ok(answer.trim().eq_ignore_ascii_case("y"))
    }
}

/// Batch-mode reviewer: never links, records every question for audit
#[derive(Debug, Default)]
pub struct AuditReviewer {
    entries: Vec<PossibleLink>,
}

impl AuditReviewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[PossibleLink] {
        &self.entries
    }
}

impl Reviewer for AuditReviewer {
    fn mode(&self) -> ReviewMode {
        ReviewMode::Batch
    }

    fn confirm(&mut self, courses: &[&CourseRecord]) -> io::Result<bool> {
        if let [course_a, course_b] = courses {
            info!("Found possible link between {} and {}", course_a, course_b);
            self.entries.push(PossibleLink::between(course_a, course_b));
        } else {
            info!(count = courses.len(), "Declining unattended confirmation");
        }
        Ok(false)
    }

    fn take_audit_log(&mut self) -> Vec<PossibleLink> {
        std::mem::take(&mut self.entries)
    }
}
