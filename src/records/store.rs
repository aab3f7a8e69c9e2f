use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::{
    error::Result,
    records::grade::Grade,
    storage::LedgerFile,
};

pub const GRADE_HEADER: &str = "StudentID|CourseID|Attempt|Grade";

/// Current grade per course, keyed by upper-cased course ID.
pub type LatestGrades = BTreeMap<String, Grade>;

/// Grade ledger with upsert semantics over (student, course, attempt).
///
/// Each upsert loads the whole file and rewrites it. This is a single-writer
/// store: two processes upserting at the same time can lose one update.
pub struct RecordStore {
    ledger: LedgerFile,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            ledger: LedgerFile::new(path, Some(GRADE_HEADER)),
        }
    }

    pub fn path(&self) -> &Path {
        self.ledger.path()
    }

    /// Create the ledger with its header if it is missing.
    pub fn init(&self) -> Result<bool> {
        self.ledger.ensure_exists()
    }

    /// Insert `grade`, or replace the stored record with the same key in place.
    ///
    /// Every other line, including ones that do not parse, is written back
    /// unchanged.
    pub fn upsert(&self, grade: &Grade) -> Result<()> {
        grade.validate()?;

        let mut lines: Vec<String> = self
            .ledger
            .load_for_update()?
            .into_iter()
            .map(|(_, line)| line)
            .collect();
        let existing = lines
            .iter()
            .position(|line| matches!(Grade::from_line(line), Ok(stored) if stored.same_key(grade)));

        match existing {
            Some(idx) => {
                debug!(
                    "Replacing {} attempt {} for {}: '{}' -> {}",
                    grade.course_id, grade.attempt, grade.student_id, lines[idx], grade.letter
                );
                lines[idx] = grade.to_line();
            }
            None => lines.push(grade.to_line()),
        }

        self.ledger.rewrite(&lines)?;

        info!(
            "Recorded {} for {} in {} (attempt {})",
            grade.letter, grade.student_id, grade.course_id, grade.attempt
        );
        Ok(())
    }

    /// Every well-formed record in file order. Malformed lines are skipped.
    pub fn read_all(&self) -> Vec<Grade> {
        self.ledger
            .read_body()
            .into_iter()
            .filter_map(|(line_no, line)| match Grade::from_line(&line) {
                Ok(grade) => Some(grade),
                Err(e) => {
                    warn!(
                        "Skipping malformed grade at {}:{}: {}",
                        self.ledger.path().display(),
                        line_no,
                        e
                    );
                    None
                }
            })
            .collect()
    }

    pub fn by_student(&self, student_id: &str) -> Vec<Grade> {
        self.read_all()
            .into_iter()
            .filter(|grade| grade.belongs_to(student_id))
            .collect()
    }

    /// Highest-numbered attempt for each course the student has taken.
    pub fn latest_attempt_per_course(&self, student_id: &str) -> LatestGrades {
        latest_attempts(self.by_student(student_id))
    }
}

/// Reduce a student's grades to one per course, keeping the maximum attempt.
pub fn latest_attempts(grades: impl IntoIterator<Item = Grade>) -> LatestGrades {
    let mut latest = LatestGrades::new();
    for grade in grades {
        let key = grade.course_id.to_ascii_uppercase();
        match latest.get(&key) {
            Some(current) if current.attempt >= grade.attempt => {}
            _ => {
                latest.insert(key, grade);
            }
        }
    }
    latest
}
