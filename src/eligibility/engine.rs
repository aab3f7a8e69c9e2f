use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

use crate::{catalogue::CreditTable, records::LatestGrades};

/// Minimum CGPA required to progress.
pub const MIN_CGPA: f64 = 2.0;
/// Maximum number of failed courses allowed to progress.
pub const MAX_FAILED: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub min_cgpa: f64,
    pub max_failed: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_cgpa: MIN_CGPA,
            max_failed: MAX_FAILED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EligibilityStatus {
    Eligible,
    NotEligible,
    /// No resolvable grades yet, so there is no CGPA to judge.
    PendingResults,
}

impl fmt::Display for EligibilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EligibilityStatus::Eligible => write!(f, "ELIGIBLE"),
            EligibilityStatus::NotEligible => write!(f, "NOT_ELIGIBLE"),
            EligibilityStatus::PendingResults => write!(f, "PENDING_RESULTS"),
        }
    }
}

/// Derived on every request and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibilityDecision {
    pub student_id: String,
    pub cgpa: Option<f64>,
    pub failed_courses: usize,
    pub status: EligibilityStatus,
    pub reason: String,
}

impl EligibilityDecision {
    pub fn is_eligible(&self) -> bool {
        self.status == EligibilityStatus::Eligible
    }
}

/// Credit-weighted grade point average over the latest-attempt set.
///
/// Grades for courses missing from `credits` are left out. Returns `None`
/// when no credits remain.
pub fn compute_cgpa(latest: &LatestGrades, credits: &CreditTable) -> Option<f64> {
    let mut weighted_points = 0.0;
    let mut total_credits: u32 = 0;

    for grade in latest.values() {
        match credits.get(&grade.course_id) {
            Some(course_credits) => {
                weighted_points += grade.grade_point() * f64::from(course_credits);
                total_credits += course_credits;
            }
            None => warn!(
                "No credit data for {}, leaving it out of {}'s CGPA",
                grade.course_id, grade.student_id
            ),
        }
    }

    if total_credits == 0 {
        None
    } else {
        Some(weighted_points / f64::from(total_credits))
    }
}

/// Pure decision function over a student's latest grades.
#[derive(Debug, Clone, Default)]
pub struct EligibilityEngine {
    thresholds: Thresholds,
}

impl EligibilityEngine {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn decide(
        &self,
        student_id: &str,
        latest: &LatestGrades,
        credits: &CreditTable,
    ) -> EligibilityDecision {
        let cgpa = compute_cgpa(latest, credits);
        let failed_courses = latest.values().filter(|g| g.letter.is_failing()).count();
        let failed_ok = failed_courses <= self.thresholds.max_failed;

        let (status, cgpa_clause) = match cgpa {
            None => (
                EligibilityStatus::PendingResults,
                "CGPA unavailable: no graded courses with credit data.".to_string(),
            ),
            Some(value) => {
                let cgpa_ok = value >= self.thresholds.min_cgpa;
                let clause = if cgpa_ok {
                    format!(
                        "CGPA {:.2} meets the minimum of {:.2}.",
                        value, self.thresholds.min_cgpa
                    )
                } else {
                    format!(
                        "CGPA {:.2} is below the minimum of {:.2}.",
                        value, self.thresholds.min_cgpa
                    )
                };
                let status = if cgpa_ok && failed_ok {
                    EligibilityStatus::Eligible
                } else {
                    EligibilityStatus::NotEligible
                };
                (status, clause)
            }
        };

        let failed_clause = format!(
            "{} failed {} {} the maximum of {}.",
            failed_courses,
            if failed_courses == 1 { "course" } else { "courses" },
            if failed_ok { "is within" } else { "exceeds" },
            self.thresholds.max_failed
        );

        let verdict = match status {
            EligibilityStatus::Eligible => "Eligible to progress to the next level.",
            EligibilityStatus::NotEligible => "Not eligible to progress to the next level.",
            EligibilityStatus::PendingResults => "Eligibility pending results.",
        };

        debug!(
            "Decision for {}: {} (cgpa {:?}, {} failed)",
            student_id, status, cgpa, failed_courses
        );

        EligibilityDecision {
            student_id: student_id.trim().to_string(),
            cgpa,
            failed_courses,
            status,
            reason: format!("{} {} {}", cgpa_clause, failed_clause, verdict),
        }
    }
}
