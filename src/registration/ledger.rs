use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    eligibility::EligibilityDecision,
    error::{Result, StandingError},
    records::grade::validate_id,
    registration::clock::{Clock, SystemClock},
    storage::{split_fields, LedgerFile},
};

pub const REGISTRATION_HEADER: &str = "StudentID|Registered|RegisteredAt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RegistrationState {
    Unregistered,
    Registered,
}

/// One row per student. When a file holds several, the last one wins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistrationRow {
    pub student_id: String,
    pub registered: bool,
    pub registered_at: Option<DateTime<Utc>>,
}

impl RegistrationRow {
    fn matches(&self, student_id: &str) -> bool {
        self.student_id.eq_ignore_ascii_case(student_id.trim())
    }

    fn to_line(&self) -> String {
        if self.registered {
            let stamp = self
                .registered_at
                .map(|at| at.to_rfc3339())
                .unwrap_or_default();
            format!("{}|YES|{}", self.student_id, stamp)
        } else {
            format!("{}|NO|", self.student_id)
        }
    }

    fn from_line(line: &str) -> Result<Self> {
        let fields = split_fields(line);
        let (student_id, flag, stamp) = match fields.as_slice() {
            [id, flag] => (*id, *flag, ""),
            [id, flag, stamp] => (*id, *flag, *stamp),
            _ => {
                return Err(StandingError::Validation(format!(
                    "expected 3 fields, found {}",
                    fields.len()
                )))
            }
        };
        validate_id("student ID", student_id)?;

        let registered = match flag.to_ascii_uppercase().as_str() {
            "YES" => true,
            "NO" => false,
            other => {
                return Err(StandingError::Validation(format!(
                    "registered flag must be YES or NO, got '{}'",
                    other
                )))
            }
        };

        let registered_at = if registered && !stamp.is_empty() {
            match DateTime::parse_from_rfc3339(stamp) {
                Ok(at) => Some(at.with_timezone(&Utc)),
                Err(e) => {
                    // the flag is what gates registration, keep it
                    warn!("Unreadable registration time '{}' for {}: {}", stamp, student_id, e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            student_id: student_id.to_string(),
            registered,
            registered_at,
        })
    }
}

/// Registration flags with a one-way UNREGISTERED -> REGISTERED transition.
///
/// Like the grade ledger, every write rewrites the whole file and assumes
/// a single writer.
pub struct RegistrationLedger {
    ledger: LedgerFile,
    clock: Box<dyn Clock>,
}

impl RegistrationLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_clock(path, Box::new(SystemClock))
    }

    pub fn with_clock(path: impl Into<PathBuf>, clock: Box<dyn Clock>) -> Self {
        Self {
            ledger: LedgerFile::new(path, Some(REGISTRATION_HEADER)),
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        self.ledger.path()
    }

    pub fn init(&self) -> Result<bool> {
        self.ledger.ensure_exists()
    }

    pub fn rows(&self) -> Vec<RegistrationRow> {
        self.ledger
            .read_body()
            .into_iter()
            .filter_map(|(line_no, line)| match RegistrationRow::from_line(&line) {
                Ok(row) => Some(row),
                Err(e) => {
                    warn!(
                        "Skipping malformed registration at {}:{}: {}",
                        self.ledger.path().display(),
                        line_no,
                        e
                    );
                    None
                }
            })
            .collect()
    }

    /// Latest row written for `student_id`.
    pub fn row(&self, student_id: &str) -> Option<RegistrationRow> {
        self.rows().into_iter().rev().find(|row| row.matches(student_id))
    }

    pub fn is_registered(&self, student_id: &str) -> bool {
        self.row(student_id).map(|row| row.registered).unwrap_or(false)
    }

    pub fn state(&self, student_id: &str) -> RegistrationState {
        if self.is_registered(student_id) {
            RegistrationState::Registered
        } else {
            RegistrationState::Unregistered
        }
    }

    pub fn registered_students(&self) -> Vec<String> {
        let rows = self.rows();
        let mut ids: Vec<String> = Vec::new();
        for row in rows.iter().filter(|row| row.registered) {
            if latest_in(&rows, &row.student_id).is_some_and(|r| r.registered)
                && !ids.iter().any(|id| id.eq_ignore_ascii_case(&row.student_id))
            {
                ids.push(row.student_id.clone());
            }
        }
        ids
    }

    /// Register `student_id` if `decision` says ELIGIBLE and the student is
    /// not registered yet. Any other case fails without touching the file.
    pub fn register_if_eligible(
        &self,
        student_id: &str,
        decision: &EligibilityDecision,
    ) -> Result<RegistrationRow> {
        validate_id("student ID", student_id)?;
        let student_id = student_id.trim();

        if !decision.student_id.eq_ignore_ascii_case(student_id) {
            return Err(StandingError::Validation(format!(
                "decision for {} cannot register {}",
                decision.student_id, student_id
            )));
        }

        if !decision.is_eligible() {
            info!("Registration refused for {}: {}", student_id, decision.status);
            return Err(StandingError::NotEligible(decision.reason.clone()));
        }

        let body = self.ledger.load_for_update()?;
        let parsed: Vec<Option<RegistrationRow>> = body
            .iter()
            .map(|(_, line)| RegistrationRow::from_line(line).ok())
            .collect();
        if latest_in(parsed.iter().flatten(), student_id).is_some_and(|r| r.registered) {
            return Err(StandingError::AlreadyRegistered(student_id.to_string()));
        }

        let row = RegistrationRow {
            student_id: student_id.to_string(),
            registered: true,
            registered_at: Some(self.clock.now()),
        };

        // the first matching row is replaced and later ones dropped
        // unrelated lines are written back verbatim
        let mut lines = Vec::with_capacity(body.len() + 1);
        let mut replaced = false;
        for ((_, line), existing) in body.into_iter().zip(parsed) {
            match existing {
                Some(existing) if existing.matches(student_id) => {
                    if !replaced {
                        lines.push(row.to_line());
                        replaced = true;
                    }
                }
                _ => lines.push(line),
            }
        }
        if !replaced {
            lines.push(row.to_line());
        }

        self.ledger.rewrite(&lines)?;

        info!("Registered {} for the next level", student_id);
        Ok(row)
    }
}

fn latest_in<'a>(
    rows: impl IntoIterator<Item = &'a RegistrationRow>,
    student_id: &str,
) -> Option<&'a RegistrationRow> {
    rows.into_iter().filter(|row| row.matches(student_id)).last()
}
