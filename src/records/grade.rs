use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StandingError};
use crate::storage::FIELD_SEPARATOR;

pub const MIN_ATTEMPT: u8 = 1;
pub const MAX_ATTEMPT: u8 = 3;

/// Letter grades accepted by the grade ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GradeLetter {
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "F")]
    F,
}

impl GradeLetter {
    pub const ALL: [GradeLetter; 8] = [
        GradeLetter::A,
        GradeLetter::AMinus,
        GradeLetter::BPlus,
        GradeLetter::B,
        GradeLetter::CPlus,
        GradeLetter::C,
        GradeLetter::D,
        GradeLetter::F,
    ];

    pub fn grade_point(self) -> f64 {
        match self {
            GradeLetter::A => 4.0,
            GradeLetter::AMinus => 3.7,
            GradeLetter::BPlus => 3.3,
            GradeLetter::B => 3.0,
            GradeLetter::CPlus => 2.3,
            GradeLetter::C => 2.0,
            GradeLetter::D => 1.0,
            GradeLetter::F => 0.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GradeLetter::A => "A",
            GradeLetter::AMinus => "A-",
            GradeLetter::BPlus => "B+",
            GradeLetter::B => "B",
            GradeLetter::CPlus => "C+",
            GradeLetter::C => "C",
            GradeLetter::D => "D",
            GradeLetter::F => "F",
        }
    }

    pub fn is_failing(self) -> bool {
        self == GradeLetter::F
    }
}

impl fmt::Display for GradeLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GradeLetter {
    type Err = StandingError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_uppercase();
        GradeLetter::ALL
            .iter()
            .copied()
            .find(|letter| letter.as_str() == wanted)
            .ok_or_else(|| StandingError::Validation(format!("unrecognized grade letter '{}'", s.trim())))
    }
}

/// One attempt at a course. At most one exists per (student, course, attempt).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub student_id: String,
    pub course_id: String,
    pub attempt: u8,
    pub letter: GradeLetter,
}

impl Grade {
    pub fn new(
        student_id: impl Into<String>,
        course_id: impl Into<String>,
        attempt: u8,
        letter: GradeLetter,
    ) -> Result<Self> {
        let grade = Self {
            student_id: student_id.into().trim().to_string(),
            course_id: course_id.into().trim().to_string(),
            attempt,
            letter,
        };
        grade.validate()?;
        Ok(grade)
    }

    /// Build a grade from raw text fields, as typed by a user or read from a file.
    pub fn parse(student_id: &str, course_id: &str, attempt: &str, letter: &str) -> Result<Self> {
        let attempt: u8 = attempt
            .trim()
            .parse()
            .map_err(|_| StandingError::Validation(format!("attempt '{}' is not a number", attempt.trim())))?;
        let letter: GradeLetter = letter.parse()?;
        Self::new(student_id, course_id, attempt, letter)
    }

    pub fn validate(&self) -> Result<()> {
        validate_id("student ID", &self.student_id)?;
        validate_id("course ID", &self.course_id)?;
        if !(MIN_ATTEMPT..=MAX_ATTEMPT).contains(&self.attempt) {
            return Err(StandingError::Validation(format!(
                "attempt must be between {} and {}, got {}",
                MIN_ATTEMPT, MAX_ATTEMPT, self.attempt
            )));
        }
        Ok(())
    }

    pub fn grade_point(&self) -> f64 {
        self.letter.grade_point()
    }

    pub fn belongs_to(&self, student_id: &str) -> bool {
        self.student_id.eq_ignore_ascii_case(student_id.trim())
    }

    /// Same (student, course, attempt) key, IDs compared case-insensitively.
    pub fn same_key(&self, other: &Grade) -> bool {
        self.attempt == other.attempt
            && self.student_id.eq_ignore_ascii_case(&other.student_id)
            && self.course_id.eq_ignore_ascii_case(&other.course_id)
    }

    pub(crate) fn to_line(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.student_id, self.course_id, self.attempt, self.letter
        )
    }

    pub(crate) fn from_line(line: &str) -> Result<Self> {
        let fields = crate::storage::split_fields(line);
        match fields.as_slice() {
            [student, course, attempt, letter] => Self::parse(student, course, attempt, letter),
            _ => Err(StandingError::Validation(format!(
                "expected 4 fields, found {}",
                fields.len()
            ))),
        }
    }
}

pub(crate) fn validate_id(what: &str, id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(StandingError::Validation(format!("{} must not be empty", what)));
    }
    if id.contains(FIELD_SEPARATOR) || id.contains('\n') || id.contains('\r') {
        return Err(StandingError::Validation(format!(
            "{} '{}' contains a reserved character",
            what, id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_map_to_fixed_points() {
        let points: Vec<f64> = GradeLetter::ALL.iter().map(|l| l.grade_point()).collect();
        assert_eq!(points, vec![4.0, 3.7, 3.3, 3.0, 2.3, 2.0, 1.0, 0.0]);
    }

    #[test]
    fn parses_letters_case_insensitively() {
        assert_eq!("a-".parse::<GradeLetter>().unwrap(), GradeLetter::AMinus);
        assert_eq!(" B+ ".parse::<GradeLetter>().unwrap(), GradeLetter::BPlus);
        assert!("E".parse::<GradeLetter>().is_err());
        assert!("A+".parse::<GradeLetter>().is_err());
    }

    #[test]
    fn attempt_outside_range_is_rejected() {
        assert!(Grade::new("S1", "CS101", 0, GradeLetter::A).is_err());
        assert!(Grade::new("S1", "CS101", 4, GradeLetter::A).is_err());
        assert!(Grade::new("S1", "CS101", 3, GradeLetter::A).is_ok());
    }

    #[test]
    fn empty_or_reserved_ids_are_rejected() {
        assert!(matches!(
            Grade::new("  ", "CS101", 1, GradeLetter::A),
            Err(StandingError::Validation(_))
        ));
        assert!(Grade::new("S1", "", 1, GradeLetter::A).is_err());
        assert!(Grade::new("S|1", "CS101", 1, GradeLetter::A).is_err());
    }

    #[test]
    fn line_format_matches_ledger_layout() {
        let grade = Grade::new("S1", "CS101", 2, GradeLetter::CPlus).unwrap();
        assert_eq!(grade.to_line(), "S1|CS101|2|C+");
        assert_eq!(Grade::from_line("S1 | CS101 | 2 | C+").unwrap(), grade);
        assert!(Grade::from_line("S1|CS101|2").is_err());
        assert!(Grade::from_line("S1|CS101|two|C").is_err());
    }

    #[test]
    fn key_comparison_ignores_id_case() {
        let a = Grade::new("s1", "cs101", 1, GradeLetter::A).unwrap();
        let b = Grade::new("S1", "CS101", 1, GradeLetter::F).unwrap();
        let c = Grade::new("S1", "CS101", 2, GradeLetter::A).unwrap();
        assert!(a.same_key(&b));
        assert!(!a.same_key(&c));
    }
}
