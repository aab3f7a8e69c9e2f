use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Result, StandingError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub major: String,
    pub year: u8,
    pub email: String,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub course_id: String,
    pub course_name: String,
    pub credits: u32,
    pub semester: String,
    pub instructor: String,
    pub exam_weight: u32,
    pub assignment_weight: u32,
}

impl Course {
    pub fn validate(&self) -> Result<()> {
        crate::records::grade::validate_id("course ID", &self.course_id)?;
        if self.credits == 0 {
            return Err(StandingError::Validation(format!(
                "course {} must carry a positive number of credits",
                self.course_id
            )));
        }
        Ok(())
    }

    /// Sum of the exam and assignment weights, widened so it cannot overflow.
    pub fn weight_total(&self) -> u64 {
        u64::from(self.exam_weight) + u64::from(self.assignment_weight)
    }

    /// Exam and assignment weights are expected to add up to 100.
    pub fn weights_balanced(&self) -> bool {
        self.weight_total() == 100
    }
}

/// Credit hours per course, looked up case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct CreditTable {
    credits: HashMap<String, u32>,
}

impl CreditTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, course_id: &str, credits: u32) -> Result<()> {
        if credits == 0 {
            return Err(StandingError::Validation(format!(
                "course {} must carry a positive number of credits",
                course_id
            )));
        }
        self.credits.insert(course_id.trim().to_ascii_uppercase(), credits);
        Ok(())
    }

    pub fn get(&self, course_id: &str) -> Option<u32> {
        self.credits.get(&course_id.trim().to_ascii_uppercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.credits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credits.is_empty()
    }
}

impl<'a> FromIterator<&'a Course> for CreditTable {
    fn from_iter<I: IntoIterator<Item = &'a Course>>(iter: I) -> Self {
        let mut table = CreditTable::new();
        for course in iter {
            if course.credits > 0 {
                table
                    .credits
                    .insert(course.course_id.to_ascii_uppercase(), course.credits);
            }
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(id: &str, credits: u32, exam: u32, assignment: u32) -> Course {
        Course {
            course_id: id.into(),
            course_name: "Intro".into(),
            credits,
            semester: "Fall".into(),
            instructor: "Dr. Lee".into(),
            exam_weight: exam,
            assignment_weight: assignment,
        }
    }

    #[test]
    fn zero_credit_course_is_invalid() {
        assert!(course("CS101", 0, 60, 40).validate().is_err());
        assert!(course("CS101", 3, 60, 40).validate().is_ok());
    }

    #[test]
    fn weight_balance() {
        assert!(course("CS101", 3, 60, 40).weights_balanced());
        assert!(!course("CS101", 3, 70, 40).weights_balanced());

        // u32::MAX + 1 must not wrap around to a balanced-looking total
        let huge = course("CS101", 3, u32::MAX, 1);
        assert_eq!(huge.weight_total(), u64::from(u32::MAX) + 1);
        assert!(!huge.weights_balanced());
    }

    #[test]
    fn credit_table_lookup_ignores_case() {
        let courses = [course("cs101", 3, 60, 40), course("MA101", 4, 50, 50)];
        let table: CreditTable = courses.iter().collect();
        assert_eq!(table.get("CS101"), Some(3));
        assert_eq!(table.get("ma101"), Some(4));
        assert_eq!(table.get("PH101"), None);
    }

    #[test]
    fn credit_table_rejects_zero_credits() {
        let mut table = CreditTable::new();
        assert!(table.insert("CS101", 0).is_err());
        assert!(table.is_empty());
    }
}
