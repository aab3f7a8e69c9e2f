use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    error::{Result, StandingError},
    records::grade::validate_id,
    storage::sanitize_field,
};

pub const DEADLINE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Milestone {
    pub title: String,
    pub deadline: NaiveDate,
    pub completed: bool,
}

impl Milestone {
    /// New, not yet completed milestone. The title is cleaned of ledger
    /// delimiters so it reads back exactly as stored.
    pub fn new(title: &str, deadline: NaiveDate) -> Result<Self> {
        let title = sanitize_field(title);
        if title.is_empty() {
            return Err(StandingError::Validation("milestone title must not be empty".into()));
        }
        Ok(Self {
            title,
            deadline,
            completed: false,
        })
    }

    pub fn parse_deadline(raw: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(raw.trim(), DEADLINE_FORMAT).map_err(|_| {
            StandingError::Validation(format!(
                "deadline '{}' is not a date like 2024-12-31",
                raw.trim()
            ))
        })
    }
}

/// Ordered milestones for one (student, course) pair.
///
/// `completed` is recomputed after every mutation: it is true only when
/// there is at least one milestone and all of them are done.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveryPlan {
    student_id: String,
    course_id: String,
    milestones: Vec<Milestone>,
    completed: bool,
}

impl RecoveryPlan {
    pub fn new(student_id: &str, course_id: &str) -> Result<Self> {
        validate_id("student ID", student_id)?;
        validate_id("course ID", course_id)?;
        Ok(Self {
            student_id: student_id.trim().to_string(),
            course_id: course_id.trim().to_string(),
            milestones: Vec::new(),
            completed: false,
        })
    }

    pub(crate) fn from_parts(student_id: String, course_id: String, milestones: Vec<Milestone>) -> Self {
        let mut plan = Self {
            student_id,
            course_id,
            milestones,
            completed: false,
        };
        plan.refresh_completed();
        plan
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub fn course_id(&self) -> &str {
        &self.course_id
    }

    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn progress(&self) -> u32 {
        progress(self)
    }

    pub fn add_milestone(&mut self, title: &str, deadline: NaiveDate) -> Result<()> {
        self.milestones.push(Milestone::new(title, deadline)?);
        self.refresh_completed();
        Ok(())
    }

    pub fn update_milestone_status(&mut self, index: usize, completed: bool) -> Result<()> {
        let count = self.milestones.len();
        let milestone = self
            .milestones
            .get_mut(index)
            .ok_or_else(|| index_error(index, count))?;
        milestone.completed = completed;
        self.refresh_completed();
        Ok(())
    }

    pub fn remove_milestone(&mut self, index: usize) -> Result<Milestone> {
        if index >= self.milestones.len() {
            return Err(index_error(index, self.milestones.len()));
        }
        let removed = self.milestones.remove(index);
        self.refresh_completed();
        Ok(removed)
    }

    fn refresh_completed(&mut self) {
        self.completed = !self.milestones.is_empty() && self.milestones.iter().all(|m| m.completed);
    }
}

fn index_error(index: usize, count: usize) -> StandingError {
    StandingError::Validation(format!(
        "milestone index {} out of range (plan has {})",
        index, count
    ))
}

/// Percentage of completed milestones, rounded down. Empty plans are at 0.
pub fn progress(plan: &RecoveryPlan) -> u32 {
    let total = plan.milestones.len();
    if total == 0 {
        return 0;
    }
    let done = plan.milestones.iter().filter(|m| m.completed).count();
    (100 * done / total) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, d).unwrap()
    }

    fn plan_with(n: usize) -> RecoveryPlan {
        let mut plan = RecoveryPlan::new("S1", "CS101").unwrap();
        for i in 0..n {
            plan.add_milestone(&format!("Step {}", i + 1), date(i as u32 + 1)).unwrap();
        }
        plan
    }

    #[test]
    fn empty_plan_is_never_completed() {
        let plan = plan_with(0);
        assert!(!plan.is_completed());
        assert_eq!(plan.progress(), 0);
    }

    #[test]
    fn one_of_three_is_thirty_three_percent() {
        let mut plan = plan_with(3);
        plan.update_milestone_status(1, true).unwrap();
        assert_eq!(progress(&plan), 33);
        assert!(!plan.is_completed());
    }

    #[test]
    fn completed_tracks_every_mutation() {
        let mut plan = plan_with(2);
        plan.update_milestone_status(0, true).unwrap();
        plan.update_milestone_status(1, true).unwrap();
        assert!(plan.is_completed());
        assert_eq!(plan.progress(), 100);

        plan.add_milestone("Final exam", date(20)).unwrap();
        assert!(!plan.is_completed());

        let removed = plan.remove_milestone(2).unwrap();
        assert_eq!(removed.title, "Final exam");
        assert!(plan.is_completed());

        plan.update_milestone_status(0, false).unwrap();
        assert!(!plan.is_completed());

        plan.remove_milestone(1).unwrap();
        plan.remove_milestone(0).unwrap();
        assert!(!plan.is_completed());
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut plan = plan_with(1);
        assert!(matches!(
            plan.update_milestone_status(1, true),
            Err(StandingError::Validation(_))
        ));
        assert!(plan.remove_milestone(5).is_err());
        assert_eq!(plan.milestones().len(), 1);
    }

    #[test]
    fn titles_are_cleaned_and_must_not_be_empty() {
        let mut plan = plan_with(0);
        plan.add_milestone("Redo lab | part 2\n", date(3)).unwrap();
        assert_eq!(plan.milestones()[0].title, "Redo lab / part 2");
        assert!(plan.add_milestone(" | ", date(3)).is_ok());
        assert!(plan.add_milestone("   ", date(3)).is_err());
    }

    #[test]
    fn deadline_parsing() {
        assert_eq!(Milestone::parse_deadline("2024-10-05").unwrap(), date(5));
        assert!(Milestone::parse_deadline("05/10/2024").is_err());
    }

    #[test]
    fn invalid_ids_are_rejected() {
        assert!(RecoveryPlan::new("", "CS101").is_err());
        assert!(RecoveryPlan::new("S1", "CS|101").is_err());
    }
}
