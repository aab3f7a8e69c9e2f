use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::{
    error::{Result, StandingError},
    recovery::plan::{Milestone, RecoveryPlan, DEADLINE_FORMAT},
    storage::{sanitize_field, split_fields, LedgerFile},
};

const PLAN_TAG: &str = "PLAN";
const MILESTONE_TAG: &str = "MILESTONE";

/// A `PLAN` header and the raw lines that follow it.
struct Block {
    key: Option<(String, String)>,
    lines: Vec<(usize, String)>,
}

impl Block {
    fn is_for(&self, student_id: &str, course_id: &str) -> bool {
        matches!(&self.key, Some((s, c)) if s == student_id && c == course_id)
    }
}

/// Shared ledger of recovery plans, one block per (student, course).
///
/// Saving replaces the matching block and rewrites the whole file, with the
/// same single-writer assumption as the other ledgers.
pub struct RecoveryPlanLedger {
    ledger: LedgerFile,
}

impl RecoveryPlanLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            ledger: LedgerFile::new(path, None),
        }
    }

    pub fn save(&self, plan: &RecoveryPlan) -> Result<()> {
        let mut blocks = self.blocks_from(self.ledger.load_for_update()?);
        blocks.retain(|block| !block.is_for(plan.student_id(), plan.course_id()));

        let mut lines: Vec<String> = blocks
            .into_iter()
            .flat_map(|block| block.lines.into_iter().map(|(_, line)| line))
            .collect();
        lines.extend(serialize(plan));

        self.ledger.rewrite(&lines)?;
        info!(
            "Saved recovery plan for {} in {} ({} milestones)",
            plan.student_id(),
            plan.course_id(),
            plan.milestones().len()
        );
        Ok(())
    }

    /// Plan stored for exactly this (student, course) pair, if any.
    pub fn load(&self, student_id: &str, course_id: &str) -> Option<RecoveryPlan> {
        self.find(student_id.trim(), course_id.trim())
    }

    pub fn require(&self, student_id: &str, course_id: &str) -> Result<RecoveryPlan> {
        let (student_id, course_id) = (student_id.trim(), course_id.trim());
        self.find(student_id, course_id).ok_or_else(|| {
            StandingError::NotFound(format!("recovery plan for {} in {}", student_id, course_id))
        })
    }

    pub fn plans_for_student(&self, student_id: &str) -> Vec<RecoveryPlan> {
        let student_id = student_id.trim();
        self.read_blocks()
            .into_iter()
            .filter(|block| matches!(&block.key, Some((s, _)) if s == student_id))
            .map(|block| self.parse_block(block))
            .collect()
    }

    /// Drop the plan for this pair. Returns whether one existed.
    pub fn delete(&self, student_id: &str, course_id: &str) -> Result<bool> {
        let (student_id, course_id) = (student_id.trim(), course_id.trim());
        let mut blocks = self.blocks_from(self.ledger.load_for_update()?);
        let before = blocks.len();
        blocks.retain(|block| !block.is_for(student_id, course_id));
        if blocks.len() == before {
            return Ok(false);
        }

        let lines: Vec<String> = blocks
            .into_iter()
            .flat_map(|block| block.lines.into_iter().map(|(_, line)| line))
            .collect();
        self.ledger.rewrite(&lines)?;
        info!("Deleted recovery plan for {} in {}", student_id, course_id);
        Ok(true)
    }

    fn find(&self, student_id: &str, course_id: &str) -> Option<RecoveryPlan> {
        self.read_blocks()
            .into_iter()
            .rev()
            .find(|block| block.is_for(student_id, course_id))
            .map(|block| self.parse_block(block))
    }

    fn read_blocks(&self) -> Vec<Block> {
        self.blocks_from(self.ledger.read_body())
    }

    fn blocks_from(&self, body: Vec<(usize, String)>) -> Vec<Block> {
        let mut blocks: Vec<Block> = Vec::new();

        for (line_no, line) in body {
            let fields = split_fields(&line);
            if fields.first() == Some(&PLAN_TAG) {
                let key = match fields.as_slice() {
                    [_, student, course] if !student.is_empty() && !course.is_empty() => {
                        Some((student.to_string(), course.to_string()))
                    }
                    _ => {
                        warn!(
                            "Malformed plan header at {}:{}",
                            self.ledger.path().display(),
                            line_no
                        );
                        None
                    }
                };
                blocks.push(Block {
                    key,
                    lines: vec![(line_no, line)],
                });
                continue;
            }

            match blocks.last_mut() {
                Some(block) => block.lines.push((line_no, line)),
                None => {
                    warn!(
                        "Line {} of {} precedes any plan header",
                        line_no,
                        self.ledger.path().display()
                    );
                    blocks.push(Block {
                        key: None,
                        lines: vec![(line_no, line)],
                    });
                }
            }
        }

        blocks
    }

    fn parse_block(&self, block: Block) -> RecoveryPlan {
        let (student_id, course_id) = block.key.unwrap_or_default();
        let milestones = block
            .lines
            .iter()
            .skip(1)
            .filter_map(|(line_no, line)| match parse_milestone(line) {
                Ok(milestone) => Some(milestone),
                Err(e) => {
                    warn!(
                        "Skipping malformed milestone at {}:{}: {}",
                        self.ledger.path().display(),
                        line_no,
                        e
                    );
                    None
                }
            })
            .collect();

        debug!("Loaded recovery plan for {} in {}", student_id, course_id);
        RecoveryPlan::from_parts(student_id, course_id, milestones)
    }
}

fn serialize(plan: &RecoveryPlan) -> Vec<String> {
    let mut lines = Vec::with_capacity(plan.milestones().len() + 1);
    lines.push(format!("{}|{}|{}", PLAN_TAG, plan.student_id(), plan.course_id()));
    for milestone in plan.milestones() {
        lines.push(format!(
            "{}|{}|{}|{}",
            MILESTONE_TAG,
            sanitize_field(&milestone.title),
            milestone.deadline.format(DEADLINE_FORMAT),
            milestone.completed
        ));
    }
    lines
}

fn parse_milestone(line: &str) -> Result<Milestone> {
    let fields = split_fields(line);
    let [tag, title, deadline, completed] = fields.as_slice() else {
        return Err(StandingError::Validation(format!(
            "expected 4 fields, found {}",
            fields.len()
        )));
    };
    if *tag != MILESTONE_TAG {
        return Err(StandingError::Validation(format!("unknown record type '{}'", tag)));
    }

    let completed = match completed.to_ascii_lowercase().as_str() {
        "true" => true,
        "false" => false,
        other => {
            return Err(StandingError::Validation(format!(
                "completed must be true or false, got '{}'",
                other
            )))
        }
    };

    let mut milestone = Milestone::new(title, Milestone::parse_deadline(deadline)?)?;
    milestone.completed = completed;
    Ok(milestone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_ledger() -> (tempfile::TempDir, RecoveryPlanLedger) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = RecoveryPlanLedger::new(dir.path().join("plans.txt"));
        (dir, ledger)
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn sample_plan(student: &str, course: &str) -> RecoveryPlan {
        let mut plan = RecoveryPlan::new(student, course).unwrap();
        plan.add_milestone("Meet advisor", date(9, 15)).unwrap();
        plan.add_milestone("Resubmit assignment 2", date(10, 1)).unwrap();
        plan.add_milestone("Sit make-up exam", date(11, 20)).unwrap();
        plan.update_milestone_status(0, true).unwrap();
        plan
    }

    #[test]
    fn save_then_load_round_trips() {
        let (_dir, ledger) = make_ledger();
        let plan = sample_plan("S1", "CS101");
        ledger.save(&plan).unwrap();

        let loaded = ledger.load("S1", "CS101").unwrap();
        assert_eq!(loaded, plan);
        assert_eq!(loaded.progress(), 33);
    }

    #[test]
    fn file_layout_uses_plan_and_milestone_lines() {
        let (_dir, ledger) = make_ledger();
        let mut plan = RecoveryPlan::new("S1", "CS101").unwrap();
        plan.add_milestone("Lab | redo", date(9, 1)).unwrap();
        ledger.save(&plan).unwrap();

        let raw = std::fs::read_to_string(ledger.ledger.path()).unwrap();
        assert_eq!(raw, "PLAN|S1|CS101\nMILESTONE|Lab / redo|2024-09-01|false\n");
    }

    #[test]
    fn load_requires_exact_key() {
        let (_dir, ledger) = make_ledger();
        ledger.save(&sample_plan("S1", "CS101")).unwrap();
        assert!(ledger.load("S1", "CS102").is_none());
        assert!(ledger.load("S2", "CS101").is_none());
        assert!(ledger.load("s1", "cs101").is_none());
        assert!(matches!(
            ledger.require("S1", "CS102"),
            Err(StandingError::NotFound(_))
        ));
    }

    #[test]
    fn save_replaces_only_the_matching_block() {
        let (_dir, ledger) = make_ledger();
        let other = sample_plan("S2", "MA101");
        ledger.save(&sample_plan("S1", "CS101")).unwrap();
        ledger.save(&other).unwrap();

        let mut updated = sample_plan("S1", "CS101");
        updated.remove_milestone(2).unwrap();
        updated.update_milestone_status(1, true).unwrap();
        ledger.save(&updated).unwrap();

        assert_eq!(ledger.load("S1", "CS101").unwrap(), updated);
        assert_eq!(ledger.load("S2", "MA101").unwrap(), other);
        assert!(ledger.load("S1", "CS101").unwrap().is_completed());

        let raw = std::fs::read_to_string(ledger.ledger.path()).unwrap();
        assert_eq!(raw.matches("PLAN|").count(), 2);
    }

    #[test]
    fn empty_plan_round_trips_as_incomplete() {
        let (_dir, ledger) = make_ledger();
        let plan = RecoveryPlan::new("S1", "CS101").unwrap();
        ledger.save(&plan).unwrap();
        let loaded = ledger.load("S1", "CS101").unwrap();
        assert!(loaded.milestones().is_empty());
        assert!(!loaded.is_completed());
    }

    #[test]
    fn malformed_milestones_are_skipped() {
        let (_dir, ledger) = make_ledger();
        std::fs::write(
            ledger.ledger.path(),
            "MILESTONE|orphan|2024-01-01|false\n\
             PLAN|S1|CS101\n\
             MILESTONE|Good|2024-02-01|true\n\
             MILESTONE|Bad date|soon|false\n\
             MILESTONE|Bad flag|2024-02-02|maybe\n\
             NOTE|something\n\
             PLAN|S1\n\
             MILESTONE|Under broken header|2024-03-01|false\n",
        )
        .unwrap();

        let plan = ledger.load("S1", "CS101").unwrap();
        assert_eq!(plan.milestones().len(), 1);
        assert!(plan.is_completed());

        // unrelated content survives a save
        ledger.save(&plan).unwrap();
        let raw = std::fs::read_to_string(ledger.ledger.path()).unwrap();
        assert!(raw.starts_with("MILESTONE|orphan|2024-01-01|false\n"));
        assert!(raw.contains("PLAN|S1\n"));
    }

    #[test]
    fn plans_for_student_and_delete() {
        let (_dir, ledger) = make_ledger();
        ledger.save(&sample_plan("S1", "CS101")).unwrap();
        ledger.save(&sample_plan("S1", "MA101")).unwrap();
        ledger.save(&sample_plan("S2", "CS101")).unwrap();

        let courses: Vec<_> = ledger
            .plans_for_student("S1")
            .iter()
            .map(|p| p.course_id().to_string())
            .collect();
        assert_eq!(courses, vec!["CS101", "MA101"]);

        assert!(ledger.delete("S1", "CS101").unwrap());
        assert!(!ledger.delete("S1", "CS101").unwrap());
        assert_eq!(ledger.plans_for_student("S1").len(), 1);
        assert!(ledger.load("S2", "CS101").is_some());
    }

    #[test]
    fn unreadable_ledger_is_never_overwritten() {
        let (_dir, ledger) = make_ledger();
        let mut contents = b"PLAN|S1|CS101\nMILESTONE|Meet advisor|2024-09-15|true\n".to_vec();
        contents.extend_from_slice(b"MILESTONE|Caf\xE9 study group|2024-09-20|false\n");
        std::fs::write(ledger.ledger.path(), &contents).unwrap();

        // queries degrade to empty
        assert!(ledger.load("S1", "CS101").is_none());
        assert!(ledger.plans_for_student("S1").is_empty());

        let err = ledger.save(&sample_plan("S2", "MA101")).unwrap_err();
        assert!(matches!(err, StandingError::Storage { .. }));
        let err = ledger.delete("S1", "CS101").unwrap_err();
        assert!(matches!(err, StandingError::Storage { .. }));
        assert_eq!(std::fs::read(ledger.ledger.path()).unwrap(), contents);
    }

    #[test]
    fn lookups_trim_surrounding_whitespace() {
        let (_dir, ledger) = make_ledger();
        ledger.save(&sample_plan("S1", "CS101")).unwrap();
        assert!(ledger.load(" S1 ", "CS101\t").is_some());
        assert_eq!(ledger.require(" S1", "CS101 ").unwrap().student_id(), "S1");
        match ledger.require(" S1 ", " MA101 ") {
            Err(StandingError::NotFound(msg)) => assert_eq!(msg, "recovery plan for S1 in MA101"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn missing_ledger_loads_nothing() {
        let (_dir, ledger) = make_ledger();
        assert!(ledger.load("S1", "CS101").is_none());
        assert!(ledger.plans_for_student("S1").is_empty());
    }
}
