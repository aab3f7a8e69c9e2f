use std::path::PathBuf;

use tracing::info;

use crate::{
    catalogue::Catalogue,
    config::Config,
    eligibility::{EligibilityDecision, EligibilityEngine},
    error::{Result, StandingError},
    records::{Grade, LatestGrades, RecordStore},
    recovery::{RecoveryPlan, RecoveryPlanLedger},
    registration::{RegistrationLedger, RegistrationRow},
    session::Session,
};

/// Catalogue, ledgers and engine wired together.
pub struct StandingService {
    catalogue: Catalogue,
    records: RecordStore,
    registrations: RegistrationLedger,
    plans: RecoveryPlanLedger,
    engine: EligibilityEngine,
}

impl StandingService {
    pub fn new(
        catalogue: Catalogue,
        records: RecordStore,
        registrations: RegistrationLedger,
        plans: RecoveryPlanLedger,
        engine: EligibilityEngine,
    ) -> Self {
        Self {
            catalogue,
            records,
            registrations,
            plans,
            engine,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Catalogue::load(&config.catalogue.students, &config.catalogue.courses),
            RecordStore::new(&config.ledgers.grades),
            RegistrationLedger::new(&config.ledgers.registrations),
            RecoveryPlanLedger::new(&config.ledgers.plans),
            EligibilityEngine::new(config.thresholds()),
        )
    }

    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    pub fn registrations(&self) -> &RegistrationLedger {
        &self.registrations
    }

    pub fn plans(&self) -> &RecoveryPlanLedger {
        &self.plans
    }

    pub fn engine(&self) -> &EligibilityEngine {
        &self.engine
    }

    /// Create the headed ledgers that do not exist yet.
    pub fn init_ledgers(&self) -> Result<Vec<PathBuf>> {
        let mut created = Vec::new();
        if self.records.init()? {
            created.push(self.records.path().to_path_buf());
        }
        if self.registrations.init()? {
            created.push(self.registrations.path().to_path_buf());
        }
        Ok(created)
    }

    pub fn record_grade(&self, session: &Session, grade: &Grade) -> Result<()> {
        session.ensure(session.actor().can_record_grades(), "record grades")?;
        grade.validate()?;
        self.catalogue.require_student(&grade.student_id)?;
        self.catalogue.require_course(&grade.course_id)?;
        self.records.upsert(grade)
    }

    pub fn latest_grades(&self, student_id: &str) -> LatestGrades {
        self.records.latest_attempt_per_course(student_id)
    }

    /// Fresh decision for a student known to the catalogue.
    pub fn decision_for(&self, student_id: &str) -> Result<EligibilityDecision> {
        let student = self.catalogue.require_student(student_id)?;
        let latest = self.records.latest_attempt_per_course(&student.student_id);
        Ok(self
            .engine
            .decide(&student.student_id, &latest, &self.catalogue.credit_table()))
    }

    pub fn register(&self, session: &Session, student_id: &str) -> Result<RegistrationRow> {
        session.ensure(
            session.actor().can_register(student_id),
            &format!("register {}", student_id.trim()),
        )?;
        let decision = self.decision_for(student_id)?;
        self.registrations
            .register_if_eligible(&decision.student_id, &decision)
    }

    /// Start an empty plan. Fails if one already exists for the pair.
    pub fn create_plan(&self, session: &Session, student_id: &str, course_id: &str) -> Result<RecoveryPlan> {
        session.ensure(session.actor().can_manage_plans(), "manage recovery plans")?;
        let student = self.catalogue.require_student(student_id)?;
        let course = self.catalogue.require_course(course_id)?;

        if self.plans.load(&student.student_id, &course.course_id).is_some() {
            return Err(StandingError::Validation(format!(
                "a recovery plan for {} in {} already exists",
                student.student_id, course.course_id
            )));
        }

        let plan = RecoveryPlan::new(&student.student_id, &course.course_id)?;
        self.plans.save(&plan)?;
        info!("Created recovery plan for {} in {}", student.student_id, course.course_id);
        Ok(plan)
    }

    /// Plan for the pair, resolving IDs to their catalogue spelling first.
    pub fn plan(&self, student_id: &str, course_id: &str) -> Result<RecoveryPlan> {
        let student = self.catalogue.require_student(student_id)?;
        let course = self.catalogue.require_course(course_id)?;
        self.plans.require(&student.student_id, &course.course_id)
    }

    pub fn save_plan(&self, session: &Session, plan: &RecoveryPlan) -> Result<()> {
        session.ensure(session.actor().can_manage_plans(), "manage recovery plans")?;
        self.plans.save(plan)
    }
}
