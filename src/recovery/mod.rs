pub mod ledger;
pub mod plan;

pub use ledger::RecoveryPlanLedger;
pub use plan::{progress, Milestone, RecoveryPlan, DEADLINE_FORMAT};
