pub mod engine;

pub use engine::{
    compute_cgpa, EligibilityDecision, EligibilityEngine, EligibilityStatus, Thresholds,
    MAX_FAILED, MIN_CGPA,
};
