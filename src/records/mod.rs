pub mod grade;
pub mod store;

pub use grade::{Grade, GradeLetter, MAX_ATTEMPT, MIN_ATTEMPT};
pub use store::{LatestGrades, RecordStore, GRADE_HEADER};
