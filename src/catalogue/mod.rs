pub mod models;
pub mod parser;

pub use models::{Course, CreditTable, Student};
pub use parser::{parse_courses, parse_students, Catalogue, WeightViolation};
