pub mod commands;

pub use commands::{CatalogueCommand, Cli, Commands, GradeCommand, PlanCommand};
