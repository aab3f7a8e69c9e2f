use academic_standing::session::Role;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "academic-standing")]
#[command(about = "Grade records, progression eligibility and recovery plans")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config/default")]
    pub config: String,

    /// ID of the person running the command
    #[arg(long = "as", global = true, default_value = "registrar")]
    pub actor: String,

    /// Role of the person running the command (student, admin)
    #[arg(long, global = true, default_value = "admin")]
    pub role: Role,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create empty ledgers with their headers
    Init,

    /// Record or list grades
    Grade {
        #[command(subcommand)]
        action: GradeCommand,
    },

    /// Show a student's eligibility to progress
    Standing {
        /// Student ID
        student: String,

        /// Output format: table or json
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Register an eligible student for the next level
    Register {
        /// Student ID
        student: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Manage recovery plans
    Plan {
        #[command(subcommand)]
        action: PlanCommand,
    },

    /// Inspect the student and course catalogue
    Catalogue {
        #[command(subcommand)]
        action: CatalogueCommand,
    },
}

#[derive(Subcommand)]
pub enum GradeCommand {
    /// Record (or overwrite) one attempt
    Record {
        student: String,
        course: String,
        /// Attempt number, 1 to 3
        attempt: String,
        /// Letter grade (A, A-, B+, B, C+, C, D, F)
        letter: String,
    },

    /// List a student's grades
    List {
        student: String,

        /// Show every attempt instead of only the latest per course
        #[arg(short, long)]
        all: bool,
    },
}

#[derive(Subcommand)]
pub enum PlanCommand {
    /// Start an empty plan for a student and course
    Create { student: String, course: String },

    /// Show one plan, or every plan for the student
    Show {
        student: String,
        course: Option<String>,

        /// Output format: table or json
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Append a milestone
    Add {
        student: String,
        course: String,
        title: String,
        /// Deadline as YYYY-MM-DD
        deadline: String,
    },

    /// Mark a milestone (numbered from 1) as done
    Complete {
        student: String,
        course: String,
        index: usize,

        /// Mark it as not done instead
        #[arg(long)]
        undo: bool,
    },

    /// Remove a milestone (numbered from 1)
    Remove {
        student: String,
        course: String,
        index: usize,
    },
}

#[derive(Subcommand)]
pub enum CatalogueCommand {
    /// Report courses whose exam and assignment weights do not add up to 100
    Check {
        /// Output format: table or json
        #[arg(short, long, default_value = "table")]
        format: String,
    },
}
