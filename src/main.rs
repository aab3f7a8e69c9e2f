mod cli;

use academic_standing::{
    error::{Result, StandingError},
    recovery::{Milestone, RecoveryPlan},
    records::Grade,
    session::{Actor, Session},
    utils, Config, StandingService,
};
use clap::Parser;
use cli::{CatalogueCommand, Cli, Commands, GradeCommand, PlanCommand};
use colored::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("academic_standing=info,warn")),
        )
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let session = Session::new(Actor::new(cli.actor.clone(), cli.role));
    let service = StandingService::from_config(&config);

    let result = match cli.command {
        Commands::Init => initialize(&service, &config),

        Commands::Grade { action } => match action {
            GradeCommand::Record {
                student,
                course,
                attempt,
                letter,
            } => record_grade(&service, &session, &student, &course, &attempt, &letter),
            GradeCommand::List { student, all } => list_grades(&service, &student, all),
        },

        Commands::Standing { student, format } => show_standing(&service, &student, &format),

        Commands::Register { student, yes } => register(&service, &session, &student, yes),

        Commands::Plan { action } => run_plan_command(&service, &session, action),

        Commands::Catalogue { action } => match action {
            CatalogueCommand::Check { format } => check_catalogue(&service, &format),
        },
    };

    if let Err(e) = result {
        error!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }
}

fn initialize(service: &StandingService, config: &Config) -> Result<()> {
    println!("{}", "Initializing academic standing ledgers...".green());
    for path in service.init_ledgers()? {
        println!("{} {}", "✓ Created".green(), path.display());
    }

    println!("\n{}", "Configuration:".cyan());
    println!("  Grades:         {}", config.ledgers.grades.display());
    println!("  Registrations:  {}", config.ledgers.registrations.display());
    println!("  Recovery plans: {}", config.ledgers.plans.display());
    println!("  Students:       {}", config.catalogue.students.display());
    println!("  Courses:        {}", config.catalogue.courses.display());
    println!("  Min CGPA:       {:.2}", config.eligibility.min_cgpa);
    println!("  Max failed:     {}", config.eligibility.max_failed);
    println!(
        "\nCatalogue: {} students, {} courses",
        service.catalogue().students().len(),
        service.catalogue().courses().len()
    );
    Ok(())
}

fn record_grade(
    service: &StandingService,
    session: &Session,
    student: &str,
    course: &str,
    attempt: &str,
    letter: &str,
) -> Result<()> {
    let grade = Grade::parse(student, course, attempt, letter)?;
    service.record_grade(session, &grade)?;
    println!(
        "{} {} in {} (attempt {}) for {}",
        "✓ Recorded".green(),
        grade.letter,
        grade.course_id,
        grade.attempt,
        grade.student_id
    );
    Ok(())
}

fn list_grades(service: &StandingService, student: &str, all: bool) -> Result<()> {
    let grades: Vec<Grade> = if all {
        service.records().by_student(student)
    } else {
        service.latest_grades(student).into_values().collect()
    };

    if grades.is_empty() {
        println!("No grades recorded for {}", student);
        return Ok(());
    }

    let widths = [12, 30, 8, 6, 8];
    utils::print_table_border(72);
    utils::print_table_row(&["Course", "Name", "Attempt", "Grade", "Points"], &widths);
    utils::print_table_border(72);
    for grade in &grades {
        let name = service
            .catalogue()
            .course(&grade.course_id)
            .map(|c| c.course_name.clone())
            .unwrap_or_default();
        utils::print_table_row(
            &[
                &grade.course_id,
                &name,
                &grade.attempt.to_string(),
                grade.letter.as_str(),
                &format!("{:.1}", grade.grade_point()),
            ],
            &widths,
        );
    }
    utils::print_table_border(72);
    Ok(())
}

fn show_standing(service: &StandingService, student: &str, format: &str) -> Result<()> {
    let decision = service.decision_for(student)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&decision)?);
        return Ok(());
    }

    let name = service
        .catalogue()
        .student(&decision.student_id)
        .map(|s| s.full_name())
        .unwrap_or_default();
    let registered = service.registrations().is_registered(&decision.student_id);

    println!("{}", format!("=== Standing for {} {} ===", decision.student_id, name).cyan().bold());
    println!("CGPA:           {}", utils::format_cgpa(decision.cgpa));
    println!("Failed courses: {}", decision.failed_courses);
    println!("Status:         {}", utils::format_status(decision.status));
    println!("Registered:     {}", if registered { "yes".green() } else { "no".normal() });
    println!("\n{}", decision.reason);
    Ok(())
}

fn register(service: &StandingService, session: &Session, student: &str, yes: bool) -> Result<()> {
    let decision = service.decision_for(student)?;
    println!("Eligibility: {}", utils::format_status(decision.status));

    if decision.is_eligible() && !yes {
        let confirmed = utils::confirm_action(&format!("Register {} for the next level?", decision.student_id))
            .map_err(|e| StandingError::Other(e.into()))?;
        if !confirmed {
            println!("Cancelled");
            return Ok(());
        }
    }

    let row = service.register(session, student)?;
    let stamp = row
        .registered_at
        .map(|at| utils::format_timestamp(&at))
        .unwrap_or_default();
    println!("{} {} at {}", "✓ Registered".green(), row.student_id, stamp);
    info!("Registration recorded for {}", row.student_id);
    Ok(())
}

fn run_plan_command(service: &StandingService, session: &Session, action: PlanCommand) -> Result<()> {
    match action {
        PlanCommand::Create { student, course } => {
            let plan = service.create_plan(session, &student, &course)?;
            println!(
                "{} recovery plan for {} in {}",
                "✓ Created".green(),
                plan.student_id(),
                plan.course_id()
            );
            Ok(())
        }

        PlanCommand::Show {
            student,
            course,
            format,
        } => {
            let plans = match course {
                Some(course) => vec![service.plan(&student, &course)?],
                None => {
                    let id = service.catalogue().require_student(&student)?.student_id.clone();
                    service.plans().plans_for_student(&id)
                }
            };

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&plans)?);
                return Ok(());
            }
            if plans.is_empty() {
                println!("No recovery plans for {}", student);
            }
            for plan in &plans {
                print_plan(plan);
            }
            Ok(())
        }

        PlanCommand::Add {
            student,
            course,
            title,
            deadline,
        } => {
            let deadline = Milestone::parse_deadline(&deadline)?;
            let mut plan = service.plan(&student, &course)?;
            plan.add_milestone(&title, deadline)?;
            service.save_plan(session, &plan)?;
            print_plan(&plan);
            Ok(())
        }

        PlanCommand::Complete {
            student,
            course,
            index,
            undo,
        } => {
            let mut plan = service.plan(&student, &course)?;
            plan.update_milestone_status(milestone_index(index)?, !undo)?;
            service.save_plan(session, &plan)?;
            print_plan(&plan);
            Ok(())
        }

        PlanCommand::Remove {
            student,
            course,
            index,
        } => {
            let mut plan = service.plan(&student, &course)?;
            let removed = plan.remove_milestone(milestone_index(index)?)?;
            service.save_plan(session, &plan)?;
            println!("{} {}", "✓ Removed".green(), removed.title);
            print_plan(&plan);
            Ok(())
        }
    }
}

/// Users number milestones from 1.
fn milestone_index(index: usize) -> Result<usize> {
    index
        .checked_sub(1)
        .ok_or_else(|| StandingError::Validation("milestones are numbered from 1".into()))
}

fn print_plan(plan: &RecoveryPlan) {
    let state = if plan.is_completed() {
        "completed".green()
    } else {
        "in progress".yellow()
    };
    println!(
        "\n{} {} / {} ({})",
        "Recovery plan".cyan().bold(),
        plan.student_id(),
        plan.course_id(),
        state
    );
    println!("Progress: {}", utils::format_progress(plan.progress()));

    let widths = [4, 40, 12, 6];
    for (i, milestone) in plan.milestones().iter().enumerate() {
        let mark = if milestone.completed { "✓" } else { " " };
        utils::print_table_row(
            &[
                &(i + 1).to_string(),
                &milestone.title,
                &milestone.deadline.to_string(),
                mark,
            ],
            &widths,
        );
    }
}

fn check_catalogue(service: &StandingService, format: &str) -> Result<()> {
    let report = service.catalogue().weight_report();

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.is_empty() {
        println!("{}", "✓ All course weights add up to 100".green());
        return Ok(());
    }

    println!("{}", format!("{} course(s) with unbalanced weights:", report.len()).yellow());
    for violation in &report {
        println!("  {}", violation);
    }
    Ok(())
}
