use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    catalogue::models::{Course, CreditTable, Student},
    error::{Result, StandingError},
};

const STUDENT_FIELDS: usize = 6;
const COURSE_FIELDS: usize = 7;

/// A course whose exam and assignment weights do not add up to 100.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightViolation {
    pub course_id: String,
    pub exam_weight: u32,
    pub assignment_weight: u32,
    pub total: u64,
}

impl std::fmt::Display for WeightViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: exam {} + assignment {} = {} (expected 100)",
            self.course_id,
            self.exam_weight,
            self.assignment_weight,
            self.total
        )
    }
}

/// Read-only student and course directories.
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    students: Vec<Student>,
    courses: Vec<Course>,
}

impl Catalogue {
    pub fn new(students: Vec<Student>, courses: Vec<Course>) -> Self {
        Self { students, courses }
    }

    /// Load both CSV directories. Unreadable files yield an empty directory.
    pub fn load(students_path: &Path, courses_path: &Path) -> Self {
        let students = read_or_empty(students_path)
            .map(|contents| parse_students(&contents))
            .unwrap_or_default();
        let courses = read_or_empty(courses_path)
            .map(|contents| parse_courses(&contents))
            .unwrap_or_default();

        let catalogue = Self::new(students, courses);
        for violation in catalogue.weight_report() {
            warn!("Course weight mismatch: {}", violation);
        }
        debug!(
            "Loaded catalogue: {} students, {} courses",
            catalogue.students.len(),
            catalogue.courses.len()
        );
        catalogue
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn student(&self, student_id: &str) -> Option<&Student> {
        let id = student_id.trim();
        self.students.iter().find(|s| s.student_id.eq_ignore_ascii_case(id))
    }

    pub fn course(&self, course_id: &str) -> Option<&Course> {
        let id = course_id.trim();
        self.courses.iter().find(|c| c.course_id.eq_ignore_ascii_case(id))
    }

    pub fn require_student(&self, student_id: &str) -> Result<&Student> {
        self.student(student_id)
            .ok_or_else(|| StandingError::NotFound(format!("student {}", student_id.trim())))
    }

    pub fn require_course(&self, course_id: &str) -> Result<&Course> {
        self.course(course_id)
            .ok_or_else(|| StandingError::NotFound(format!("course {}", course_id.trim())))
    }

    pub fn credit_table(&self) -> CreditTable {
        self.courses.iter().collect()
    }

    pub fn weight_report(&self) -> Vec<WeightViolation> {
        self.courses
            .iter()
            .filter(|c| !c.weights_balanced())
            .map(|c| WeightViolation {
                course_id: c.course_id.clone(),
                exam_weight: c.exam_weight,
                assignment_weight: c.assignment_weight,
                total: c.weight_total(),
            })
            .collect()
    }
}

fn read_or_empty(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(contents) => Some(contents),
        Err(e) => {
            warn!("Could not read catalogue file {}: {}", path.display(), e);
            None
        }
    }
}

/// Parse `StudentID,FirstName,LastName,Major,Year,Email` rows.
pub fn parse_students(contents: &str) -> Vec<Student> {
    rows(contents, "StudentID")
        .filter_map(|(line_no, fields)| match student_from_fields(&fields) {
            Ok(student) => Some(student),
            Err(e) => {
                warn!("Skipping student row {}: {}", line_no, e);
                None
            }
        })
        .collect()
}

/// Parse `CourseID,CourseName,Credits,Semester,Instructor,ExamWeight,AssignmentWeight` rows.
pub fn parse_courses(contents: &str) -> Vec<Course> {
    rows(contents, "CourseID")
        .filter_map(|(line_no, fields)| match course_from_fields(&fields) {
            Ok(course) => Some(course),
            Err(e) => {
                warn!("Skipping course row {}: {}", line_no, e);
                None
            }
        })
        .collect()
}

fn rows<'a>(
    contents: &'a str,
    header_key: &'a str,
) -> impl Iterator<Item = (usize, Vec<&'a str>)> + 'a {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter(move |(_, line)| {
            let first = line.split(',').next().unwrap_or("").trim();
            !first.eq_ignore_ascii_case(header_key)
        })
        .map(|(idx, line)| (idx + 1, line.split(',').map(str::trim).collect()))
}

fn student_from_fields(fields: &[&str]) -> Result<Student> {
    if fields.len() != STUDENT_FIELDS {
        return Err(StandingError::Validation(format!(
            "expected {} fields, found {}",
            STUDENT_FIELDS,
            fields.len()
        )));
    }
    crate::records::grade::validate_id("student ID", fields[0])?;

    Ok(Student {
        student_id: fields[0].to_string(),
        first_name: fields[1].to_string(),
        last_name: fields[2].to_string(),
        major: fields[3].to_string(),
        year: parse_number(fields[4], "year")?,
        email: fields[5].to_string(),
    })
}

fn course_from_fields(fields: &[&str]) -> Result<Course> {
    if fields.len() != COURSE_FIELDS {
        return Err(StandingError::Validation(format!(
            "expected {} fields, found {}",
            COURSE_FIELDS,
            fields.len()
        )));
    }

    let course = Course {
        course_id: fields[0].to_string(),
        course_name: fields[1].to_string(),
        credits: parse_number(fields[2], "credits")?,
        semester: fields[3].to_string(),
        instructor: fields[4].to_string(),
        exam_weight: parse_number(fields[5], "exam weight")?,
        assignment_weight: parse_number(fields[6], "assignment weight")?,
    };
    course.validate()?;
    Ok(course)
}

fn parse_number<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| StandingError::Validation(format!("{} '{}' is not a valid number", what, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STUDENTS: &str = "StudentID,FirstName,LastName,Major,Year,Email\n\
        S1,Ada,Lovelace,CS,2,ada@uni.edu\n\
        S2,Alan,Turing,Math,x,alan@uni.edu\n\
        S3,Grace,Hopper,CS,3\n\
        s4,Edsger,Dijkstra,CS,1,ed@uni.edu\n";

    const COURSES: &str = "CourseID,CourseName,Credits,Semester,Instructor,ExamWeight,AssignmentWeight\n\
        CS101,Programming,3,Fall,Dr. Lee,60,40\n\
        MA101,Calculus,4,Fall,Dr. Kim,70,40\n\
        PH101,Physics,0,Spring,Dr. Roe,50,50\n\
        EN101,English,-2,Spring,Dr. Poe,50,50\n";

    #[test]
    fn parses_students_and_skips_bad_rows() {
        let students = parse_students(STUDENTS);
        let ids: Vec<_> = students.iter().map(|s| s.student_id.as_str()).collect();
        assert_eq!(ids, vec!["S1", "s4"]);
        assert_eq!(students[0].full_name(), "Ada Lovelace");
        assert_eq!(students[0].year, 2);
    }

    #[test]
    fn parses_courses_and_rejects_non_positive_credits() {
        let courses = parse_courses(COURSES);
        let ids: Vec<_> = courses.iter().map(|c| c.course_id.as_str()).collect();
        assert_eq!(ids, vec!["CS101", "MA101"]);
    }

    #[test]
    fn weight_violations_are_reported_not_fatal() {
        let catalogue = Catalogue::new(parse_students(STUDENTS), parse_courses(COURSES));
        let report = catalogue.weight_report();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].course_id, "MA101");
        assert!(report[0].to_string().contains("= 110"));
        assert_eq!(catalogue.credit_table().get("MA101"), Some(4));
    }

    #[test]
    fn oversized_weights_are_reported_without_overflow() {
        let catalogue = Catalogue::new(
            Vec::new(),
            parse_courses("CS101,Prog,3,Fall,Lee,4294967295,1\nMA101,Calc,4,Fall,Kim,4294967295,4294967295\n"),
        );
        let report = catalogue.weight_report();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].total, 4_294_967_296);
        assert_eq!(
            report[1].to_string(),
            "MA101: exam 4294967295 + assignment 4294967295 = 8589934590 (expected 100)"
        );
    }

    #[test]
    fn lookups_ignore_case_and_report_missing() {
        let catalogue = Catalogue::new(parse_students(STUDENTS), parse_courses(COURSES));
        assert!(catalogue.student("S4").is_some());
        assert!(catalogue.course("cs101").is_some());
        assert!(matches!(
            catalogue.require_student("S9"),
            Err(StandingError::NotFound(_))
        ));
    }

    #[test]
    fn missing_files_give_empty_catalogue() {
        let dir = tempfile::tempdir().unwrap();
        let catalogue = Catalogue::load(&dir.path().join("s.csv"), &dir.path().join("c.csv"));
        assert!(catalogue.students().is_empty());
        assert!(catalogue.credit_table().is_empty());
    }

    #[test]
    fn load_reads_files_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let students = dir.path().join("students.csv");
        let courses = dir.path().join("courses.csv");
        fs::write(&students, STUDENTS).unwrap();
        fs::write(&courses, COURSES).unwrap();

        let catalogue = Catalogue::load(&students, &courses);
        assert_eq!(catalogue.students().len(), 2);
        assert_eq!(catalogue.courses().len(), 2);
    }
}
