use serde::Deserialize;
use std::path::PathBuf;

use crate::eligibility::{Thresholds, MAX_FAILED, MIN_CGPA};
use crate::error::{Result, StandingError};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub ledgers: LedgerConfig,
    pub catalogue: CatalogueConfig,
    pub eligibility: EligibilityConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LedgerConfig {
    pub grades: PathBuf,
    pub registrations: PathBuf,
    pub plans: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            grades: PathBuf::from("data/grades.txt"),
            registrations: PathBuf::from("data/registrations.txt"),
            plans: PathBuf::from("data/recovery_plans.txt"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CatalogueConfig {
    pub students: PathBuf,
    pub courses: PathBuf,
}

impl Default for CatalogueConfig {
    fn default() -> Self {
        Self {
            students: PathBuf::from("data/students.csv"),
            courses: PathBuf::from("data/courses.csv"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EligibilityConfig {
    pub min_cgpa: f64,
    pub max_failed: usize,
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            min_cgpa: MIN_CGPA,
            max_failed: MAX_FAILED,
        }
    }
}

impl Config {
    /// Load configuration from `path` (optional) overlaid by `STANDING_*`
    /// environment variables, e.g. `STANDING_ELIGIBILITY__MIN_CGPA=2.5`.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("STANDING")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let min = self.eligibility.min_cgpa;
        if !min.is_finite() || min < 0.0 {
            return Err(StandingError::Config(format!(
                "eligibility.min_cgpa must be a non-negative number, got {}",
                min
            )));
        }

        let paths = [
            ("ledgers.grades", &self.ledgers.grades),
            ("ledgers.registrations", &self.ledgers.registrations),
            ("ledgers.plans", &self.ledgers.plans),
            ("catalogue.students", &self.catalogue.students),
            ("catalogue.courses", &self.catalogue.courses),
        ];
        for (key, path) in paths {
            if path.as_os_str().is_empty() {
                return Err(StandingError::Config(format!("{} must not be empty", key)));
            }
        }

        Ok(())
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            min_cgpa: self.eligibility.min_cgpa,
            max_failed: self.eligibility.max_failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_constants() {
        let config = Config::default();
        assert_eq!(config.eligibility.min_cgpa, 2.0);
        assert_eq!(config.eligibility.max_failed, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn negative_min_cgpa_is_rejected() {
        let mut config = Config::default();
        config.eligibility.min_cgpa = -1.0;
        assert!(matches!(config.validate(), Err(StandingError::Config(_))));
    }

    #[test]
    fn empty_ledger_path_is_rejected() {
        let mut config = Config::default();
        config.ledgers.plans = PathBuf::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ledgers.plans"));
    }

    #[test]
    fn load_reads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("standing.toml");
        std::fs::write(
            &path,
            "[eligibility]\nmin_cgpa = 2.5\nmax_failed = 1\n\n[ledgers]\ngrades = \"g.txt\"\n",
        )
        .unwrap();

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.eligibility.min_cgpa, 2.5);
        assert_eq!(config.eligibility.max_failed, 1);
        assert_eq!(config.ledgers.grades, PathBuf::from("g.txt"));
        // untouched sections keep their defaults
        assert_eq!(config.ledgers.plans, PathBuf::from("data/recovery_plans.txt"));
    }
}
