use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StandingError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    Student,
    Administrator,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Administrator => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = StandingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "admin" | "administrator" => Ok(Role::Administrator),
            other => Err(StandingError::Validation(format!("unknown role '{}'", other))),
        }
    }
}

/// Whoever is acting. Authentication happens outside this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self { id: id.into(), role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Administrator
    }

    pub fn can_record_grades(&self) -> bool {
        self.is_admin()
    }

    pub fn can_manage_plans(&self) -> bool {
        self.is_admin()
    }

    /// Students may only register themselves.
    pub fn can_register(&self, student_id: &str) -> bool {
        self.is_admin() || self.id.eq_ignore_ascii_case(student_id.trim())
    }
}

/// Explicit per-caller context, built by the composition root and passed
/// into the operations that need to know who is acting.
#[derive(Debug, Clone)]
pub struct Session {
    actor: Actor,
}

impl Session {
    pub fn new(actor: Actor) -> Self {
        Self { actor }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub(crate) fn ensure(&self, allowed: bool, action: &str) -> Result<()> {
        if allowed {
            Ok(())
        } else {
            Err(StandingError::PermissionDenied(format!(
                "{} ({}) may not {}",
                self.actor.id, self.actor.role, action
            )))
        }
    }
}
