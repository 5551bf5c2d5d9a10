use crate::error::{ReminderError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Privilege level presented by whoever triggers a run.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Service,
    Member,
    #[default]
    Anonymous,
}

impl Role {
    pub fn is_privileged(self) -> bool {
        matches!(self, Role::Admin | Role::Service)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "admin",
            Role::Service => "service",
            Role::Member => "member",
            Role::Anonymous => "anonymous",
        };
        f.write_str(name)
    }
}

impl FromStr for Role {
    type Err = ReminderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "service" => Ok(Role::Service),
            "member" | "user" => Ok(Role::Member),
            "anonymous" | "" => Ok(Role::Anonymous),
            other => Err(ReminderError::Authorization(format!("unknown role '{other}'"))),
        }
    }
}

/// Identity of the caller, passed explicitly into every entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub subject: Option<String>,
    pub role: Role,
}

impl Credential {
    pub fn new(subject: impl Into<String>, role: Role) -> Self {
        Self {
            subject: Some(subject.into()),
            role,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            subject: None,
            role: Role::Anonymous,
        }
    }

    /// Admits administrative and service callers only.
    pub fn authorize(&self) -> Result<()> {
        let Some(subject) = self.subject.as_deref().filter(|s| !s.trim().is_empty()) else {
            return Err(ReminderError::Authorization(
                "unauthenticated caller".to_string(),
            ));
        };
        if !self.role.is_privileged() {
            return Err(ReminderError::Authorization(format!(
                "{subject} has role {} but admin or service is required",
                self.role
            )));
        }
        Ok(())
    }
}
