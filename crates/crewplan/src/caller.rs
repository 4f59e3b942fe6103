//! Explicit caller identity. Every core operation takes a `&Caller` instead
//! of reading an ambient session.

use serde::{Deserialize, Serialize};

use crate::error::SchedulingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerRole {
    Admin,
    Manager,
    Worker,
}

impl CallerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallerRole::Admin => "admin",
            CallerRole::Manager => "manager",
            CallerRole::Worker => "worker",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub id: String,
    pub role: CallerRole,
}

impl Caller {
    pub fn new(id: impl Into<String>, role: CallerRole) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    /// Rejects callers without an identity. Authorization is the host's job.
    pub fn ensure_identified(&self) -> Result<(), SchedulingError> {
        if self.id.trim().is_empty() {
            return Err(SchedulingError::Unauthenticated);
        }
        Ok(())
    }
}
