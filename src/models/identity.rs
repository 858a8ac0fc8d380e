//! Acting identity passed to collaborator services

use serde::{Deserialize, Serialize};

pub const SYSTEM_EMAIL: &str = "system@repository.local";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    pub is_system: bool,
}

impl Identity {
    /// Identity used by scheduled jobs
    pub fn system() -> Self {
        Self {
            email: SYSTEM_EMAIL.to_string(),
            is_system: true,
        }
    }

    /// Identity of the configured service user of a workflow
    pub fn from_email(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            is_system: false,
        }
    }
}
