//! Record handles returned by the record services

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A record or draft as returned by a record service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordItem {
    pub id: String,
    pub data: Value,
}

impl RecordItem {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Landing page of the record
    pub fn self_html(&self) -> Option<&str> {
        self.data.pointer("/links/self_html").and_then(Value::as_str)
    }

    /// External pid registered under `scheme` (e.g. `alma`)
    pub fn pid(&self, scheme: &str) -> Option<&str> {
        self.data
            .get("pids")
            .and_then(|pids| pids.get(scheme))
            .and_then(|pid| pid.get("identifier").or(Some(pid)))
            .and_then(Value::as_str)
    }
}

/// Result of a single-item import
#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    Created(RecordItem),
    /// Already imported; nothing was done
    Duplicate(String),
    /// Dry run finished without writing
    DryRun(String),
}

impl ImportOutcome {
    pub fn record(&self) -> Option<&RecordItem> {
        match self {
            ImportOutcome::Created(record) => Some(record),
            _ => None,
        }
    }
}
