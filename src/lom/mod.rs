//! Learning Object Metadata (LOM) records

pub mod record;

pub use record::{langstring, LomMetadata, NO_LANGUAGE};

use serde_json::{json, Value};

use crate::models::access::Access;

/// Complete payload for the LOM record service
#[derive(Debug, Clone)]
pub struct LomRecordData {
    pub resource_type: String,
    pub access: Access,
    pub files_enabled: bool,
    pub pids: Value,
    pub metadata: LomMetadata,
}

impl LomRecordData {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            access: Access::public(),
            files_enabled: true,
            pids: json!({}),
            metadata: LomMetadata::new(),
        }
    }

    /// Register an external pid (e.g. `moodle`) on the record
    pub fn with_pid(mut self, scheme: &str, identifier: &str) -> Self {
        self.pids[scheme] = json!({
            "provider": scheme,
            "identifier": identifier,
        });
        self
    }

    pub fn json(&self) -> Value {
        json!({
            "access": self.access.json(),
            "files": {"enabled": self.files_enabled},
            "metadata": self.metadata.json(),
            "pids": self.pids,
            "resource_type": self.resource_type,
        })
    }

    /// Rebuild from a record service payload
    pub fn from_json(value: &Value) -> crate::convert::ConvertResult<Self> {
        let resource_type = value
            .get("resource_type")
            .and_then(Value::as_str)
            .unwrap_or("file")
            .to_string();
        let metadata = LomMetadata::from_json(
            value.get("metadata").cloned().unwrap_or_else(|| LomMetadata::new().into_json()),
        )?;
        Ok(Self {
            resource_type,
            access: Access::from_json(value.get("access")),
            files_enabled: value
                .pointer("/files/enabled")
                .and_then(Value::as_bool)
                .unwrap_or(true),
            pids: value.get("pids").cloned().unwrap_or_else(|| json!({})),
            metadata,
        })
    }
}
