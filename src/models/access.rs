//! Record and file visibility

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Until-date written for locked theses. Lifting the embargo is an
/// administrative act done by hand, so the date never expires on its own.
pub const EMBARGO_SENTINEL: &str = "9999-12-12";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Public,
    Restricted,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Public => "public",
            AccessLevel::Restricted => "restricted",
        }
    }

    fn parse(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("public") => AccessLevel::Public,
            _ => AccessLevel::Restricted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embargo {
    pub active: bool,
    pub until: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Embargo {
    /// Embargo with the far-future sentinel as until-date
    pub fn locked(reason: Option<String>) -> Self {
        Self {
            active: true,
            until: EMBARGO_SENTINEL.to_string(),
            reason,
        }
    }
}

/// Access block of a record payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Access {
    pub record: AccessLevel,
    pub files: AccessLevel,
    pub embargo: Option<Embargo>,
}

impl Access {
    pub fn new(record: AccessLevel, files: AccessLevel) -> Self {
        Self {
            record,
            files,
            embargo: None,
        }
    }

    pub fn public() -> Self {
        Self::new(AccessLevel::Public, AccessLevel::Public)
    }

    pub fn restricted() -> Self {
        Self::new(AccessLevel::Restricted, AccessLevel::Restricted)
    }

    pub fn with_embargo(mut self, embargo: Embargo) -> Self {
        self.embargo = Some(embargo);
        self
    }

    pub fn json(&self) -> Value {
        let mut access = json!({
            "record": self.record.as_str(),
            "files": self.files.as_str(),
        });
        if let Some(embargo) = &self.embargo {
            access["embargo"] = json!(embargo);
        }
        access
    }

    /// Parse an access block; anything unrecognised counts as restricted
    pub fn from_json(value: Option<&Value>) -> Self {
        let record = AccessLevel::parse(value.and_then(|v| v.get("record")));
        let files = AccessLevel::parse(value.and_then(|v| v.get("files")));
        let embargo = value
            .and_then(|v| v.get("embargo"))
            .and_then(|e| serde_json::from_value(e.clone()).ok());
        Self {
            record,
            files,
            embargo,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locked_embargo_json() {
        let access = Access::restricted().with_embargo(Embargo::locked(None));
        let json = access.json();
        assert_eq!(json["files"], "restricted");
        assert_eq!(json["embargo"]["until"], EMBARGO_SENTINEL);
        assert_eq!(json["embargo"]["active"], true);
        assert!(json["embargo"].get("reason").is_none());
        assert_eq!(Access::from_json(Some(&json)), access);
    }

    #[test]
    fn test_unknown_access_is_restricted() {
        let access = Access::from_json(Some(&json!({"record": "public", "files": "?"})));
        assert_eq!(access.record, AccessLevel::Public);
        assert_eq!(access.files, AccessLevel::Restricted);
        assert_eq!(Access::from_json(None), Access::restricted());
    }
}
