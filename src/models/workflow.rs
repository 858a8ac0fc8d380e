//! Workflow state rows and stage graphs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

/// A named stage of a workflow, backed by one boolean column
pub trait Stage: Copy + Eq + fmt::Display + FromStr<Err = AppError> + Send + Sync + 'static {
    /// Column holding the completion flag
    fn column(&self) -> &'static str;

    /// Stage that must be complete before this one is ready
    fn prerequisite(&self) -> Option<Self>;
}

/// A persisted workflow row
pub trait Entry {
    type Stage: Stage;

    fn pid(&self) -> &str;

    /// Identifier in the source system (campus id, Pure id)
    fn external_id(&self) -> &str;

    fn is_done(&self, stage: Self::Stage) -> bool;

    /// Prerequisite complete and own flag still open
    fn is_ready_to(&self, stage: Self::Stage) -> bool {
        let prerequisite = stage.prerequisite().map_or(true, |p| self.is_done(p));
        prerequisite && !self.is_done(stage)
    }
}

fn unknown_stage(name: &str) -> AppError {
    AppError::NotFound(format!("Stage {} not found", name))
}

/// Theses workflow: import, archive, create in registry, update, publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThesesStage {
    ImportedInRepo,
    ArchivedInCms,
    CreatedInAlma,
    UpdatedInRepo,
    PublishedInCms,
}

impl ThesesStage {
    pub const ALL: [ThesesStage; 5] = [
        ThesesStage::ImportedInRepo,
        ThesesStage::ArchivedInCms,
        ThesesStage::CreatedInAlma,
        ThesesStage::UpdatedInRepo,
        ThesesStage::PublishedInCms,
    ];
}

impl Stage for ThesesStage {
    fn column(&self) -> &'static str {
        match self {
            ThesesStage::ImportedInRepo => "imported_in_repo",
            ThesesStage::ArchivedInCms => "archived_in_cms",
            ThesesStage::CreatedInAlma => "created_in_alma",
            ThesesStage::UpdatedInRepo => "updated_in_repo",
            ThesesStage::PublishedInCms => "published_in_cms",
        }
    }

    fn prerequisite(&self) -> Option<Self> {
        match self {
            ThesesStage::ImportedInRepo => None,
            ThesesStage::ArchivedInCms => Some(ThesesStage::ImportedInRepo),
            ThesesStage::CreatedInAlma => Some(ThesesStage::ArchivedInCms),
            ThesesStage::UpdatedInRepo => Some(ThesesStage::CreatedInAlma),
            ThesesStage::PublishedInCms => Some(ThesesStage::UpdatedInRepo),
        }
    }
}

impl fmt::Display for ThesesStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Accepts the stage form (`archived_in_cms`) and the action form (`archive_in_cms`)
impl FromStr for ThesesStage {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "imported_in_repo" | "import_in_repo" => Ok(ThesesStage::ImportedInRepo),
            "archived_in_cms" | "archive_in_cms" => Ok(ThesesStage::ArchivedInCms),
            "created_in_alma" | "create_in_alma" => Ok(ThesesStage::CreatedInAlma),
            "updated_in_repo" | "update_in_repo" => Ok(ThesesStage::UpdatedInRepo),
            "published_in_cms" | "publish_in_cms" => Ok(ThesesStage::PublishedInCms),
            other => Err(unknown_stage(other)),
        }
    }
}

/// Open access workflow: import from the research system, then mark as exported there
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenaccessStage {
    ImportedInRepo,
    MarkedAsExported,
}

impl Stage for OpenaccessStage {
    fn column(&self) -> &'static str {
        match self {
            OpenaccessStage::ImportedInRepo => "imported_in_repo",
            OpenaccessStage::MarkedAsExported => "marked_as_exported",
        }
    }

    fn prerequisite(&self) -> Option<Self> {
        match self {
            OpenaccessStage::ImportedInRepo => None,
            OpenaccessStage::MarkedAsExported => Some(OpenaccessStage::ImportedInRepo),
        }
    }
}

impl fmt::Display for OpenaccessStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for OpenaccessStage {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "imported_in_repo" | "import_in_repo" => Ok(OpenaccessStage::ImportedInRepo),
            "marked_as_exported" | "mark_as_exported" => Ok(OpenaccessStage::MarkedAsExported),
            other => Err(unknown_stage(other)),
        }
    }
}

/// Row of `workflows_theses`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ThesesEntry {
    pub pid: String,
    pub cms_id: String,
    pub imported_in_repo: bool,
    pub archived_in_cms: bool,
    pub created_in_alma: bool,
    pub updated_in_repo: bool,
    pub published_in_cms: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry for ThesesEntry {
    type Stage = ThesesStage;

    fn pid(&self) -> &str {
        &self.pid
    }

    fn external_id(&self) -> &str {
        &self.cms_id
    }

    fn is_done(&self, stage: ThesesStage) -> bool {
        match stage {
            ThesesStage::ImportedInRepo => self.imported_in_repo,
            ThesesStage::ArchivedInCms => self.archived_in_cms,
            ThesesStage::CreatedInAlma => self.created_in_alma,
            ThesesStage::UpdatedInRepo => self.updated_in_repo,
            ThesesStage::PublishedInCms => self.published_in_cms,
        }
    }
}

/// Row of `workflows_openaccess`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct OpenaccessEntry {
    pub pid: String,
    pub pure_id: String,
    pub imported_in_repo: bool,
    pub marked_as_exported: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry for OpenaccessEntry {
    type Stage = OpenaccessStage;

    fn pid(&self) -> &str {
        &self.pid
    }

    fn external_id(&self) -> &str {
        &self.pure_id
    }

    fn is_done(&self, stage: OpenaccessStage) -> bool {
        match stage {
            OpenaccessStage::ImportedInRepo => self.imported_in_repo,
            OpenaccessStage::MarkedAsExported => self.marked_as_exported,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!("archive_in_cms".parse::<ThesesStage>().unwrap(), ThesesStage::ArchivedInCms);
        assert_eq!("archived_in_cms".parse::<ThesesStage>().unwrap(), ThesesStage::ArchivedInCms);
        assert_eq!(
            "mark_as_exported".parse::<OpenaccessStage>().unwrap(),
            OpenaccessStage::MarkedAsExported
        );
        assert!("publish_in_alma".parse::<ThesesStage>().is_err());
    }

    #[test]
    fn test_linear_theses_graph() {
        let mut previous = None;
        for stage in ThesesStage::ALL {
            assert_eq!(stage.prerequisite(), previous);
            previous = Some(stage);
        }
    }

    #[test]
    fn test_is_ready_to() {
        let now = Utc::now();
        let entry = ThesesEntry {
            pid: "abc".into(),
            cms_id: "1".into(),
            imported_in_repo: true,
            archived_in_cms: false,
            created_in_alma: false,
            updated_in_repo: false,
            published_in_cms: false,
            created_at: now,
            updated_at: now,
        };
        assert!(entry.is_ready_to(ThesesStage::ArchivedInCms));
        assert!(!entry.is_ready_to(ThesesStage::CreatedInAlma));
        assert!(!entry.is_ready_to(ThesesStage::ImportedInRepo));
    }
}
