//! Collaborator interfaces and workflow state services
//!
//! The record services, the bibliographic registry and the source-system
//! clients live outside this crate. Orchestrators only see the traits below,
//! injected through [`Services`].

pub mod download;
pub mod openaccess;
pub mod theses;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    models::{Identity, RecordItem},
    repository::Repository,
};

pub use download::HttpFileDownloader;

/// A repository record service (MARC21 or LOM records)
#[async_trait]
pub trait RecordService: Send + Sync {
    /// Create a draft with `files` attached, publishing it when `publish` is set
    async fn create(
        &self,
        identity: &Identity,
        data: Value,
        files: Vec<PathBuf>,
        publish: bool,
    ) -> AppResult<RecordItem>;

    /// Open a draft of a published record
    async fn edit(&self, identity: &Identity, id: &str) -> AppResult<RecordItem>;

    async fn read(&self, identity: &Identity, id: &str) -> AppResult<Option<RecordItem>>;

    async fn read_draft(&self, identity: &Identity, id: &str) -> AppResult<Option<RecordItem>>;

    /// Replace the draft payload. Fails with [`AppError::StaleWrite`] when the
    /// draft changed underneath.
    async fn update_draft(&self, identity: &Identity, id: &str, data: Value) -> AppResult<RecordItem>;

    async fn publish(&self, identity: &Identity, id: &str) -> AppResult<RecordItem>;

    /// Fails with [`AppError::Validation`] when the draft does not pass the schema
    async fn validate_draft(&self, identity: &Identity, id: &str) -> AppResult<()>;

    async fn delete_draft(&self, identity: &Identity, id: &str) -> AppResult<()>;

    /// Record (draft or published) carrying `value` at the identifier path `category`
    async fn find_by_identifier(&self, value: &str, category: &str) -> AppResult<Option<RecordItem>>;

    /// Record id registered for an external pid
    async fn resolve_pid(&self, pid_type: &str, value: &str) -> AppResult<Option<String>>;

    /// Fail with [`AppError::Duplicate`] when a record already carries `value`
    async fn check_about_duplicate(&self, value: &str, category: &str) -> AppResult<()> {
        match self.find_by_identifier(value, category).await? {
            Some(record) => Err(AppError::Duplicate(format!(
                "{} already exists as {} ({})",
                value, record.id, category
            ))),
            None => Ok(()),
        }
    }
}

/// External bibliographic registry
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegistryService: Send + Sync {
    /// MARCXML of the record found under `search_key = value`
    async fn get_record(&self, value: &str, search_key: &str) -> AppResult<Option<String>>;

    /// Create a record from MARCXML, returning its registry id (mmsid)
    async fn create_record(&self, xml: &str) -> AppResult<String>;

    async fn update_record(&self, mmsid: &str, xml: &str) -> AppResult<()>;
}

/// Thesis status codes understood by the campus information system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThesisStatus {
    /// Archived in the repository
    Arch,
    /// Published in the repository
    Pub,
}

impl ThesisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThesisStatus::Arch => "ARCH",
            ThesisStatus::Pub => "PUB",
        }
    }
}

impl fmt::Display for ThesisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Campus information system thesis service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CampusOnlineClient: Send + Sync {
    /// Thesis document as XML
    async fn get_metadata(&self, cms_id: &str) -> AppResult<String>;

    /// Fulltext of the thesis, stored locally
    async fn download_file(&self, cms_id: &str) -> AppResult<PathBuf>;

    async fn set_status(
        &self,
        identity: &Identity,
        cms_id: &str,
        status: ThesisStatus,
        date: &str,
    ) -> AppResult<()>;
}

/// Research information system
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PureClient: Send + Sync {
    /// Tell the research system the publication is in the repository
    async fn mark_as_exported(&self, identity: &Identity, pure_id: &str, payload: Value) -> AppResult<()>;
}

/// Course platform web service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MoodleClient: Send + Sync {
    async fn download_file(&self, identity: &Identity, url: &str) -> AppResult<PathBuf>;
}

/// Downloads a file behind basic auth into local storage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileDownloader: Send + Sync {
    async fn download(&self, name: &str, url: &str, username: &str, password: &str) -> AppResult<PathBuf>;
}

/// External collaborators handed to [`Services::new`]
#[derive(Clone)]
pub struct Collaborators {
    pub marc21: Arc<dyn RecordService>,
    pub lom: Arc<dyn RecordService>,
    pub registry: Arc<dyn RegistryService>,
    pub campusonline: Arc<dyn CampusOnlineClient>,
    pub pure: Arc<dyn PureClient>,
    pub moodle: Arc<dyn MoodleClient>,
    pub downloader: Arc<dyn FileDownloader>,
}

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub theses: theses::ThesesService,
    pub openaccess: openaccess::OpenaccessService,
    pub marc21: Arc<dyn RecordService>,
    pub lom: Arc<dyn RecordService>,
    pub registry: Arc<dyn RegistryService>,
    pub campusonline: Arc<dyn CampusOnlineClient>,
    pub pure: Arc<dyn PureClient>,
    pub moodle: Arc<dyn MoodleClient>,
    pub downloader: Arc<dyn FileDownloader>,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, collaborators: Collaborators) -> Self {
        Self {
            theses: theses::ThesesService::new(repository.clone()),
            openaccess: openaccess::OpenaccessService::new(repository),
            marc21: collaborators.marc21,
            lom: collaborators.lom,
            registry: collaborators.registry,
            campusonline: collaborators.campusonline,
            pure: collaborators.pure,
            moodle: collaborators.moodle,
            downloader: collaborators.downloader,
        }
    }
}
