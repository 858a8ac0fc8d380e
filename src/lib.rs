//! Repository workflows
//!
//! Converts bibliographic and learning-object records from external source
//! systems (campus information system, research information system, MOOC
//! platform, learning management system, digital library export) into MARC21
//! and LOM records, and drives the multi-stage import/export workflows that
//! create, update and publish them in the repository.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod convert;
pub mod converters;
pub mod error;
pub mod jobs;
pub mod lom;
pub mod marc;
pub mod models;
pub mod repository;
pub mod services;
pub mod telemetry;
pub mod workflows;

#[cfg(test)]
pub(crate) mod testing;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across HTTP handlers and scheduled jobs
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
