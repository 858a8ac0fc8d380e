//! Workflow orchestrators
//!
//! Each entry point takes the injected [`Services`](crate::services::Services)
//! and one external identifier or source record, and runs one item through
//! its pipeline: duplicate check, fetch, convert, assemble, create, record
//! state. Batch sweeps over ready entries live in [`crate::jobs`].

pub mod diglib;
pub mod imoox;
pub mod oer;
pub mod openaccess;
pub mod teachcenter;
pub mod theses;

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{Identity, RecordItem},
    services::RecordService,
};

/// Identifier path of the source-system id (campus id, Pure id) in MARC records
pub const SOURCE_ID_CATEGORY: &str = "995.subfields.d";

/// Timestamp format expected by the campus system
pub fn today() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// The draft if one is in progress, the published record otherwise
pub async fn read_current(service: &dyn RecordService, identity: &Identity, id: &str) -> AppResult<RecordItem> {
    if let Some(draft) = service.read_draft(identity, id).await? {
        return Ok(draft);
    }
    service
        .read(identity, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Record {} not found", id)))
}

/// Run the duplicate check; `Ok(true)` when `value` is already imported
async fn is_duplicate(service: &dyn RecordService, value: &str, category: &str) -> AppResult<bool> {
    match service.check_about_duplicate(value, category).await {
        Ok(()) => Ok(false),
        Err(err) if err.is_duplicate() => {
            tracing::info!("{}", err);
            Ok(true)
        }
        Err(err) => Err(err),
    }
}
