//! Open access: research information system to repository
//!
//! Publications that are open access, CC BY licensed and validated in Pure
//! are imported and published directly, then marked as exported in Pure.

use serde_json::{json, Value};

use super::{is_duplicate, SOURCE_ID_CATEGORY};
use crate::{
    config::PureConfig,
    convert::Convert,
    converters::{pure::pure_id, PureToMarc21},
    error::{AppError, AppResult},
    marc::Marc21Metadata,
    models::{Access, Identity, ImportOutcome, OpenaccessEntry, OpenaccessStage},
    services::Services,
};

const OPEN_ACCESS: &[&str] = &["Open", "Offen"];
const LICENSE_PREFIX: &str = "CC BY";
const VALID_WORKFLOW: &str = "Valid";

fn term(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)?
        .pointer("/term/text/0/value")
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub fn access_type(electronic_version: &Value) -> Option<String> {
    term(electronic_version, "accessType")
}

pub fn license_type(electronic_version: &Value) -> Option<String> {
    term(electronic_version, "licenseType")
}

/// Workflow step of the publication in Pure
pub fn workflow_status(record: &Value) -> Option<&str> {
    record
        .pointer("/workflow/value/text/0/value")
        .and_then(Value::as_str)
}

fn is_open_cc_by(electronic_version: &Value) -> bool {
    let open = access_type(electronic_version).map_or(false, |a| OPEN_ACCESS.contains(&a.as_str()));
    let licensed = license_type(electronic_version).map_or(false, |l| l.starts_with(LICENSE_PREFIX));
    open && licensed
}

fn electronic_versions(record: &Value) -> impl Iterator<Item = &Value> {
    record
        .get("electronicVersions")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

/// File urls of the open access, CC BY licensed electronic versions
pub fn extract_file_urls(record: &Value) -> AppResult<Vec<String>> {
    let urls: Vec<String> = electronic_versions(record)
        .filter(|version| is_open_cc_by(version))
        .filter_map(|version| version.pointer("/file/fileURL"))
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();

    if urls.is_empty() {
        return Err(AppError::Validation {
            id: pure_id(record).unwrap_or_default(),
            message: "no open access CC BY file".into(),
        });
    }
    Ok(urls)
}

/// Whether a publication qualifies for import
pub async fn sieve(services: &Services, record: &Value) -> AppResult<bool> {
    let Some(id) = pure_id(record) else {
        return Ok(false);
    };
    if is_duplicate(services.marc21.as_ref(), &id, SOURCE_ID_CATEGORY).await? {
        return Ok(false);
    }

    let has_file = electronic_versions(record)
        .any(|version| version.get("file").is_some() && is_open_cc_by(version));

    Ok(has_file && workflow_status(record) == Some(VALID_WORKFLOW))
}

/// Import and publish one publication
pub async fn import_publication(
    services: &Services,
    config: &PureConfig,
    record: &Value,
) -> AppResult<ImportOutcome> {
    let id = pure_id(record).ok_or_else(|| AppError::Validation {
        id: String::new(),
        message: "record has no pureId".into(),
    })?;
    let urls = extract_file_urls(record)?;

    let mut files = Vec::with_capacity(urls.len());
    for (i, url) in urls.iter().enumerate() {
        let name = format!("{}-{}", id, i);
        let path = services
            .downloader
            .download(&name, url, &config.username, &config.password)
            .await?;
        files.push(path);
    }

    let mut marc = Marc21Metadata::new();
    PureToMarc21::convert(record, &mut marc)?;

    let mut data = marc.json();
    data["access"] = Access::public().json();

    let identity = Identity::from_email(&config.user_email);
    let published = services.marc21.create(&identity, data, files, true).await?;

    services.openaccess.create(&published.id, &id).await?;
    services
        .openaccess
        .set_state(&published.id, OpenaccessStage::ImportedInRepo)
        .await?;

    tracing::info!("Publication {} imported as {}", id, published.id);
    Ok(ImportOutcome::Created(published))
}

/// Tell Pure where the publication lives now and mark the stage
pub async fn mark_as_exported(services: &Services, entry: &OpenaccessEntry) -> AppResult<()> {
    let identity = Identity::system();
    let url = services
        .marc21
        .read(&identity, &entry.pid)
        .await?
        .and_then(|record| record.self_html().map(str::to_string));

    let payload = json!({"pid": entry.pid, "url": url});
    services
        .pure
        .mark_as_exported(&identity, &entry.pure_id, payload)
        .await
        .map_err(|e| AppError::upstream(entry.pure_id.as_str(), e))?;

    services
        .openaccess
        .set_state(&entry.pid, OpenaccessStage::MarkedAsExported)
        .await?;
    Ok(())
}
