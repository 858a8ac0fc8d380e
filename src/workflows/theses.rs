//! Theses: campus information system to repository and registry
//!
//! A thesis is imported as a restricted draft, archived in the campus
//! system, created in the registry, updated from the curated registry
//! record and finally reported as published.

use serde_json::Value;

use super::{is_duplicate, read_current, SOURCE_ID_CATEGORY};
use crate::{
    config::{CampusOnlineConfig, RegistryConfig},
    convert::{Convert, Element},
    converters::CampusOnlineToMarc21,
    error::{AppError, AppResult},
    marc::{is_restricted, Marc21Metadata},
    models::{Access, AccessLevel, Embargo, Identity, ImportOutcome, ThesesEntry, ThesesStage},
    services::{Services, ThesisStatus},
};

/// False when `VOLLTEXT` is missing or `N`
pub fn has_fulltext(thesis: &Element) -> bool {
    thesis
        .find_attr("VOLLTEXT")
        .map_or(false, |volltext| volltext.text() != "N")
}

/// Draft payload of a converted thesis: restricted, with a locked embargo
/// when the campus system declares a lock period
pub fn thesis_payload(record: &Marc21Metadata) -> Value {
    let mut access = Access::restricted();
    if is_restricted(record) {
        access = access.with_embargo(Embargo::locked(None));
    }

    let mut data = record.json();
    data["access"] = access.json();
    data
}

/// Import one thesis as an unpublished draft
pub async fn import_thesis(
    services: &Services,
    config: &CampusOnlineConfig,
    cms_id: &str,
) -> AppResult<ImportOutcome> {
    if is_duplicate(services.marc21.as_ref(), cms_id, SOURCE_ID_CATEGORY).await? {
        return Ok(ImportOutcome::Duplicate(cms_id.to_string()));
    }

    let xml = services.campusonline.get_metadata(cms_id).await?;
    let thesis = Element::parse(&xml)?;

    if !has_fulltext(&thesis) {
        return Err(AppError::MissingAsset {
            id: cms_id.to_string(),
            message: "record has no associated file".into(),
        });
    }

    let file = services.campusonline.download_file(cms_id).await?;

    let mut record = CampusOnlineToMarc21::skeleton()?;
    CampusOnlineToMarc21::convert(&thesis, &mut record)?;

    let identity = Identity::from_email(&config.user_email);
    let draft = services
        .marc21
        .create(&identity, thesis_payload(&record), vec![file], false)
        .await?;

    services.theses.create(&draft.id, cms_id).await?;
    services.theses.set_state(&draft.id, ThesesStage::ImportedInRepo).await?;

    tracing::info!("Thesis {} imported as {}", cms_id, draft.id);
    Ok(ImportOutcome::Created(draft))
}

/// Report `status` to the campus system and mark the matching stage
pub async fn set_cms_status(
    services: &Services,
    entry: &ThesesEntry,
    status: ThesisStatus,
    date: &str,
) -> AppResult<()> {
    let stage = match status {
        ThesisStatus::Arch => ThesesStage::ArchivedInCms,
        ThesisStatus::Pub => ThesesStage::PublishedInCms,
    };

    services
        .campusonline
        .set_status(&Identity::system(), &entry.cms_id, status, date)
        .await?;
    services.theses.set_state(&entry.pid, stage).await?;
    Ok(())
}

/// Create the registry record from the current draft
pub async fn create_in_alma(services: &Services, config: &RegistryConfig, entry: &ThesesEntry) -> AppResult<String> {
    let cms_id = entry.cms_id.as_str();
    let existing = services
        .registry
        .get_record(cms_id, &config.search_key)
        .await
        .map_err(|e| AppError::upstream(cms_id, e))?;
    if existing.is_some() {
        return Err(AppError::Warning(format!("duplicate in registry cms_id: {}", cms_id)));
    }

    let current = read_current(services.marc21.as_ref(), &Identity::system(), &entry.pid).await?;
    let record = Marc21Metadata::from_json(&current.data)?;

    let mmsid = services
        .registry
        .create_record(&record.to_marcxml())
        .await
        .map_err(|e| AppError::upstream(cms_id, e))?;

    services.theses.set_state(&entry.pid, ThesesStage::CreatedInAlma).await?;
    Ok(mmsid)
}

/// Catalog identifiers (035 $a) issued by the authoritative catalog
fn is_curated(record: &Marc21Metadata, prefix: &str) -> AppResult<bool> {
    Ok(record
        .subfield_values("035...a")?
        .iter()
        .any(|id| id.starts_with(prefix)))
}

/// Replace the repository metadata with the curated registry record and publish
///
/// File access follows the restriction marker of the stored record, never
/// the registry copy.
pub async fn update_in_repo(services: &Services, config: &RegistryConfig, entry: &ThesesEntry) -> AppResult<()> {
    let identity = Identity::system();
    let (pid, cms_id) = (entry.pid.as_str(), entry.cms_id.as_str());

    let current = read_current(services.marc21.as_ref(), &identity, pid).await?;

    let xml = services
        .registry
        .get_record(cms_id, &config.search_key)
        .await
        .map_err(|e| AppError::upstream(cms_id, e))?
        .ok_or_else(|| AppError::NotYetUpdated(cms_id.to_string()))?;
    let registry_record = Marc21Metadata::from_marcxml(&xml)?;

    if !is_curated(&registry_record, &config.authoritative_prefix)? {
        return Err(AppError::NotYetUpdated(cms_id.to_string()));
    }

    let stored = Marc21Metadata::from_json(&current.data)?;
    let stored_access = Access::from_json(current.data.get("access"));
    let access = if is_restricted(&stored) {
        let mut access = Access::new(AccessLevel::Public, AccessLevel::Restricted);
        access.embargo = stored_access.embargo;
        access
    } else {
        Access::public()
    };

    let mut data = registry_record.json();
    data["access"] = access.json();

    if services.marc21.read_draft(&identity, pid).await?.is_none() {
        services.marc21.edit(&identity, pid).await?;
    }
    services.marc21.update_draft(&identity, pid, data).await?;
    services.marc21.validate_draft(&identity, pid).await?;
    services.marc21.publish(&identity, pid).await?;

    services.theses.set_state(pid, ThesesStage::UpdatedInRepo).await?;
    Ok(())
}
