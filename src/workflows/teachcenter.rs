//! Course platform (TeachCenter) items to LOM records
//!
//! An item is looked up by its `moodle` pid. Unknown items become new
//! records with their file attached; known items only gain the courses
//! they are newly used in.

use std::path::PathBuf;

use serde_json::Value;

use crate::{
    convert::Convert,
    converters::{TeachCenterKey, TeachCenterToLom},
    error::{AppError, AppResult},
    lom::{LomMetadata, LomRecordData},
    models::{Identity, ImportOutcome},
    services::Services,
};

/// Pid scheme and identifier catalog of course platform items
pub const MOODLE_PID: &str = "moodle";

enum Status {
    New,
    /// `opened` when this import opened the draft
    Edit { id: String, opened: bool },
}

/// Identifier texts of every course already linked to a record
fn linked_course_ids(metadata: &LomMetadata) -> Vec<&str> {
    metadata
        .courses()
        .iter()
        .filter_map(|course| course.pointer("/course/identifier"))
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(|identifier| identifier.pointer("/entry/langstring/#text"))
        .filter_map(Value::as_str)
        .collect()
}

async fn remove_files(files: &[PathBuf]) {
    for file in files {
        if let Err(e) = tokio::fs::remove_file(file).await {
            tracing::warn!("Could not remove {}: {}", file.display(), e);
        }
    }
}

pub async fn import_item(
    services: &Services,
    identity: &Identity,
    item: &Value,
    dry_run: bool,
) -> AppResult<ImportOutcome> {
    let key = TeachCenterKey::from_json(item)?;
    let moodle_pid = key.moodle_pid();

    let (mut data, status) = match services.lom.resolve_pid(MOODLE_PID, moodle_pid).await? {
        None => {
            let mut data = LomRecordData::new(key.resource_type()).with_pid(MOODLE_PID, moodle_pid);
            data.metadata.append_identifier(moodle_pid, MOODLE_PID)?;
            (data, Status::New)
        }
        Some(id) => {
            let opened = services.lom.read_draft(identity, &id).await?.is_none();
            let draft = services.lom.edit(identity, &id).await?;
            (LomRecordData::from_json(&draft.data)?, Status::Edit { id, opened })
        }
    };

    let ctx = match &status {
        Status::New => TeachCenterToLom::convert(item, &mut data.metadata)?,
        Status::Edit { .. } => TeachCenterToLom::convert(item, &mut LomMetadata::new())?,
    };

    let mut files = Vec::new();
    if let (Status::New, TeachCenterKey::File { .. }) = (&status, &key) {
        let url = ctx.file_url.as_deref().ok_or_else(|| AppError::MissingAsset {
            id: moodle_pid.to_string(),
            message: "item has no file url".into(),
        })?;
        files.push(services.moodle.download_file(identity, url).await?);
    }

    if dry_run {
        if let Status::Edit { id, opened: true } = &status {
            services.lom.delete_draft(identity, id).await?;
        }
        remove_files(&files).await;
        tracing::info!("DRY_RUN teachcenter import success id: {}", moodle_pid);
        return Ok(ImportOutcome::DryRun(moodle_pid.to_string()));
    }

    match status {
        Status::New => {
            let record = services.lom.create(identity, data.json(), files, true).await?;
            tracing::info!("Item {} imported as {}", moodle_pid, record.id);
            Ok(ImportOutcome::Created(record))
        }
        Status::Edit { id, opened } => {
            let linked = linked_course_ids(&data.metadata);
            if ctx.course_ids.iter().any(|course| linked.contains(&course.as_str())) {
                if opened {
                    services.lom.delete_draft(identity, &id).await?;
                }
                return Err(AppError::Warning(format!("course already in record pid: {}", id)));
            }

            for course in &ctx.courses {
                if !data.metadata.courses().contains(course.json()) {
                    data.metadata.append_course(course)?;
                }
            }

            services.lom.update_draft(identity, &id, data.json()).await?;
            let record = services.lom.publish(identity, &id).await?;
            tracing::info!("Item {} linked to {} new course(s) in {}", moodle_pid, ctx.courses.len(), id);
            Ok(ImportOutcome::Created(record))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use serde_json::json;

    fn item(course_id: &str) -> Value {
        json!({
            "title": "Lecture Slides",
            "year": "2024",
            "semester": "WS",
            "language": "en",
            "fileurl": "https://tc.test/file.pdf",
            "contenthash": "0123abcd",
            "courses": [{"courseid": course_id, "coursename": "Systems Programming"}]
        })
    }

    fn downloads(fixture: &mut Fixture, dir: &std::path::Path) {
        let dir = dir.to_path_buf();
        fixture.moodle.expect_download_file().times(1).returning(move |_, _| {
            let path = dir.join("slides.pdf");
            std::fs::write(&path, b"%PDF").unwrap();
            Ok(path)
        });
    }

    #[tokio::test]
    async fn test_new_item_is_created_with_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut fixture = Fixture::new();
        downloads(&mut fixture, dir.path());
        let harness = fixture.build().await;

        let outcome = import_item(&harness.services, &Identity::system(), &item("448.001"), false)
            .await
            .unwrap();
        let record = outcome.record().unwrap();

        assert_eq!(record.pid(MOODLE_PID), Some("0123abcd"));
        assert_eq!(record.data["resource_type"], "file");
        assert_eq!(harness.lom.files(&record.id), vec![dir.path().join("slides.pdf")]);
        let metadata = LomMetadata::from_json(record.data["metadata"].clone()).unwrap();
        assert_eq!(metadata.identifiers(), vec!["0123abcd"]);
        assert_eq!(metadata.courses().len(), 1);
    }

    #[tokio::test]
    async fn test_known_item_gains_new_course() {
        let dir = tempfile::tempdir().unwrap();
        let mut fixture = Fixture::new();
        downloads(&mut fixture, dir.path());
        let harness = fixture.build().await;
        let identity = Identity::system();

        let first = import_item(&harness.services, &identity, &item("448.001"), false)
            .await
            .unwrap();
        let id = first.record().unwrap().id.clone();

        let second = import_item(&harness.services, &identity, &item("448.002"), false)
            .await
            .unwrap();
        assert_eq!(second.record().unwrap().id, id);
        let metadata = LomMetadata::from_json(harness.lom.record(&id).unwrap()["metadata"].clone()).unwrap();
        assert_eq!(metadata.courses().len(), 2);

        let err = import_item(&harness.services, &identity, &item("448.002"), false)
            .await
            .unwrap_err();
        assert!(err.is_warning());
        assert!(err.to_string().contains(&id));
        assert!(harness.lom.draft(&id).is_none());
    }

    #[tokio::test]
    async fn test_dry_run_removes_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let mut fixture = Fixture::new();
        downloads(&mut fixture, dir.path());
        let harness = fixture.build().await;

        let outcome = import_item(&harness.services, &Identity::system(), &item("448.001"), true)
            .await
            .unwrap();
        assert_eq!(outcome, ImportOutcome::DryRun("0123abcd".into()));
        assert!(harness.lom.is_empty());
        assert!(!dir.path().join("slides.pdf").exists());
    }
}
