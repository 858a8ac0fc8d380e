//! OER export: LOM records to the bibliographic registry

use serde_json::json;

use crate::{
    config::RegistryConfig,
    convert::Convert,
    converters::LomToMarc21,
    error::{AppError, AppResult},
    marc::Marc21Metadata,
    models::Identity,
    services::Services,
};

/// Registry pid scheme on LOM records
pub const ALMA_PID: &str = "alma";

/// Create or update the registry record of one OER; returns the registry id
pub async fn create_in_alma(
    services: &Services,
    config: &RegistryConfig,
    identity: &Identity,
    lom_id: &str,
) -> AppResult<String> {
    let existing = services
        .registry
        .get_record(lom_id, &config.search_key)
        .await
        .map_err(|e| AppError::upstream(lom_id, e))?;
    if existing.is_some() {
        return Err(AppError::Warning(format!("duplicate in registry lom_id: {}", lom_id)));
    }

    let record = services
        .lom
        .read(identity, lom_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("lom_id {} not found", lom_id)))?;

    let mut marc = Marc21Metadata::new();
    LomToMarc21::convert(&record.data["metadata"], &mut marc)?;
    let xml = marc.to_marcxml();

    if let Some(mmsid) = record.pid(ALMA_PID) {
        services
            .registry
            .update_record(mmsid, &xml)
            .await
            .map_err(|e| AppError::upstream(lom_id, e))?;
        tracing::info!("OER {} updated in registry as {}", lom_id, mmsid);
        return Ok(mmsid.to_string());
    }

    let mmsid = services
        .registry
        .create_record(&xml)
        .await
        .map_err(|e| AppError::upstream(lom_id, e))?;

    let mut draft = services.lom.edit(identity, lom_id).await?;
    draft.data["pids"][ALMA_PID] = json!({"provider": ALMA_PID, "identifier": mmsid});
    services.lom.update_draft(identity, lom_id, draft.data).await?;
    services.lom.publish(identity, lom_id).await?;

    tracing::info!("OER {} created in registry as {}", lom_id, mmsid);
    Ok(mmsid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lom::LomRecordData;
    use crate::testing::Fixture;

    fn oer() -> LomRecordData {
        let mut data = LomRecordData::new("file");
        data.metadata.set_title("Lecture Slides", "en").unwrap();
        data.metadata.append_identifier("abc-123", "moodle").unwrap();
        data
    }

    #[tokio::test]
    async fn test_create_stores_registry_pid() {
        let mut fixture = Fixture::new();
        fixture.registry.expect_get_record().returning(|_, _| Ok(None));
        fixture
            .registry
            .expect_create_record()
            .withf(|xml| xml.contains("Lecture Slides"))
            .times(1)
            .returning(|_| Ok("990123".into()));
        fixture.registry.expect_update_record().never();
        let harness = fixture.build().await;
        harness.lom.insert_record("lom-1", oer().json());

        let mmsid = create_in_alma(&harness.services, &RegistryConfig::default(), &Identity::system(), "lom-1")
            .await
            .unwrap();
        assert_eq!(mmsid, "990123");

        let record = harness.lom.record("lom-1").unwrap();
        assert_eq!(record["pids"]["alma"]["identifier"], "990123");
    }

    #[tokio::test]
    async fn test_existing_pid_updates() {
        let mut fixture = Fixture::new();
        fixture.registry.expect_get_record().returning(|_, _| Ok(None));
        fixture.registry.expect_create_record().never();
        fixture
            .registry
            .expect_update_record()
            .withf(|mmsid, _| mmsid == "990123")
            .times(1)
            .returning(|_, _| Ok(()));
        let harness = fixture.build().await;
        harness.lom.insert_record("lom-1", oer().with_pid(ALMA_PID, "990123").json());

        create_in_alma(&harness.services, &RegistryConfig::default(), &Identity::system(), "lom-1")
            .await
            .unwrap();
        assert!(harness.lom.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_record_and_registry_duplicate() {
        let mut fixture = Fixture::new();
        fixture
            .registry
            .expect_get_record()
            .returning(|id, _| Ok((id == "lom-dup").then(|| "<record/>".to_string())));
        let harness = fixture.build().await;
        let config = RegistryConfig::default();

        let err = create_in_alma(&harness.services, &config, &Identity::system(), "lom-dup")
            .await
            .unwrap_err();
        assert!(err.is_warning());

        let err = create_in_alma(&harness.services, &config, &Identity::system(), "lom-missing")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
