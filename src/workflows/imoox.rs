//! MOOC platform courses to published LOM link records

use serde_json::{json, Value};

use crate::{
    convert::{Convert, ConvertError},
    converters::{
        imoox::{course_code, CATALOG},
        ImooxToLom,
    },
    error::{AppError, AppResult},
    lom::LomMetadata,
    models::{Access, Identity, ImportOutcome},
    services::Services,
};

/// Import and publish one course
///
/// A course already in the repository is skipped. A dry run stops after
/// the duplicate check and writes nothing.
pub async fn import_course(
    services: &Services,
    identity: &Identity,
    course: &Value,
    dry_run: bool,
) -> AppResult<ImportOutcome> {
    let code = course_code(course)
        .ok_or_else(|| ConvertError::invalid("courseCode", "course has no course code"))?;

    match services.lom.check_about_duplicate(code, CATALOG).await {
        Ok(()) => {}
        Err(AppError::Duplicate(message)) => {
            if dry_run {
                tracing::info!("DRY_RUN {}", message);
            } else {
                tracing::info!("{}", message);
            }
            return Ok(ImportOutcome::Duplicate(code.to_string()));
        }
        Err(err) => return Err(err),
    }

    if dry_run {
        tracing::info!("DRY_RUN imoox import success course_code: {}", code);
        return Ok(ImportOutcome::DryRun(code.to_string()));
    }

    let mut metadata = LomMetadata::new();
    ImooxToLom::convert(course, &mut metadata)?;

    let data = json!({
        "access": Access::public().json(),
        "files": {"enabled": false},
        "metadata": metadata.into_json(),
        "resource_type": "link",
    });

    let published = async {
        let draft = services.lom.create(identity, data, Vec::new(), false).await?;
        services.lom.publish(identity, &draft.id).await
    }
    .await
    .map_err(|err| match err {
        AppError::Validation { message, .. } => AppError::Validation {
            id: code.to_string(),
            message,
        },
        other => other,
    })?;

    tracing::info!("Course {} imported as {}", code, published.id);
    Ok(ImportOutcome::Created(published))
}
