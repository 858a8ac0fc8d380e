//! Thesis permalinks
//!
//! Campus system pages link theses by their campus id. The link resolves to
//! the landing page of the repository record, the draft while one is open.

use axum::{
    extract::{Path, State},
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Response},
};

use crate::{
    error::{AppError, AppResult},
    models::Identity,
    workflows::{read_current, SOURCE_ID_CATEGORY},
    AppState,
};

/// Redirect (301) to the record imported for `cms_id`
///
/// Unknown ids answer 423: the thesis may still be on its way in.
pub async fn record_from_cms_id(
    State(state): State<AppState>,
    Path(cms_id): Path<String>,
) -> AppResult<Response> {
    let marc21 = state.services.marc21.as_ref();
    let found = marc21
        .find_by_identifier(&cms_id, SOURCE_ID_CATEGORY)
        .await?
        .ok_or_else(|| AppError::Locked(format!("No record for cms_id {}", cms_id)))?;

    let current = read_current(marc21, &Identity::system(), &found.id).await?;
    let location = current
        .self_html()
        .ok_or_else(|| AppError::Internal(format!("Record {} has no self_html link", current.id)))?
        .to_string();

    Ok((StatusCode::MOVED_PERMANENTLY, [(LOCATION, location)]).into_response())
}
