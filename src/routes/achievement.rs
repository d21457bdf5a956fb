//! `GET /api/get_hidden_achievement`

use hyper::StatusCode;

use super::{QueryParams, TargetParams};
use crate::extract::extract_achievement;
use crate::server::{json_response, AppState, GatewayResponse};
use crate::types::GatewayError;

/// Scrape an achievement detail page into an editable record.
///
/// Only the record is returned; the icon is stored through `get_icon_img`.
pub async fn get_hidden_achievement(
    state: &AppState,
    query: &QueryParams,
) -> Result<GatewayResponse, GatewayError> {
    let params = TargetParams::from_query(query)?;
    if !state.targets.is_achievement_url(params.url) {
        return Err(GatewayError::validation(
            "invalid_url",
            "character achievement url is invalid",
        ));
    }

    let html = state
        .fetcher
        .fetch_text(params.url)
        .await
        .map_err(|e| GatewayError::upstream("fetch_hidden_achievement_error", e.to_string()))?;

    let record = extract_achievement(&html, params.url, params.category, params.group)
        .map_err(|e| GatewayError::extraction("fetch_hidden_achievement_error", e.to_string()))?;

    Ok(json_response(StatusCode::OK, &record))
}
