//! `GET /api/get_character_info`, the one unauthenticated endpoint

use hyper::StatusCode;
use tracing::warn;

use super::QueryParams;
use crate::allowlist::normalize_profile_url;
use crate::extract::extract_character;
use crate::server::{json_response, AppState, GatewayResponse};
use crate::types::GatewayError;

pub async fn get_character_info(
    state: &AppState,
    query: &QueryParams,
) -> Result<GatewayResponse, GatewayError> {
    let raw_url = query.get("url");
    if raw_url.is_empty() {
        return Err(GatewayError::validation("url_invalid", "URLを設定してください。"));
    }

    let profile_url = normalize_profile_url(raw_url);
    let character_id = state.targets.match_profile(&profile_url).ok_or_else(|| {
        GatewayError::validation(
            "url_invalid",
            "URLはloadstoneのキャラクターページを貼ってください。",
        )
    })?;

    let html = state.fetcher.fetch_text(&profile_url).await.map_err(|e| {
        warn!(url = %profile_url, error = %e, "Character page fetch failed");
        GatewayError::upstream("fetch_character_error", e.to_string())
    })?;

    let character = extract_character(&html, character_id)
        .map_err(|e| GatewayError::extraction("fetch_character_error", e.to_string()))?;

    Ok(json_response(StatusCode::OK, &character))
}
