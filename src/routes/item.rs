//! `GET /api/get_item_infomation`
//!
//! The path keeps its historical spelling; the front-end calls it as is.

use hyper::StatusCode;
use tracing::warn;

use super::{QueryParams, TargetParams};
use crate::extract::extract_item;
use crate::server::{json_response, AppState, GatewayResponse};
use crate::types::GatewayError;

const ERROR_KEY: &str = "fetch_item_information_error";

/// Scrape an item page, store its image and return the item award fields
pub async fn get_item_information(
    state: &AppState,
    query: &QueryParams,
) -> Result<GatewayResponse, GatewayError> {
    let params = TargetParams::from_query(query)?;
    if !state.targets.is_item_url(params.url) {
        return Err(GatewayError::validation("invalid_item_url", "item url is invalid"));
    }

    let html = state
        .fetcher
        .fetch_text(params.url)
        .await
        .map_err(|e| GatewayError::upstream(ERROR_KEY, e.to_string()))?;

    let item = extract_item(&html, params.url, params.category, params.group)
        .map_err(|e| GatewayError::extraction(ERROR_KEY, e.to_string()))?;

    let image = state
        .fetcher
        .fetch_binary(&item.item_award_image_url)
        .await
        .map_err(|e| GatewayError::upstream(ERROR_KEY, e.to_string()))?;

    state
        .storage
        .save_binary(&item.item_award_image_path, image.bytes, &image.content_type)
        .await
        .map_err(|e| {
            warn!(path = %item.item_award_image_path, error = %e, "Failed to store item image");
            GatewayError::upstream(ERROR_KEY, e.to_string())
        })?;

    Ok(json_response(StatusCode::OK, &item))
}
