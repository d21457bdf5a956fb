//! `GET /api/get_icon_img`

use hyper::StatusCode;
use tracing::{debug, warn};

use super::{QueryParams, TargetParams};
use crate::extract::achievement_icon_path;
use crate::server::{json_response, AppState, GatewayResponse};
use crate::storage::StorageError;
use crate::types::GatewayError;

/// Download an achievement icon and store it; responds with the stored path
pub async fn get_icon_img(
    state: &AppState,
    query: &QueryParams,
) -> Result<GatewayResponse, GatewayError> {
    let params = TargetParams::from_query(query)?;
    if !state.targets.is_icon_url(params.url) {
        return Err(GatewayError::validation("invalid_icon_url", "icon url is invalid"));
    }

    let icon_path = achievement_icon_path(params.category, params.group, params.url);

    let image = state
        .fetcher
        .fetch_binary(params.url)
        .await
        .map_err(|e| GatewayError::upstream("fetch_icon_image_error", e.to_string()))?;

    state
        .storage
        .save_binary(&icon_path, image.bytes, &image.content_type)
        .await
        .map_err(|e| match e {
            StorageError::PermissionDenied(message) => {
                warn!(path = %icon_path, error = %message, "Icon write refused by storage");
                GatewayError::storage_denied("save_icon_image_error", message)
            }
            other => {
                warn!(path = %icon_path, error = %other, "Failed to store icon");
                GatewayError::storage("save_icon_image_error", other.to_string())
            }
        })?;

    debug!(path = %icon_path, "Stored icon");
    Ok(json_response(StatusCode::OK, &icon_path))
}
