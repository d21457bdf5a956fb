//! `POST /api/save_text`
//!
//! Writes an edited document to one of the allow-listed paths. Failures
//! are always status-coded, whatever the error mode.

use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::StatusCode;
use tracing::{info, warn};

use crate::allowlist::is_allowed_save_path;
use crate::server::{json_response, AppState, GatewayResponse};
use crate::storage::StorageError;
use crate::types::{GatewayError, SaveTextRequest, SaveTextResponse};

pub async fn save_text<B>(state: &AppState, body: B) -> Result<GatewayResponse, GatewayError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let limit = state.config.max_request_body_bytes;
    let bytes = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            return Err(GatewayError::PayloadTooLarge(limit));
        }
        Err(e) => {
            warn!(error = %e, "Failed to read request body");
            return Err(GatewayError::validation("invalid_request_body", "invalid request body"));
        }
    };

    let request: SaveTextRequest = serde_json::from_slice(&bytes)
        .map_err(|_| GatewayError::validation("invalid_request_body", "invalid request body"))?;

    if request.text.trim().is_empty() {
        return Err(GatewayError::validation("text_required", "text is required"));
    }
    if !is_allowed_save_path(&request.path) {
        return Err(GatewayError::validation("path_not_allowed", "path is not allowed"));
    }
    if state.config.strict_json_validation
        && serde_json::from_str::<serde::de::IgnoredAny>(&request.text).is_err()
    {
        return Err(GatewayError::validation("invalid_json_text", "text is not valid json"));
    }

    state
        .storage
        .save_text(&request.path, &request.text)
        .await
        .map_err(|e| match e {
            StorageError::PermissionDenied(message) => GatewayError::PermissionDenied(message),
            other => {
                warn!(path = %request.path, error = %other, "Failed to save text");
                GatewayError::storage("save_text_error", "failed to save text")
            }
        })?;

    info!(path = %request.path, bytes = request.text.len(), "Saved text");

    Ok(json_response(
        StatusCode::OK,
        &SaveTextResponse {
            ok: true,
            bytes: request.text.len(),
            path: request.path,
            updated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        },
    ))
}
