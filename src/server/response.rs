//! Response rendering
//!
//! Every body is JSON. Failures always carry an [`ErrorEnvelope`]; the
//! [`ErrorResponder`] only decides the status line.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::error;

use crate::config::ErrorMode;
use crate::types::{Endpoint, GatewayError};

pub type GatewayResponse = Response<Full<Bytes>>;

const SERIALIZATION_FAILURE: &[u8] =
    br#"{"key":"internal_error","value":"failed to encode response"}"#;

/// Serialize `body` as the JSON response body
pub fn json_response<T: Serialize + ?Sized>(status: StatusCode, body: &T) -> GatewayResponse {
    let (status, bytes) = match serde_json::to_vec(body) {
        Ok(bytes) => (status, Bytes::from(bytes)),
        Err(e) => {
            error!(error = %e, "Failed to encode response body");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Bytes::from_static(SERIALIZATION_FAILURE),
            )
        }
    };

    let mut response = Response::new(Full::new(bytes));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Empty response, used for CORS preflight
pub fn empty_response(status: StatusCode) -> GatewayResponse {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

/// Renders [`GatewayError`]s according to the configured [`ErrorMode`]
#[derive(Debug, Clone, Copy)]
pub struct ErrorResponder {
    mode: ErrorMode,
}

impl ErrorResponder {
    pub fn new(mode: ErrorMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ErrorMode {
        self.mode
    }

    /// Mode-dependent rendering.
    ///
    /// In compat mode eligible errors become HTTP 200 with the envelope.
    pub fn render(&self, err: &GatewayError) -> GatewayResponse {
        let status = match self.mode {
            ErrorMode::Compat if err.is_compat_eligible() => StatusCode::OK,
            _ => err.status_code(),
        };
        json_response(status, &err.envelope())
    }

    /// Status-coded rendering regardless of mode
    pub fn render_strict(&self, err: &GatewayError) -> GatewayResponse {
        json_response(err.status_code(), &err.envelope())
    }

    /// Rendering policy of an endpoint.
    ///
    /// `save_text` never uses the compat shape. The character lookup only
    /// folds its rate-limit rejection; its own failures keep their status.
    pub fn render_for(&self, endpoint: Option<Endpoint>, err: &GatewayError) -> GatewayResponse {
        match (endpoint, err) {
            (Some(Endpoint::SaveText), _) => self.render_strict(err),
            (Some(Endpoint::CharacterInfo), GatewayError::RateLimited) => self.render(err),
            (Some(Endpoint::CharacterInfo), _) => self.render_strict(err),
            _ => self.render(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorEnvelope;
    use http_body_util::BodyExt;

    async fn envelope(response: GatewayResponse) -> ErrorEnvelope {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_compat_mode_folds_expected_errors_into_200() {
        let responder = ErrorResponder::new(ErrorMode::Compat);
        let response = responder.render(&GatewayError::RateLimited);

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body = envelope(response).await;
        assert_eq!(body.key, "rate_limit_exceeded");
        assert_eq!(body.value, "request rate limit exceeded");
    }

    #[tokio::test]
    async fn test_http_mode_uses_status_codes() {
        let responder = ErrorResponder::new(ErrorMode::Http);
        let response = responder.render(&GatewayError::upstream("fetch_icon_image_error", "x"));
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(envelope(response).await.key, "fetch_icon_image_error");
    }

    #[test]
    fn test_auth_and_method_errors_never_folded() {
        let responder = ErrorResponder::new(ErrorMode::Compat);
        assert_eq!(
            responder
                .render(&GatewayError::Unauthorized("missing".into()))
                .status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            responder.render(&GatewayError::MethodNotAllowed).status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }

    #[test]
    fn test_save_endpoint_is_always_strict() {
        let responder = ErrorResponder::new(ErrorMode::Compat);
        let err = GatewayError::validation("text_required", "text is required");
        assert_eq!(
            responder.render_for(Some(Endpoint::SaveText), &err).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            responder
                .render_for(Some(Endpoint::HiddenAchievement), &err)
                .status(),
            StatusCode::OK
        );
    }

    #[test]
    fn test_character_lookup_folds_only_rate_limit() {
        let responder = ErrorResponder::new(ErrorMode::Compat);
        let invalid = GatewayError::validation("url_invalid", "bad url");
        let upstream = GatewayError::upstream("fetch_character_error", "timeout");

        assert_eq!(
            responder.render_for(Some(Endpoint::CharacterInfo), &invalid).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            responder.render_for(Some(Endpoint::CharacterInfo), &upstream).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            responder
                .render_for(Some(Endpoint::CharacterInfo), &GatewayError::RateLimited)
                .status(),
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_json_response_serializes_strings() {
        let response = json_response(StatusCode::OK, "achievementData/img/a/b/icon.png");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#""achievementData/img/a/b/icon.png""#);
    }
}
