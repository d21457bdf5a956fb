//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo, one task per connection. Routing is an
//! exact match on the path; the per-request pipeline is
//!
//! 1. resolve the endpoint (404 otherwise)
//! 2. authenticated endpoints: bearer token, validator, rate limit, method
//! 3. public endpoint: method, rate limit keyed by peer address
//! 4. handler
//!
//! Every response gets `X-Request-Id`, CORS headers when an admin origin
//! is configured, and one access-log event.

use bytes::Bytes;
use hyper::body::{Body, Incoming};
use hyper::header::{HeaderName, HeaderValue, AUTHORIZATION};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use super::response::{empty_response, ErrorResponder, GatewayResponse};
use crate::allowlist::TargetUrlAllowList;
use crate::auth::{extract_bearer_token, Actor, TokenValidator};
use crate::config::GatewayConfig;
use crate::fetcher::ContentFetcher;
use crate::logging::{RequestIdGenerator, RequestLog};
use crate::rate_limit::RateLimiter;
use crate::routes::{self, QueryParams};
use crate::storage::TextStorage;
use crate::types::{Endpoint, GatewayError};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared application state
pub struct AppState {
    pub config: GatewayConfig,
    pub token_validator: Arc<dyn TokenValidator>,
    pub storage: Arc<dyn TextStorage>,
    pub rate_limiter: Arc<RateLimiter>,
    pub request_ids: RequestIdGenerator,
    pub fetcher: ContentFetcher,
    pub targets: TargetUrlAllowList,
    pub responder: ErrorResponder,
}

impl AppState {
    pub fn new(
        config: GatewayConfig,
        token_validator: Arc<dyn TokenValidator>,
        storage: Arc<dyn TextStorage>,
    ) -> Result<Self, GatewayError> {
        let fetcher = ContentFetcher::new(config.fetch_timeout)
            .map_err(|e| GatewayError::Config(e.to_string()))?;
        let rate_limiter = Arc::new(RateLimiter::new(
            config.save_limit_per_minute,
            config.read_limit_per_minute,
        ));

        Ok(Self {
            responder: ErrorResponder::new(config.error_mode),
            config,
            token_validator,
            storage,
            rate_limiter,
            request_ids: RequestIdGenerator::new(),
            fetcher,
            targets: TargetUrlAllowList::lodestone(),
        })
    }

    /// Replace the scrape target allow-list
    pub fn with_targets(mut self, targets: TargetUrlAllowList) -> Self {
        self.targets = targets;
        self
    }
}

/// Per-request values threaded through the pipeline
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub peer: SocketAddr,
    pub endpoint: Option<Endpoint>,
    pub actor: Option<Actor>,
}

impl RequestContext {
    pub fn new(request_id: String, peer: SocketAddr) -> Self {
        Self {
            request_id,
            peer,
            endpoint: None,
            actor: None,
        }
    }
}

/// Start the HTTP server and serve until Ctrl-C
pub async fn run(state: Arc<AppState>, listen: SocketAddr) -> Result<(), GatewayError> {
    let listener = TcpListener::bind(listen).await?;
    info!("Gateway listening on {}", listen);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let state = Arc::clone(&state);
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);

                        let service = service_fn(move |req: Request<Incoming>| {
                            let state = Arc::clone(&state);
                            async move { Ok::<_, Infallible>(handle_request(state, addr, req).await) }
                        });

                        if let Err(err) = http1::Builder::new()
                            .title_case_headers(true)
                            .serve_connection(io, service)
                            .await
                        {
                            error!("Error serving connection from {}: {:?}", addr, err);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {:?}", e);
                }
            },
            _ = &mut shutdown => {
                info!("Shutdown signal received, no longer accepting connections");
                return Ok(());
            }
        }
    }
}

/// Handle one request end to end; never fails
pub async fn handle_request<B>(
    state: Arc<AppState>,
    peer: SocketAddr,
    req: Request<B>,
) -> GatewayResponse
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let mut ctx = RequestContext::new(state.request_ids.next_id(), peer);

    let (mut response, error_code) = match route(&state, &mut ctx, req).await {
        Ok(response) => (response, None),
        Err(err) => {
            if err.status_code().is_server_error() {
                warn!(request_id = %ctx.request_id, error = %err, "Request failed");
            }
            (
                state.responder.render_for(ctx.endpoint, &err),
                Some(err.key().to_string()),
            )
        }
    };

    decorate(&state.config, &ctx.request_id, &mut response);

    RequestLog {
        request_id: ctx.request_id,
        endpoint: path,
        method: method.to_string(),
        status: response.status().as_u16(),
        duration_ms: started.elapsed().as_millis() as u64,
        actor_uid: ctx.actor.map(|actor| actor.to_string()),
        error_code,
    }
    .emit();

    response
}

async fn route<B>(
    state: &AppState,
    ctx: &mut RequestContext,
    req: Request<B>,
) -> Result<GatewayResponse, GatewayError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    if req.method() == Method::OPTIONS {
        return Ok(empty_response(StatusCode::NO_CONTENT));
    }

    let endpoint = Endpoint::from_path(req.uri().path())
        .ok_or_else(|| GatewayError::NotFound(req.uri().path().to_string()))?;
    ctx.endpoint = Some(endpoint);

    let expected_method = match endpoint {
        Endpoint::SaveText => Method::POST,
        _ => Method::GET,
    };

    if endpoint.requires_auth() {
        let actor = authenticate(state, &req).await?;
        let actor = ctx.actor.insert(actor);
        if !state.rate_limiter.allow(actor.as_str(), endpoint) {
            return Err(GatewayError::RateLimited);
        }
        if req.method() != expected_method {
            return Err(GatewayError::MethodNotAllowed);
        }
    } else {
        if req.method() != expected_method {
            return Err(GatewayError::MethodNotAllowed);
        }
        let actor = ctx.actor.insert(Actor::public(ctx.peer.ip()));
        if !state.rate_limiter.allow(actor.as_str(), endpoint) {
            return Err(GatewayError::RateLimited);
        }
    }

    let query = QueryParams::parse(req.uri().query());
    match endpoint {
        Endpoint::CharacterInfo => routes::get_character_info(state, &query).await,
        Endpoint::SaveText => routes::save_text(state, req.into_body()).await,
        Endpoint::HiddenAchievement => routes::get_hidden_achievement(state, &query).await,
        Endpoint::IconImg => routes::get_icon_img(state, &query).await,
        Endpoint::ItemInformation => routes::get_item_information(state, &query).await,
    }
}

async fn authenticate<B>(state: &AppState, req: &Request<B>) -> Result<Actor, GatewayError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let token = extract_bearer_token(header)
        .ok_or_else(|| GatewayError::Unauthorized("missing bearer token".into()))?;

    state.token_validator.validate(token).await.map_err(|e| {
        warn!(error = %e, "Token validation failed");
        GatewayError::Unauthorized("invalid token".into())
    })
}

fn decorate(config: &GatewayConfig, request_id: &str, response: &mut GatewayResponse) {
    let headers = response.headers_mut();

    if let Ok(value) = HeaderValue::from_str(request_id) {
        headers.insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    if let Some(origin) = &config.admin_front_origin {
        match HeaderValue::from_str(origin) {
            Ok(value) => {
                headers.insert("access-control-allow-origin", value);
                headers.insert("vary", HeaderValue::from_static("Origin"));
                headers.insert(
                    "access-control-allow-methods",
                    HeaderValue::from_static("GET,POST,OPTIONS"),
                );
                headers.insert(
                    "access-control-allow-headers",
                    HeaderValue::from_static("Authorization,Content-Type"),
                );
            }
            Err(_) => warn!(origin = %origin, "Admin origin is not a valid header value"),
        }
    }
}
