//! HTTP server

pub mod http;
pub mod response;

pub use self::http::{handle_request, run, AppState, RequestContext};
pub use response::{empty_response, json_response, ErrorResponder, GatewayResponse};
