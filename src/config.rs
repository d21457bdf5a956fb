//! Configuration for the gateway
//!
//! CLI arguments and environment variable handling using clap. Every flag
//! can also be set through the environment variable named next to it;
//! `.env` is loaded by `main` before parsing.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::fetcher::DEFAULT_TIMEOUT;

/// How expected failures on read endpoints are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// HTTP 200 with an error envelope, for the legacy front-end
    #[default]
    Compat,
    /// Status-coded errors with the same envelope
    Http,
}

impl ErrorMode {
    /// Parse `API_ERROR_MODE`; anything other than `http` means compat
    pub fn from_setting(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("http") {
            Self::Http
        } else {
            Self::Compat
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compat => "compat",
            Self::Http => "http",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AuthBackend {
    /// One shared bearer token
    Static,
    /// Firebase ID tokens
    Firebase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackend {
    /// Files under BACKEND_SAVE_ROOT
    Local,
    /// Objects in a Cloud Storage bucket
    Gcs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Achievement editor backend gateway
#[derive(Parser, Debug, Clone)]
#[command(name = "achievement-gateway")]
#[command(about = "Authenticated gateway for Lodestone scraping and editor document storage")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Overrides the port of LISTEN (set by Cloud Run)
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Error rendering for read endpoints: compat or http
    #[arg(long, env = "API_ERROR_MODE", default_value = "compat")]
    pub api_error_mode: String,

    /// Require save_text payloads to be valid JSON
    #[arg(long, env = "ENABLE_STRICT_JSON_VALIDATION", default_value = "false")]
    pub strict_json_validation: bool,

    /// Timeout for Lodestone requests in milliseconds
    #[arg(long, env = "LODESTONE_REQUEST_TIMEOUT_MS", default_value = "15000", allow_hyphen_values = true)]
    pub lodestone_request_timeout_ms: i64,

    /// Origin allowed by CORS; empty disables CORS headers
    #[arg(long, env = "ADMIN_FRONT_ORIGIN", default_value = "")]
    pub admin_front_origin: String,

    /// save_text requests per actor per minute (<= 0 disables the limit)
    #[arg(long, env = "SAVE_TEXT_RATE_LIMIT_PER_MINUTE", default_value = "20", allow_hyphen_values = true)]
    pub save_text_rate_limit_per_minute: i64,

    /// get_* requests per actor per endpoint per minute (<= 0 disables the limit)
    #[arg(long, env = "GET_RATE_LIMIT_PER_MINUTE", default_value = "60", allow_hyphen_values = true)]
    pub get_rate_limit_per_minute: i64,

    /// Interval between rate limiter sweeps in seconds (0 disables)
    #[arg(long, env = "RATE_LIMIT_SWEEP_INTERVAL_SECS", default_value = "300")]
    pub rate_limit_sweep_interval_secs: u64,

    /// Largest accepted request body in bytes
    #[arg(long, env = "MAX_REQUEST_BODY_BYTES", default_value = "10485760")]
    pub max_request_body_bytes: usize,

    /// Token verification backend
    #[arg(long, env = "AUTH_BACKEND", value_enum, default_value = "static")]
    pub auth_backend: AuthBackend,

    /// Bearer token accepted by the static backend
    #[arg(long, env = "STATIC_BEARER_TOKEN", default_value = "local-dev-token")]
    pub static_bearer_token: String,

    /// Actor uid reported for the static token
    #[arg(long, env = "STATIC_OPERATOR_UID", default_value = "local-operator")]
    pub static_operator_uid: String,

    /// Firebase project id (required for the firebase backend)
    #[arg(long, env = "FIREBASE_PROJECT_ID")]
    pub firebase_project_id: Option<String>,

    /// Storage backend
    #[arg(long, env = "STORAGE_BACKEND", value_enum, default_value = "local")]
    pub storage_backend: StorageBackend,

    /// Root directory of the local backend
    #[arg(long, env = "BACKEND_SAVE_ROOT", default_value = "./local-storage/forfan-resource")]
    pub backend_save_root: PathBuf,

    /// Bucket of the gcs backend
    #[arg(long, env = "FORFAN_RESOURCES_BUCKET", default_value = "forfan-resource")]
    pub resources_bucket: String,

    /// Object name prefix of the gcs backend
    #[arg(long, env = "FORFAN_RESOURCES_PREFIX", default_value = "")]
    pub resources_prefix: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "json")]
    pub log_format: LogFormat,
}

/// Settings the request handlers need at runtime
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub error_mode: ErrorMode,
    pub strict_json_validation: bool,
    pub admin_front_origin: Option<String>,
    pub max_request_body_bytes: usize,
    pub save_limit_per_minute: i64,
    pub read_limit_per_minute: i64,
    pub fetch_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Compat,
            strict_json_validation: false,
            admin_front_origin: None,
            max_request_body_bytes: 10 * 1024 * 1024,
            save_limit_per_minute: 20,
            read_limit_per_minute: 60,
            fetch_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Args {
    /// Validate startup settings
    pub fn validate(&self) -> Result<(), String> {
        match self.auth_backend {
            AuthBackend::Static => {
                if self.static_bearer_token.trim().is_empty() {
                    return Err("STATIC_BEARER_TOKEN must not be empty".to_string());
                }
            }
            AuthBackend::Firebase => {
                let project = self.firebase_project_id.as_deref().unwrap_or_default();
                if project.trim().is_empty() {
                    return Err("FIREBASE_PROJECT_ID is required for AUTH_BACKEND=firebase".to_string());
                }
            }
        }

        match self.storage_backend {
            StorageBackend::Local => {
                if self.backend_save_root.as_os_str().is_empty() {
                    return Err("BACKEND_SAVE_ROOT must not be empty".to_string());
                }
            }
            StorageBackend::Gcs => {
                if self.resources_bucket.trim().is_empty() {
                    return Err("FORFAN_RESOURCES_BUCKET is required for STORAGE_BACKEND=gcs".to_string());
                }
            }
        }

        if self.max_request_body_bytes == 0 {
            return Err("MAX_REQUEST_BODY_BYTES must be greater than zero".to_string());
        }

        Ok(())
    }

    /// Listen address with the PORT override applied
    pub fn listen_addr(&self) -> SocketAddr {
        match self.port {
            Some(port) => SocketAddr::new(self.listen.ip(), port),
            None => self.listen,
        }
    }

    pub fn error_mode(&self) -> ErrorMode {
        ErrorMode::from_setting(&self.api_error_mode)
    }

    pub fn fetch_timeout(&self) -> Duration {
        if self.lodestone_request_timeout_ms <= 0 {
            DEFAULT_TIMEOUT
        } else {
            Duration::from_millis(self.lodestone_request_timeout_ms as u64)
        }
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        match self.rate_limit_sweep_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        let origin = self.admin_front_origin.trim();
        GatewayConfig {
            error_mode: self.error_mode(),
            strict_json_validation: self.strict_json_validation,
            admin_front_origin: (!origin.is_empty()).then(|| origin.to_string()),
            max_request_body_bytes: self.max_request_body_bytes,
            save_limit_per_minute: self.save_text_rate_limit_per_minute,
            read_limit_per_minute: self.get_rate_limit_per_minute,
            fetch_timeout: self.fetch_timeout(),
        }
    }
}
