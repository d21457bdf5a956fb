//! Structured logging
//!
//! Every request gets an id from the [`RequestIdGenerator`] owned by the
//! server state. The id is returned in `X-Request-Id` and repeated in the
//! single access-log event ([`RequestLog`]) emitted when the response is
//! ready, so client reports can be matched to log lines.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

/// Target of the per-request access log event
pub const ACCESS_LOG_TARGET: &str = "access";

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level`. The access log stays at info
/// unless `RUST_LOG` says otherwise.
pub fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("achievement_gateway={},{}=info,warn", level, ACCESS_LOG_TARGET).into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Process-wide monotonically increasing request ids
#[derive(Debug, Default)]
pub struct RequestIdGenerator {
    sequence: AtomicU64,
}

impl RequestIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `req-<UTC yyyymmddTHHMMSS.mmm>-<sequence>`
    pub fn next_id(&self) -> String {
        self.next_id_at(Utc::now())
    }

    pub fn next_id_at(&self, now: DateTime<Utc>) -> String {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        format!("req-{}-{}", now.format("%Y%m%dT%H%M%S%.3f"), sequence)
    }
}

/// Fields of one access-log line
#[derive(Debug, Clone)]
pub struct RequestLog {
    pub request_id: String,
    pub endpoint: String,
    pub method: String,
    pub status: u16,
    pub duration_ms: u64,
    pub actor_uid: Option<String>,
    pub error_code: Option<String>,
}

impl RequestLog {
    pub fn emit(&self) {
        info!(
            target: ACCESS_LOG_TARGET,
            request_id = %self.request_id,
            endpoint = %self.endpoint,
            method = %self.method,
            status = self.status,
            duration_ms = self.duration_ms,
            actor_uid = self.actor_uid.as_deref(),
            error_code = self.error_code.as_deref(),
            "request completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_request_id_format() {
        let generator = RequestIdGenerator::new();
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap()
            + chrono::TimeDelta::milliseconds(89);

        assert_eq!(generator.next_id_at(now), "req-20260304T050607.089-1");
        assert_eq!(generator.next_id_at(now), "req-20260304T050607.089-2");
    }

    #[test]
    fn test_request_ids_are_unique_across_threads() {
        let generator = std::sync::Arc::new(RequestIdGenerator::new());
        let ids: Vec<String> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let generator = generator.clone();
                    scope.spawn(move || (0..100).map(|_| generator.next_id()).collect::<Vec<_>>())
                })
                .collect();
            handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
        });

        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 400);
    }

    #[test]
    fn test_separate_generators_are_independent() {
        let a = RequestIdGenerator::new();
        let b = RequestIdGenerator::new();
        assert!(a.next_id().ends_with("-1"));
        assert!(b.next_id().ends_with("-1"));
    }
}
