/*!
 * Structured Tracing
 * Subscriber setup and per-request spans for module resolution
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::core::limits::TRACE_JSON_ENV_VAR;

/// Resolutions slower than this are reported
const SLOW_RESOLUTION_MS: u128 = 50;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - AI_OS_SANDBOX_TRACE_JSON: Enable JSON output (default: false)
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(TRACE_JSON_ENV_VAR)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        info!(json = use_json, "Structured tracing initialized");
    }
}

/// Span covering one import request from the host runtime
pub struct ResolutionSpan {
    span: tracing::Span,
    start: Instant,
    request_id: u64,
    fullname: String,
}

impl ResolutionSpan {
    pub fn new(fullname: &str) -> Self {
        let request_id = NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed);

        let span = span!(
            Level::DEBUG,
            "resolution",
            request_id,
            module = fullname,
            result = tracing::field::Empty,
            finder = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            request_id,
            fullname: fullname.to_string(),
        }
    }

    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Record which finder produced the spec
    pub fn record_found(&self, finder: &str) {
        self.span.record("result", "found");
        self.span.record("finder", finder);
    }

    pub fn record_not_found(&self) {
        self.span.record("result", "not_found");
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for ResolutionSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();

        if duration.as_millis() > SLOW_RESOLUTION_MS {
            warn!(
                request_id = self.request_id,
                module = %self.fullname,
                duration_ms = duration.as_millis() as u64,
                "slow module resolution"
            );
        } else {
            debug!(
                request_id = self.request_id,
                module = %self.fullname,
                duration_us = duration.as_micros() as u64,
                "module resolution completed"
            );
        }
    }
}

/// Helper to create a resolution span
#[inline]
pub fn span_resolution(fullname: &str) -> ResolutionSpan {
    ResolutionSpan::new(fullname)
}
