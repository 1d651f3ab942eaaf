//! HTTP surface of the ingest service.
//!
//! The device firmware is the only intended client and it is not gentle:
//! it posts to whatever path it was flashed with, with whatever body it
//! assembled. Every POST on every path is treated as a submission and
//! acknowledged with a fixed `OK`; GET on any path answers a liveness
//! line. The only failure a client can see is a store-level I/O error.

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::post,
    Router,
};
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument};
use vireo_readings::{now_timestamp, ReadingStore, SensorReading};

/// Acknowledgment body for every accepted submission.
pub const ACK_BODY: &str = "OK";

/// Liveness body for GET probes.
pub const LIVENESS_BODY: &str = "vireo ingest server running";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ReadingStore>,
    pub stats: Arc<IngestStats>,
}

/// Per-process ingest counters.
#[derive(Debug, Default)]
pub struct IngestStats {
    /// Submissions appended to the log
    pub readings_accepted: AtomicU64,
    /// Submissions that decoded as a JSON object
    pub readings_decoded: AtomicU64,
    /// Submissions preserved through the raw fallback
    pub readings_fallback: AtomicU64,
    /// Submissions lost to store I/O failures
    pub store_errors: AtomicU64,
}

/// Point-in-time copy of the ingest counters.
#[derive(Debug, Default, Clone)]
pub struct IngestStatsSnapshot {
    pub readings_accepted: u64,
    pub readings_decoded: u64,
    pub readings_fallback: u64,
    pub store_errors: u64,
}

impl IngestStats {
    pub fn snapshot(&self) -> IngestStatsSnapshot {
        IngestStatsSnapshot {
            readings_accepted: self.readings_accepted.load(Ordering::Relaxed),
            readings_decoded: self.readings_decoded.load(Ordering::Relaxed),
            readings_fallback: self.readings_fallback.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
        }
    }
}

/// Create the ingest router.
///
/// Both routes carry both handlers: the firmware's configured path is
/// arbitrary, so submissions are accepted everywhere, not just at `/`.
/// The default request body cap is lifted; a submission is never bounced
/// for its size.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(submit_reading).get(liveness))
        .route("/*path", post(submit_reading).get(liveness))
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Accept one reading submission.
///
/// The body is taken as raw bytes and decoded lossily; validation failures
/// do not exist here. Exactly one entry is appended per request unless the
/// store itself fails.
#[instrument(skip(state, body), fields(bytes = body.len()))]
async fn submit_reading(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<&'static str, (StatusCode, String)> {
    let body = String::from_utf8_lossy(&body);
    let reading = SensorReading::from_payload(&body, now_timestamp());

    if reading.is_raw() {
        state.stats.readings_fallback.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("ingest.readings.fallback").increment(1);
    } else {
        state.stats.readings_decoded.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("ingest.readings.decoded").increment(1);
    }

    // Serialized before the append so the stored entry can be echoed.
    let entry = serde_json::to_string(&reading).unwrap_or_default();

    match state.store.record(reading).await {
        Ok(total) => {
            state.stats.readings_accepted.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("ingest.readings.accepted").increment(1);

            info!(entry = %entry, total = total, "Reading recorded");
            Ok(ACK_BODY)
        }
        Err(e) => {
            state.stats.store_errors.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("ingest.store.errors").increment(1);

            error!(error = %e, "Failed to record reading");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to record reading: {e}"),
            ))
        }
    }
}

/// Liveness probe. Touches nothing.
async fn liveness() -> &'static str {
    LIVENESS_BODY
}
