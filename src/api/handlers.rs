//! API Handlers
//!
//! HTTP request handlers for the gateway endpoints. Each handler only parses
//! input, calls one cache component and shapes the response.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use tracing::warn;

use crate::cache::{BatchWriter, PatternDeleter, PointReader, SweepPolicy};
use crate::config::Config;
use crate::error::{Result, StoreResult};
use crate::models::{FetchQuery, HealthResponse, PurgeQuery, SetRequest, WriteOutcomeResponse};
use crate::store::{Expiry, KvStore};

/// Application state shared across all handlers.
///
/// Every component borrows the same store handle.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn KvStore>,
    pub writer: BatchWriter,
    pub reader: PointReader,
    pub deleter: PatternDeleter,
}

impl AppState {
    /// Creates the components around `store`.
    pub fn new(store: Arc<dyn KvStore>, expiry: Expiry, policy: SweepPolicy) -> Self {
        Self {
            writer: BatchWriter::new(store.clone(), expiry),
            reader: PointReader::new(store.clone()),
            deleter: PatternDeleter::new(store.clone(), policy),
            store,
        }
    }

    /// Creates the components using the expiry and sweep limits from `config`.
    pub fn from_config(store: Arc<dyn KvStore>, config: &Config) -> StoreResult<Self> {
        Ok(Self::new(
            store,
            Expiry::from_secs(config.entry_ttl)?,
            config.sweep_policy(),
        ))
    }
}

/// Handler for POST /set
///
/// Writes every entry of `{"body": {...}}` with the configured expiry and
/// returns one outcome per key.
pub async fn set_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<WriteOutcomeResponse>>> {
    let entries = SetRequest::from_slice(&body)?.into_entries();
    let outcomes = state.writer.write_all(&entries).await;

    Ok(Json(
        outcomes.iter().map(WriteOutcomeResponse::from).collect(),
    ))
}

/// Handler for GET /get?key=
///
/// Returns the stored string, or `null` when the key is absent or the lookup
/// failed; the two cases look the same to the caller.
///
/// The body is always JSON: a value `hello` comes back as `"hello"` with
/// `content-type: application/json`, not as raw text.
pub async fn get_handler(
    State(state): State<AppState>,
    Query(query): Query<FetchQuery>,
) -> Json<Option<String>> {
    let value = state.reader.read(&query.key()).await.unwrap_or(None);
    Json(value)
}

/// Handler for DELETE /delete?pattern=
///
/// Purges every key matching the glob pattern. The body is always empty.
pub async fn delete_handler(
    State(state): State<AppState>,
    Query(query): Query<PurgeQuery>,
) -> StatusCode {
    let pattern = query.pattern();
    let report = state.deleter.delete_matching(&pattern).await;
    if !report.is_complete() {
        warn!(
            "Purge of '{}' ended early: {:?} after {} pages",
            pattern, report.outcome, report.pages
        );
    }
    StatusCode::OK
}

/// Handler for GET /health
///
/// Healthy while the store answers a ping.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse::healthy())),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse::unhealthy()),
            )
        }
    }
}
