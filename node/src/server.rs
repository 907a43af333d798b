// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use echo_log::{Entry, LogStore};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::api::{RangeParams, LOGGED};
use crate::errors::ApiError;
use crate::ingest::parse_entry;
use crate::telemetry::{APPEND_FAILURES, ENTRIES_APPENDED, LINES_RETURNED, READS};

pub type SharedStore = Arc<LogStore>;

pub fn build_router(store: SharedStore) -> Router {
    Router::new()
        .route("/log", post(log_entry))
        .route("/log/range", get(range))
        .route("/log/tail/:lines", get(tail))
        // Observability
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

async fn log_entry(
    State(store): State<SharedStore>,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Result<&'static str, ApiError> {
    let entry = parse_entry(&headers, params, &body)?;

    match store.append(&entry).await {
        Ok(()) => {
            metrics::increment_counter!(ENTRIES_APPENDED);
            Ok(LOGGED)
        }
        Err(e) => {
            metrics::increment_counter!(APPEND_FAILURES);
            Err(e.into())
        }
    }
}

async fn range(
    State(store): State<SharedStore>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<Entry>>, ApiError> {
    let entries = store.read_range(params.start, params.end).await?;
    record_read(entries.len());
    Ok(Json(entries))
}

async fn tail(
    State(store): State<SharedStore>,
    Path(lines): Path<usize>,
) -> Result<Json<Vec<Entry>>, ApiError> {
    let entries = store.tail(lines).await?;
    record_read(entries.len());
    Ok(Json(entries))
}

fn record_read(lines: usize) {
    metrics::increment_counter!(READS);
    metrics::counter!(LINES_RETURNED, lines as u64);
}

async fn metrics_handler() -> String {
    crate::telemetry::get_metrics()
}
