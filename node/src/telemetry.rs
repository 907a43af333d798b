// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use std::sync::OnceLock;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub const ENTRIES_APPENDED: &str = "echo_log_entries_appended_total";
pub const APPEND_FAILURES: &str = "echo_log_append_failures_total";
pub const READS: &str = "echo_log_reads_total";
pub const LINES_RETURNED: &str = "echo_log_lines_returned_total";

/// Initialize telemetry (logs + metrics)
pub fn init_telemetry() {
    // 1. Tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "echo_log=debug,echo_log_node=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Prometheus
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROM_HANDLE.set(handle).is_err() {
                tracing::warn!("Prometheus handle already set. Telemetry re-initialized?");
            }
        }
        Err(e) => tracing::error!("Failed to install Prometheus recorder: {}", e),
    }

    metrics::describe_counter!(ENTRIES_APPENDED, "Total number of entries appended to the log file");
    metrics::describe_counter!(APPEND_FAILURES, "Appends that failed at the file boundary");
    metrics::describe_counter!(READS, "Range and tail reads served");
    metrics::describe_counter!(LINES_RETURNED, "Entries returned by range and tail reads");

    metrics::gauge!("echo_log_node_up", 1.0);
}

/// Render metrics in Prometheus text format
pub fn get_metrics() -> String {
    if let Some(handle) = PROM_HANDLE.get() {
        handle.render()
    } else {
        "# metrics not initialized".to_string()
    }
}
