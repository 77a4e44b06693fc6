//! # Prometheus Metrics
//!
//! Pipeline counters and latency for the service node. Scraped by Prometheus
//! at the `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the node.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Token transfer runs started.
    pub transfers_total: IntCounter,
    /// Token transfer runs that ended in failure.
    pub transfer_failures_total: IntCounter,
    /// Student registration runs started.
    pub registrations_total: IntCounter,
    /// Student registration runs that ended in failure.
    pub registration_failures_total: IntCounter,
    /// Requests rejected at the boundary before reaching a pipeline.
    pub rejected_requests_total: IntCounter,
    /// Pipeline runs currently executing.
    pub pipelines_in_flight: IntGauge,
    /// Wall-clock duration of a pipeline run, labelled by flow.
    pub pipeline_latency_seconds: HistogramVec,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("ayllu".into()), None)
            .expect("failed to create prometheus registry");

        let counter = |name: &str, help: &str| {
            let c = IntCounter::new(name, help).expect("metric creation");
            registry
                .register(Box::new(c.clone()))
                .expect("metric registration");
            c
        };

        let transfers_total = counter("transfers_total", "Token transfer runs started");
        let transfer_failures_total =
            counter("transfer_failures_total", "Token transfer runs that failed");
        let registrations_total =
            counter("registrations_total", "Student registration runs started");
        let registration_failures_total = counter(
            "registration_failures_total",
            "Student registration runs that failed",
        );
        let rejected_requests_total = counter(
            "rejected_requests_total",
            "Requests rejected by boundary validation",
        );

        let pipelines_in_flight =
            IntGauge::with_opts(Opts::new("pipelines_in_flight", "Pipeline runs in progress"))
                .expect("metric creation");
        registry
            .register(Box::new(pipelines_in_flight.clone()))
            .expect("metric registration");

        // Ledger tool round trips dominate, so buckets start at 100ms.
        let pipeline_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "pipeline_latency_seconds",
                "End-to-end pipeline run latency in seconds",
            )
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
            &["flow"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(pipeline_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            transfers_total,
            transfer_failures_total,
            registrations_total,
            registration_failures_total,
            rejected_requests_total,
            pipelines_in_flight,
            pipeline_latency_seconds,
        }
    }

    /// Starts timing one pipeline run. The returned guard observes the
    /// latency and lowers the in-flight gauge when dropped.
    pub fn start_run(&self, flow: &str) -> RunTimer {
        self.pipelines_in_flight.inc();
        RunTimer {
            gauge: self.pipelines_in_flight.clone(),
            timer: Some(
                self.pipeline_latency_seconds
                    .with_label_values(&[flow])
                    .start_timer(),
            ),
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// In-flight guard for one pipeline run.
pub struct RunTimer {
    gauge: IntGauge,
    timer: Option<prometheus::HistogramTimer>,
}

impl Drop for RunTimer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.observe_duration();
        }
        self.gauge.dec();
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
