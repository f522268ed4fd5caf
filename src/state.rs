//! # Application State Management
//!
//! Shared state every HTTP handler can reach: the configuration, the
//! voice pipeline, and the request metrics.
//!
//! ## Thread Safety Pattern:
//! Mutable pieces live behind Arc<RwLock<T>>:
//! - **Arc**: Many handlers hold a reference at once
//! - **RwLock**: Many readers OR one writer, never both
//!
//! The pipeline itself is immutable after startup so a plain Arc is
//! enough; the session registry inside it does its own locking.

use crate::config::AppConfig;
use crate::pipeline::VoicePipeline;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// The application state shared across all HTTP request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration (can be updated at runtime).
    pub config: Arc<RwLock<AppConfig>>,

    /// Performance metrics, updated by the metrics middleware on every
    /// request.
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// The normalize → transcribe → chat → synthesize pipeline.
    pub pipeline: Arc<VoicePipeline>,

    /// When the server started (never changes, so no lock needed).
    pub start_time: Instant,
}

/// Request metrics collected across all HTTP requests.
#[derive(Debug, Default)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed since server start.
    pub request_count: u64,

    /// Total number of errors encountered since server start.
    pub error_count: u64,

    /// Per-endpoint statistics, keyed by "METHOD /path".
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Performance metrics for one endpoint.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    /// Number of requests to this specific endpoint.
    pub request_count: u64,

    /// Total time spent processing requests to this endpoint (milliseconds).
    pub total_duration_ms: u64,

    /// Number of errors that occurred for this endpoint.
    pub error_count: u64,
}

impl AppState {
    pub fn new(config: AppConfig, pipeline: Arc<VoicePipeline>) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            pipeline,
            start_time: Instant::now(),
        }
    }

    /// Get a copy of the current configuration.
    ///
    /// Cloning releases the read lock immediately so other threads are
    /// never blocked on a handler; AppConfig is cheap to clone.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    /// Increment the total request counter (called for every request).
    pub fn increment_request_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.request_count += 1;
    }

    /// Increment the total error counter (any 4xx/5xx response).
    pub fn increment_error_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.error_count += 1;
    }

    /// Record detailed metrics for a specific endpoint.
    ///
    /// ## Parameters:
    /// - **endpoint**: e.g. "POST /process_audio"
    /// - **duration_ms**: Wall-clock processing time
    /// - **is_error**: Whether the response was 4xx/5xx
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();

        let endpoint_metric = metrics
            .endpoint_metrics
            .entry(endpoint.to_string())
            .or_default();

        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;

        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Get a snapshot of current metrics (used by the metrics endpoint).
    ///
    /// Clones under the read lock so the response never serializes data
    /// that is changing underneath it.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        let metrics = self.metrics.read().unwrap();
        AppMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
        }
    }

    /// Get server uptime in seconds.
    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    /// Average response time for this endpoint in milliseconds.
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    /// Error rate for this endpoint (0.0 to 1.0).
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}
