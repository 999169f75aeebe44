//! Metrics for background suggestion jobs
//!
//! Tracks job starts, durations, completions and failures.
//!
//! # Metrics
//!
//! - `seo_jobs_started_total`: Counter of jobs that entered processing
//! - `seo_job_duration_seconds`: Histogram of processing time by outcome
//! - `seo_jobs_completed_total`: Counter of jobs that completed
//! - `seo_job_failures_total`: Counter of failed jobs by failure kind
//! - `seo_jobs_active`: Gauge of jobs currently being processed
//!
//! # Examples
//!
//! ```
//! use seo_assistant::agent::metrics::JobMetrics;
//!
//! let metrics = JobMetrics::new("job-1".to_string(), false);
//! metrics.record_completion();
//! ```

use metrics::{decrement_gauge, histogram, increment_counter, increment_gauge};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Metrics collection for a single job run
///
/// Created when processing starts and finished exactly once with either
/// `record_completion` or `record_failure`. The recorded flag is atomic so
/// the tracker can move across await points inside a spawned task.
#[derive(Debug)]
pub struct JobMetrics {
    job_id: String,
    continuation: bool,
    start: Instant,
    recorded: AtomicBool,
}

impl JobMetrics {
    /// Creates a new tracker and marks the job as active
    ///
    /// # Arguments
    ///
    /// * `job_id` - Identifier of the job being processed
    /// * `continuation` - Whether the job regenerates an existing draft
    pub fn new(job_id: String, continuation: bool) -> Self {
        increment_counter!("seo_jobs_started_total", "turn" => turn_label(continuation));
        increment_gauge!("seo_jobs_active", 1.0);

        Self {
            job_id,
            continuation,
            start: Instant::now(),
            recorded: AtomicBool::new(false),
        }
    }

    /// Records a successful completion
    pub fn record_completion(&self) {
        if self.recorded.swap(true, Ordering::SeqCst) {
            return;
        }

        histogram!(
            "seo_job_duration_seconds",
            self.elapsed_seconds(),
            "status" => "completed",
            "turn" => turn_label(self.continuation)
        );
        increment_counter!("seo_jobs_completed_total", "turn" => turn_label(self.continuation));
        decrement_gauge!("seo_jobs_active", 1.0);
    }

    /// Records a failure
    ///
    /// # Arguments
    ///
    /// * `kind` - Failure kind label ("generation", "timeout", "internal")
    pub fn record_failure(&self, kind: &str) {
        if self.recorded.swap(true, Ordering::SeqCst) {
            return;
        }

        histogram!(
            "seo_job_duration_seconds",
            self.elapsed_seconds(),
            "status" => "failed",
            "turn" => turn_label(self.continuation)
        );
        increment_counter!("seo_job_failures_total", "kind" => kind.to_string());
        decrement_gauge!("seo_jobs_active", 1.0);
    }

    /// Marks the run as a continuation once history has been inspected
    pub fn set_continuation(&mut self, continuation: bool) {
        self.continuation = continuation;
    }

    fn elapsed_seconds(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn is_recorded(&self) -> bool {
        self.recorded.load(Ordering::SeqCst)
    }
}

impl Drop for JobMetrics {
    /// Keeps the active gauge accurate when a run ends without recording
    fn drop(&mut self) {
        if !self.is_recorded() {
            tracing::warn!(
                job_id = %self.job_id,
                elapsed_seconds = self.elapsed_seconds(),
                "Job run ended without an outcome"
            );
            decrement_gauge!("seo_jobs_active", 1.0);
        }
    }
}

fn turn_label(continuation: bool) -> &'static str {
    if continuation {
        "continuation"
    } else {
        "opening"
    }
}

/// Initializes the metrics exporter for Prometheus
///
/// When the `prometheus` feature is enabled, this installs the Prometheus
/// recorder and its HTTP listener. Without the feature it does nothing.
///
/// # Examples
///
/// ```
/// use seo_assistant::agent::metrics::init_metrics_exporter;
///
/// init_metrics_exporter();
/// ```
pub fn init_metrics_exporter() {
    #[cfg(feature = "prometheus")]
    {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let _ = builder.install().map_err(|e| {
            tracing::warn!("Failed to install Prometheus exporter: {}", e);
        });
    }
}
