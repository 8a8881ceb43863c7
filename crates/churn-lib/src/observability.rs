//! Observability infrastructure for the churn controller
//!
//! Provides:
//! - Prometheus metrics (steps, failures per phase, containers created/removed, step latency)
//! - Structured JSON logging of container lifecycle events with tracing

use crate::churn::{Phase, StepOutcome};
use crate::error::ChurnError;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{error, info, warn};

/// Histogram buckets for step latency (in seconds); steps wait on container exits
const STEP_LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ChurnMetricsInner> = OnceLock::new();

struct ChurnMetricsInner {
    steps_total: IntCounter,
    step_failures: IntCounterVec,
    empty_steps: IntCounter,
    containers_created: IntCounter,
    containers_removed: IntCounter,
    candidates: IntGauge,
    step_latency_seconds: Histogram,
}

impl ChurnMetricsInner {
    fn new() -> Self {
        Self {
            steps_total: register_int_counter!(
                "container_churn_steps_total",
                "Churn steps executed, successful or not"
            )
            .expect("Failed to register steps_total"),

            step_failures: register_int_counter_vec!(
                "container_churn_step_failures_total",
                "Churn steps aborted by an error, by phase",
                &["phase"]
            )
            .expect("Failed to register step_failures"),

            empty_steps: register_int_counter!(
                "container_churn_empty_steps_total",
                "Churn steps that found no candidate container"
            )
            .expect("Failed to register empty_steps"),

            containers_created: register_int_counter!(
                "container_churn_containers_created_total",
                "Clones created and started"
            )
            .expect("Failed to register containers_created"),

            containers_removed: register_int_counter!(
                "container_churn_containers_removed_total",
                "Containers stopped and removed"
            )
            .expect("Failed to register containers_removed"),

            candidates: register_int_gauge!(
                "container_churn_candidates",
                "Candidate pool size seen by the last successful step"
            )
            .expect("Failed to register candidates"),

            step_latency_seconds: register_histogram!(
                "container_churn_step_latency_seconds",
                "Wall time of one churn step",
                STEP_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register step_latency_seconds"),
        }
    }
}

/// Churn metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics; clones share the same counters.
#[derive(Debug, Clone)]
pub struct ChurnMetrics {
    _private: (),
}

impl Default for ChurnMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ChurnMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ChurnMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ChurnMetricsInner {
        GLOBAL_METRICS.get_or_init(ChurnMetricsInner::new)
    }

    /// Record a step that completed
    pub fn record_step(&self, outcome: &StepOutcome, duration_secs: f64) {
        let inner = self.inner();
        inner.steps_total.inc();
        inner.step_latency_seconds.observe(duration_secs);

        match outcome {
            StepOutcome::NoCandidates => {
                inner.empty_steps.inc();
                inner.candidates.set(0);
            }
            StepOutcome::Churned { candidates, .. } => {
                inner.candidates.set(*candidates as i64);
            }
        }
    }

    /// Count one started clone; called as it happens so aborted steps still count
    pub fn record_container_created(&self) {
        self.inner().containers_created.inc();
    }

    pub fn record_container_removed(&self) {
        self.inner().containers_removed.inc();
    }

    /// Record a step aborted in `phase`
    pub fn record_failure(&self, phase: Phase, duration_secs: f64) {
        let inner = self.inner();
        inner.steps_total.inc();
        inner.step_latency_seconds.observe(duration_secs);
        inner
            .step_failures
            .with_label_values(&[phase.as_str()])
            .inc();
    }

    pub fn steps_total(&self) -> u64 {
        self.inner().steps_total.get()
    }

    pub fn containers_created(&self) -> u64 {
        self.inner().containers_created.get()
    }

    pub fn containers_removed(&self) -> u64 {
        self.inner().containers_removed.get()
    }

    pub fn failures(&self, phase: Phase) -> u64 {
        self.inner()
            .step_failures
            .with_label_values(&[phase.as_str()])
            .get()
    }
}

/// Structured logger for churn events
///
/// Every record carries an `event` field and the churned image. With
/// metrics attached, container lifecycle events also bump the container
/// counters.
#[derive(Debug, Clone)]
pub struct ChurnLogger {
    image: String,
    metrics: Option<ChurnMetrics>,
}

impl ChurnLogger {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: ChurnMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn log_startup(&self, version: &str, ratio: &str, frequency: Duration) {
        info!(
            event = "churner_started",
            image = %self.image,
            version = %version,
            ratio = %ratio,
            frequency_ms = frequency.as_millis() as u64,
            "Container churner started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "churner_shutdown",
            image = %self.image,
            reason = %reason,
            "Container churner shutting down"
        );
    }

    /// Runtime warning attached to a create response
    pub fn log_create_warning(&self, container_id: &str, warning: &str) {
        warn!(
            event = "create_warning",
            image = %self.image,
            container_id = %container_id,
            warning = %warning,
            "Runtime reported a warning while creating container"
        );
    }

    pub fn log_container_created(&self, container_id: &str, template_id: &str) {
        info!(
            event = "container_created",
            image = %self.image,
            container_id = %container_id,
            template_id = %template_id,
            "create container"
        );
    }

    pub fn log_container_started(&self, container_id: &str) {
        info!(
            event = "container_started",
            image = %self.image,
            container_id = %container_id,
            "start container"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_container_created();
        }
    }

    pub fn log_container_stopped(&self, container_id: &str) {
        info!(
            event = "container_stopped",
            image = %self.image,
            container_id = %container_id,
            "stop container"
        );
    }

    pub fn log_container_removed(&self, container_id: &str) {
        info!(
            event = "container_removed",
            image = %self.image,
            container_id = %container_id,
            "remove container"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_container_removed();
        }
    }

    pub fn log_step_completed(&self, outcome: &StepOutcome, elapsed: Duration) {
        match outcome {
            StepOutcome::NoCandidates => {
                info!(
                    event = "step_completed",
                    image = %self.image,
                    candidates = 0,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "No containers to churn"
                );
            }
            StepOutcome::Churned {
                template,
                candidates,
                created,
                removed,
            } => {
                info!(
                    event = "step_completed",
                    image = %self.image,
                    template_id = %template,
                    candidates = *candidates,
                    created = created.len(),
                    removed = removed.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Churn step completed"
                );
            }
        }
    }

    pub fn log_step_failed(&self, err: &ChurnError) {
        error!(
            event = "step_failed",
            image = %self.image,
            phase = %err.phase(),
            error = %err,
            "job failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_step_counts_steps() {
        // global registry: assert on deltas only
        let metrics = ChurnMetrics::new();
        let steps_before = metrics.steps_total();

        metrics.record_step(
            &StepOutcome::Churned {
                template: "c1".to_string(),
                candidates: 3,
                created: vec!["n1".to_string(), "n2".to_string()],
                removed: vec!["c2".to_string()],
            },
            0.2,
        );

        assert!(metrics.steps_total() >= steps_before + 1);
    }

    #[test]
    fn test_logger_counts_container_events() {
        let metrics = ChurnMetrics::new();
        let created_before = metrics.containers_created();
        let removed_before = metrics.containers_removed();
        let logger = ChurnLogger::new("app:v1").with_metrics(metrics.clone());

        logger.log_container_started("n1");
        logger.log_container_started("n2");
        logger.log_container_removed("c2");

        assert!(metrics.containers_created() >= created_before + 2);
        assert!(metrics.containers_removed() >= removed_before + 1);
    }

    #[test]
    fn test_record_failure_by_phase() {
        let metrics = ChurnMetrics::new();
        let before = metrics.failures(Phase::Replicating);

        metrics.record_failure(Phase::Replicating, 0.01);

        assert!(metrics.failures(Phase::Replicating) >= before + 1);
    }

    #[test]
    fn test_churn_logger_creation() {
        let logger = ChurnLogger::new("app:v1");
        assert_eq!(logger.image, "app:v1");
    }
}
