//! Churn scheduling loop
//!
//! Fires one churn step per tick until a shutdown message arrives. The timer
//! is rearmed only after a step finishes, so a slow step delays the next
//! tick instead of overlapping with it, and shutdown is only observed
//! between steps.

use super::destroyer::DestroyOptions;
use super::step::{ChurnStep, StepOutcome};
use super::Phase;
use crate::driver::ContainerDriver;
use crate::error::ChurnError;
use crate::health::{components, HealthRegistry};
use crate::observability::{ChurnLogger, ChurnMetrics};
use crate::ratio::Ratio;
use crate::sampler::{RngSampler, Sampler, SamplingMode};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::info;

/// Configuration for the churn loop
#[derive(Debug, Clone)]
pub struct ChurnConfig {
    /// Time between the end of one step and the start of the next (default: 1 minute)
    pub frequency: Duration,
    /// Clones and removals per step (default: 1:1)
    pub ratio: Ratio,
    /// Teardown behaviour
    pub destroy: DestroyOptions,
    /// Seed for the random source; entropy when `None`
    pub seed: Option<u64>,
}

impl Default for ChurnConfig {
    fn default() -> Self {
        Self {
            frequency: Duration::from_secs(60),
            ratio: Ratio::DEFAULT,
            destroy: DestroyOptions::default(),
            seed: None,
        }
    }
}

/// Periodic driver of churn steps
pub struct ChurnLoop {
    step: ChurnStep,
    frequency: Duration,
    logger: ChurnLogger,
    metrics: Option<ChurnMetrics>,
    health: Option<HealthRegistry>,
}

impl ChurnLoop {
    pub fn new(step: ChurnStep, frequency: Duration) -> Self {
        Self {
            logger: ChurnLogger::new(step.image()),
            step,
            frequency,
            metrics: None,
            health: None,
        }
    }

    /// Run until `shutdown` fires or its sender is dropped
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            image = %self.step.image(),
            ratio = %self.step.ratio(),
            frequency_ms = self.frequency.as_millis() as u64,
            "Starting churn loop"
        );

        let mut steps = 0u64;
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.frequency) => {
                    steps += 1;
                    // errors are reported inside; the next tick is the retry
                    let _ = self.run_once().await;
                }
                _ = shutdown.recv() => {
                    info!(steps = steps, "Shutting down churn loop");
                    break;
                }
            }
        }
    }

    /// Run a single step and report its result
    pub async fn run_once(&mut self) -> Result<StepOutcome, ChurnError> {
        let start = Instant::now();
        let result = self.step.run().await;
        let elapsed = start.elapsed();

        match &result {
            Ok(outcome) => {
                self.logger.log_step_completed(outcome, elapsed);
                if let Some(metrics) = &self.metrics {
                    metrics.record_step(outcome, elapsed.as_secs_f64());
                }
                if let Some(health) = &self.health {
                    health.set_healthy(components::DRIVER).await;
                    health.set_healthy(components::SCHEDULER).await;
                }
            }
            Err(e) => {
                self.logger.log_step_failed(e);
                if let Some(metrics) = &self.metrics {
                    metrics.record_failure(e.phase(), elapsed.as_secs_f64());
                }
                if let Some(health) = &self.health {
                    if e.phase() == Phase::Selecting {
                        health.set_unhealthy(components::DRIVER, e.to_string()).await;
                    }
                    health
                        .set_degraded(components::SCHEDULER, format!("churn step failed: {}", e))
                        .await;
                }
            }
        }

        result
    }

    pub fn frequency(&self) -> Duration {
        self.frequency
    }
}

/// Builder for creating the churn loop
pub struct ChurnLoopBuilder {
    driver: Option<Arc<dyn ContainerDriver>>,
    image: Option<String>,
    sampler: Option<Box<dyn Sampler>>,
    config: ChurnConfig,
    metrics: Option<ChurnMetrics>,
    health: Option<HealthRegistry>,
}

impl ChurnLoopBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            driver: None,
            image: None,
            sampler: None,
            config: ChurnConfig::default(),
            metrics: None,
            health: None,
        }
    }

    /// Set the container runtime driver
    pub fn driver(mut self, driver: Arc<dyn ContainerDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    /// Set the image whose containers are churned
    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: ChurnConfig) -> Self {
        self.config = config;
        self
    }

    pub fn ratio(mut self, ratio: Ratio) -> Self {
        self.config.ratio = ratio;
        self
    }

    pub fn frequency(mut self, frequency: Duration) -> Self {
        self.config.frequency = frequency;
        self
    }

    pub fn sampling_mode(mut self, mode: SamplingMode) -> Self {
        self.config.destroy.mode = mode;
        self
    }

    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.config.destroy.stop_timeout = Some(timeout);
        self
    }

    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.config.destroy.drain_timeout = Some(timeout);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Inject a random source, overriding any seed
    pub fn sampler(mut self, sampler: Box<dyn Sampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    pub fn metrics(mut self, metrics: ChurnMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    /// Build the churn loop
    pub fn build(self) -> Result<ChurnLoop> {
        let driver = self
            .driver
            .ok_or_else(|| anyhow::anyhow!("Driver is required"))?;
        let image = self
            .image
            .filter(|i| !i.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Image is required"))?;
        let seed = self.config.seed;
        let sampler = self
            .sampler
            .unwrap_or_else(|| Box::new(RngSampler::from_seed(seed)));

        let mut step =
            ChurnStep::new(driver, image, self.config.ratio, sampler, self.config.destroy);
        if let Some(metrics) = &self.metrics {
            step = step.with_metrics(metrics.clone());
        }

        let mut churn_loop = ChurnLoop::new(step, self.config.frequency);
        churn_loop.metrics = self.metrics;
        churn_loop.health = self.health;
        Ok(churn_loop)
    }
}

impl Default for ChurnLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_churn_config_default() {
        let config = ChurnConfig::default();
        assert_eq!(config.frequency, Duration::from_secs(60));
        assert_eq!(config.ratio, Ratio::new(1, 1));
        assert_eq!(config.destroy.mode, SamplingMode::WithReplacement);
        assert!(config.destroy.drain_timeout.is_none());
        assert!(config.seed.is_none());
    }
}
