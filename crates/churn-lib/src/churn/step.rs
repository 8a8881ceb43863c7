//! One churn cycle: select, replicate, destroy

use super::destroyer::{destroy, DestroyOptions};
use super::replicator::replicate;
use super::selector::select;
use super::Phase;
use crate::driver::ContainerDriver;
use crate::error::ChurnError;
use crate::observability::{ChurnLogger, ChurnMetrics};
use crate::ratio::Ratio;
use crate::sampler::Sampler;
use std::sync::Arc;
use tracing::debug;

/// What a successful step did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// No running container matched the image
    NoCandidates,
    Churned {
        /// Container the clones were made from
        template: String,
        /// Size of the candidate pool before replication
        candidates: usize,
        /// Clones created and started
        created: Vec<String>,
        /// Containers stopped and removed
        removed: Vec<String>,
    },
}

/// Executes churn steps against one image
///
/// Holds no state between steps apart from the random source; the candidate
/// pool is rebuilt on every call to `run`.
pub struct ChurnStep {
    driver: Arc<dyn ContainerDriver>,
    image: String,
    ratio: Ratio,
    sampler: Box<dyn Sampler>,
    options: DestroyOptions,
    logger: ChurnLogger,
    phase: Phase,
}

impl ChurnStep {
    /// `ratio` is resolved here, so a zero-sided ratio churns 1:1
    pub fn new(
        driver: Arc<dyn ContainerDriver>,
        image: impl Into<String>,
        ratio: Ratio,
        sampler: Box<dyn Sampler>,
        options: DestroyOptions,
    ) -> Self {
        let image = image.into();
        Self {
            logger: ChurnLogger::new(&image),
            driver,
            image,
            ratio: ratio.resolve(),
            sampler,
            options,
            phase: Phase::Idle,
        }
    }

    /// Count created and removed containers as each one happens
    pub fn with_metrics(mut self, metrics: ChurnMetrics) -> Self {
        self.logger = self.logger.with_metrics(metrics);
        self
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn ratio(&self) -> Ratio {
        self.ratio
    }

    /// Current phase; `Idle` whenever no step is running
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Run one step. Any error aborts the rest of the step.
    pub async fn run(&mut self) -> Result<StepOutcome, ChurnError> {
        let result = self.run_phases().await;
        self.enter(Phase::Idle);
        result
    }

    async fn run_phases(&mut self) -> Result<StepOutcome, ChurnError> {
        self.enter(Phase::Selecting);
        let pool = select(self.driver.as_ref(), &self.image).await?;
        if pool.is_empty() {
            debug!(image = %self.image, "No candidate containers");
            return Ok(StepOutcome::NoCandidates);
        }

        let template = pool[self.sampler.pick(pool.len())].id.clone();

        self.enter(Phase::Replicating);
        let created = replicate(
            self.driver.as_ref(),
            &self.logger,
            &template,
            self.ratio.up as usize,
        )
        .await?;

        // Clones from this step are not in `pool` and cannot be torn down
        self.enter(Phase::Destroying);
        let removed = destroy(
            self.driver.as_ref(),
            &self.logger,
            &pool,
            self.ratio.down as usize,
            self.sampler.as_mut(),
            self.options,
        )
        .await?;

        Ok(StepOutcome::Churned {
            template,
            candidates: pool.len(),
            created,
            removed,
        })
    }

    fn enter(&mut self, phase: Phase) {
        debug!(image = %self.image, from = %self.phase, to = %phase, "Churn phase");
        self.phase = phase;
    }
}
