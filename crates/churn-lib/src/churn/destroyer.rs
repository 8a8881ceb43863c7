//! Tearing down sampled containers

use crate::driver::ContainerDriver;
use crate::error::{ChurnError, DriverOp};
use crate::models::ContainerDescriptor;
use crate::observability::ChurnLogger;
use crate::sampler::{Sampler, SamplingMode};
use std::time::Duration;

/// Knobs for container teardown
#[derive(Debug, Clone, Copy, Default)]
pub struct DestroyOptions {
    /// How victims are drawn from the pool
    pub mode: SamplingMode,
    /// Graceful stop timeout, runtime default when `None`
    pub stop_timeout: Option<Duration>,
    /// Upper bound on waiting for a stopped container to exit, unbounded when `None`
    pub drain_timeout: Option<Duration>,
}

/// Stop, wait for and remove `count` containers drawn from `pool`
///
/// Fails before touching the runtime when `count` exceeds the pool size.
/// Returns the ids torn down, in order. Stops at the first failing call.
pub async fn destroy(
    driver: &dyn ContainerDriver,
    logger: &ChurnLogger,
    pool: &[ContainerDescriptor],
    count: usize,
    sampler: &mut dyn Sampler,
    options: DestroyOptions,
) -> Result<Vec<String>, ChurnError> {
    if count > pool.len() {
        return Err(ChurnError::InsufficientCandidates {
            requested: count,
            available: pool.len(),
        });
    }

    let victims = options.mode.draw(sampler, pool.len(), count);
    let mut removed = Vec::with_capacity(count);

    for index in victims {
        let id = pool[index].id.as_str();

        driver
            .stop(id, options.stop_timeout)
            .await
            .map_err(|e| ChurnError::driver(DriverOp::Stop, Some(id), e))?;
        logger.log_container_stopped(id);

        wait_not_running(driver, id, options.drain_timeout).await?;

        driver
            .remove(id)
            .await
            .map_err(|e| ChurnError::driver(DriverOp::Remove, Some(id), e))?;
        logger.log_container_removed(id);

        removed.push(id.to_string());
    }

    Ok(removed)
}

async fn wait_not_running(
    driver: &dyn ContainerDriver,
    id: &str,
    drain_timeout: Option<Duration>,
) -> Result<(), ChurnError> {
    let waited = match drain_timeout {
        Some(limit) => match tokio::time::timeout(limit, driver.wait_not_running(id)).await {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!(
                "container still running after {}ms",
                limit.as_millis()
            )),
        },
        None => driver.wait_not_running(id).await,
    };

    waited.map_err(|e| ChurnError::driver(DriverOp::Wait, Some(id), e))
}
