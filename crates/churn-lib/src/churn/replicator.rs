//! Cloning a template container

use crate::driver::ContainerDriver;
use crate::error::{ChurnError, DriverOp};
use crate::observability::ChurnLogger;

/// Create and start `count` copies of `template_id`
///
/// The template is inspected once and that snapshot feeds every creation.
/// Returns the ids of the started clones. On the first failure the error is
/// returned and clones started earlier in the same call are left running.
pub async fn replicate(
    driver: &dyn ContainerDriver,
    logger: &ChurnLogger,
    template_id: &str,
    count: usize,
) -> Result<Vec<String>, ChurnError> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let template = driver
        .inspect(template_id)
        .await
        .map_err(|e| ChurnError::driver(DriverOp::Inspect, Some(template_id), e))?;

    let mut started = Vec::with_capacity(count);
    for _ in 0..count {
        let created = driver
            .create(&template)
            .await
            .map_err(|e| ChurnError::driver(DriverOp::Create, Some(template_id), e))?;

        for warning in &created.warnings {
            logger.log_create_warning(&created.id, warning);
        }
        logger.log_container_created(&created.id, template_id);

        driver
            .start(&created.id)
            .await
            .map_err(|e| ChurnError::driver(DriverOp::Start, Some(&created.id), e))?;
        logger.log_container_started(&created.id);

        started.push(created.id);
    }

    Ok(started)
}
