//! Candidate selection by image

use crate::driver::ContainerDriver;
use crate::error::{ChurnError, DriverOp};
use crate::models::ContainerDescriptor;
use tracing::debug;

/// List running containers and keep those whose image equals `image` exactly
///
/// No tag normalization or digest resolution is done: `app` and
/// `app:latest` are different images here. An empty result is not an error.
pub async fn select(
    driver: &dyn ContainerDriver,
    image: &str,
) -> Result<Vec<ContainerDescriptor>, ChurnError> {
    let containers = driver
        .list_containers()
        .await
        .map_err(|e| ChurnError::driver(DriverOp::List, None, e))?;

    let candidates: Vec<ContainerDescriptor> = containers
        .into_iter()
        .filter(|c| c.image == image)
        .collect();

    for candidate in &candidates {
        debug!(
            container_id = %candidate.id,
            image = %candidate.image,
            "Found candidate container"
        );
    }

    Ok(candidates)
}
