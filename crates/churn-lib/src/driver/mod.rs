//! Container runtime drivers
//!
//! The churn core only talks to the runtime through the `ContainerDriver`
//! capability set. `DockerDriver` implements it on top of the Docker Engine
//! API; tests substitute an in-memory driver.

mod docker;

pub use docker::{DockerDriver, DockerDriverConfig};

use crate::models::{ContainerDescriptor, ContainerTemplate, CreatedContainer};
use anyhow::Result;
use std::time::Duration;

pub use async_trait::async_trait;

/// Capabilities the churn core needs from a container runtime
#[async_trait]
pub trait ContainerDriver: Send + Sync {
    /// List running containers visible to the runtime
    async fn list_containers(&self) -> Result<Vec<ContainerDescriptor>>;

    /// Read the current configuration and endpoint bindings of a container
    async fn inspect(&self, container_id: &str) -> Result<ContainerTemplate>;

    /// Create an unnamed container from an inspected template
    async fn create(&self, template: &ContainerTemplate) -> Result<CreatedContainer>;

    /// Start a created container
    async fn start(&self, container_id: &str) -> Result<()>;

    /// Gracefully stop a container; `None` uses the runtime default timeout
    async fn stop(&self, container_id: &str, timeout: Option<Duration>) -> Result<()>;

    /// Block until the container has left the running state
    async fn wait_not_running(&self, container_id: &str) -> Result<()>;

    /// Remove a stopped container
    async fn remove(&self, container_id: &str) -> Result<()>;
}
