//! Core data models for the churn controller

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use bollard::models::{ContainerConfig, EndpointSettings, HostConfig};

/// Container as reported by a runtime listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerDescriptor {
    pub id: String,
    pub image: String,
    /// Network name -> endpoint settings
    pub networks: HashMap<String, EndpointSettings>,
}

impl ContainerDescriptor {
    pub fn new(id: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            image: image.into(),
            networks: HashMap::new(),
        }
    }
}

/// Inspected configuration of a container, used as the source for clones
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerTemplate {
    pub config: ContainerConfig,
    pub host_config: HostConfig,
    /// Endpoint bindings the template is currently attached with
    pub endpoints: HashMap<String, EndpointSettings>,
}

/// Result of a container create call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedContainer {
    pub id: String,
    #[serde(default)]
    pub warnings: Vec<String>,
}
