//! Docker Engine driver built on bollard

use super::ContainerDriver;
use crate::models::{ContainerDescriptor, ContainerTemplate, CreatedContainer};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, ListContainersOptions,
    NetworkingConfig, RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
    WaitContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::Docker;
use futures_util::StreamExt;
use std::time::Duration;
use tracing::{debug, info};

/// Connection settings for the Docker daemon
#[derive(Debug, Clone)]
pub struct DockerDriverConfig {
    /// Daemon address (`unix:///var/run/docker.sock`, `tcp://host:2375`).
    /// `None` uses the platform defaults.
    pub host: Option<String>,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for DockerDriverConfig {
    fn default() -> Self {
        Self {
            host: None,
            timeout: Duration::from_secs(120),
        }
    }
}

/// `ContainerDriver` backed by the Docker Engine API
#[derive(Debug, Clone)]
pub struct DockerDriver {
    docker: Docker,
}

impl DockerDriver {
    /// Connect to the daemon and check that it answers
    pub async fn connect(config: &DockerDriverConfig) -> Result<Self> {
        let timeout = config.timeout.as_secs();
        let docker = match config.host.as_deref() {
            None => Docker::connect_with_local_defaults(),
            Some(host) if host.starts_with("unix://") => Docker::connect_with_socket(
                host.trim_start_matches("unix://"),
                timeout,
                bollard::API_DEFAULT_VERSION,
            ),
            Some(host) => Docker::connect_with_http(host, timeout, bollard::API_DEFAULT_VERSION),
        }
        .context("Failed to create docker client")?;

        docker
            .ping()
            .await
            .context("Docker daemon is not reachable")?;

        info!(host = ?config.host, "Connected to docker daemon");
        Ok(Self { docker })
    }

    /// Wrap an already configured client
    pub fn from_client(docker: Docker) -> Self {
        Self { docker }
    }

    /// Build the create body for a clone of `template`
    fn create_body(template: &ContainerTemplate) -> Config<String> {
        let mut body = Config::from(template.config.clone());
        body.host_config = Some(template.host_config.clone());
        body.networking_config = Some(NetworkingConfig {
            endpoints_config: template.endpoints.clone(),
        });
        body
    }

    /// Stop grace period in whole seconds, rounded up so a sub-second
    /// timeout never becomes an immediate kill
    fn stop_grace_secs(timeout: Duration) -> i64 {
        let secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
        i64::try_from(secs).unwrap_or(i64::MAX)
    }
}

#[async_trait]
impl ContainerDriver for DockerDriver {
    async fn list_containers(&self) -> Result<Vec<ContainerDescriptor>> {
        let summaries = self
            .docker
            .list_containers(Some(ListContainersOptions::<String> {
                all: false,
                ..Default::default()
            }))
            .await?;

        Ok(summaries
            .into_iter()
            .filter_map(|summary| {
                let id = summary.id?;
                Some(ContainerDescriptor {
                    id,
                    image: summary.image.unwrap_or_default(),
                    networks: summary
                        .network_settings
                        .and_then(|n| n.networks)
                        .unwrap_or_default(),
                })
            })
            .collect())
    }

    async fn inspect(&self, container_id: &str) -> Result<ContainerTemplate> {
        let response = self
            .docker
            .inspect_container(container_id, None::<InspectContainerOptions>)
            .await?;

        Ok(ContainerTemplate {
            config: response.config.unwrap_or_default(),
            host_config: response.host_config.unwrap_or_default(),
            endpoints: response
                .network_settings
                .and_then(|n| n.networks)
                .unwrap_or_default(),
        })
    }

    async fn create(&self, template: &ContainerTemplate) -> Result<CreatedContainer> {
        let response = self
            .docker
            .create_container(
                None::<CreateContainerOptions<String>>,
                Self::create_body(template),
            )
            .await?;

        Ok(CreatedContainer {
            id: response.id,
            warnings: response.warnings,
        })
    }

    async fn start(&self, container_id: &str) -> Result<()> {
        self.docker
            .start_container(container_id, None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    async fn stop(&self, container_id: &str, timeout: Option<Duration>) -> Result<()> {
        let options = timeout.map(|t| StopContainerOptions {
            t: Self::stop_grace_secs(t),
        });
        self.docker.stop_container(container_id, options).await?;
        Ok(())
    }

    async fn wait_not_running(&self, container_id: &str) -> Result<()> {
        let mut stream = Box::pin(self.docker.wait_container(
            container_id,
            Some(WaitContainerOptions {
                condition: "not-running",
            }),
        ));

        match stream.next().await {
            Some(Ok(response)) => {
                debug!(container_id = %container_id, status = response.status_code, "Container exited");
                Ok(())
            }
            // A non-zero exit code still means the container stopped running
            Some(Err(BollardError::DockerContainerWaitError { code, .. })) => {
                debug!(container_id = %container_id, status = code, "Container exited");
                Ok(())
            }
            Some(Err(e)) => Err(e.into()),
            None => Ok(()),
        }
    }

    async fn remove(&self, container_id: &str) -> Result<()> {
        self.docker
            .remove_container(container_id, None::<RemoveContainerOptions>)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContainerConfig, EndpointSettings, HostConfig};
    use std::collections::HashMap;

    #[test]
    fn test_create_body_copies_template() {
        let mut endpoints = HashMap::new();
        endpoints.insert(
            "backend".to_string(),
            EndpointSettings {
                aliases: Some(vec!["app".to_string()]),
                ..Default::default()
            },
        );

        let template = ContainerTemplate {
            config: ContainerConfig {
                image: Some("app:v1".to_string()),
                env: Some(vec!["MODE=test".to_string()]),
                ..Default::default()
            },
            host_config: HostConfig {
                memory: Some(64 * 1024 * 1024),
                ..Default::default()
            },
            endpoints,
        };

        let body = DockerDriver::create_body(&template);

        assert_eq!(body.image.as_deref(), Some("app:v1"));
        assert_eq!(body.env, Some(vec!["MODE=test".to_string()]));
        assert_eq!(
            body.host_config.and_then(|h| h.memory),
            Some(64 * 1024 * 1024)
        );
        let networking = body.networking_config.unwrap();
        assert_eq!(
            networking.endpoints_config["backend"].aliases,
            Some(vec!["app".to_string()])
        );
    }

    #[test]
    fn test_default_config_uses_local_daemon() {
        let config = DockerDriverConfig::default();
        assert!(config.host.is_none());
        assert_eq!(config.timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_stop_grace_rounds_up_to_whole_seconds() {
        assert_eq!(DockerDriver::stop_grace_secs(Duration::from_millis(500)), 1);
        assert_eq!(DockerDriver::stop_grace_secs(Duration::from_millis(1500)), 2);
        assert_eq!(DockerDriver::stop_grace_secs(Duration::from_secs(10)), 10);
        assert_eq!(DockerDriver::stop_grace_secs(Duration::ZERO), 0);
    }
}
