use async_trait::async_trait;
use bollard::{
    container::{
        Config, CreateContainerOptions, InspectContainerOptions, RemoveContainerOptions,
        StartContainerOptions, StopContainerOptions,
    },
    errors::Error as DockerError,
    image::CreateImageOptions,
    Docker, API_DEFAULT_VERSION,
};
use futures::StreamExt;

use crate::{
    config::DEFAULT_DOCKER_TIMEOUT_SECS,
    models::{Container, ContainerCreateOptions},
    BerthError, BerthResult,
};

use super::ContainerRuntime;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

const DEFAULT_IMAGE_TAG: &str = "latest";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A container runtime backed by a Docker engine.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl DockerRuntime {
    /// Connects using the local defaults (`DOCKER_HOST` or the platform socket).
    pub fn connect_local() -> BerthResult<Self> {
        let docker = Docker::connect_with_local_defaults().map_err(BerthError::dependency)?;
        Ok(Self { docker })
    }

    /// Connects to an explicit engine address.
    ///
    /// `unix://` addresses use the socket at that path; anything else is treated as an
    /// HTTP endpoint such as `tcp://127.0.0.1:2375`.
    pub fn connect(host: &str) -> BerthResult<Self> {
        let docker = match host.strip_prefix("unix://") {
            Some(path) => {
                Docker::connect_with_unix(path, DEFAULT_DOCKER_TIMEOUT_SECS, API_DEFAULT_VERSION)
            }
            None => {
                Docker::connect_with_http(host, DEFAULT_DOCKER_TIMEOUT_SECS, API_DEFAULT_VERSION)
            }
        }
        .map_err(BerthError::dependency)?;

        Ok(Self { docker })
    }

    /// Pulls an image, draining the progress stream.
    async fn pull_image(&self, image: &str) -> BerthResult<()> {
        let (repository, tag) = split_image_reference(image);
        tracing::info!("pulling image: {}:{}", repository, tag);

        let mut stream = self.docker.create_image(
            Some(CreateImageOptions {
                from_image: repository.to_string(),
                tag: tag.to_string(),
                ..Default::default()
            }),
            None,
            None,
        );

        while let Some(progress) = stream.next().await {
            let info = progress.map_err(BerthError::dependency)?;
            if let Some(status) = info.status {
                tracing::debug!("pull {}: {}", image, status);
            }
        }

        tracing::info!("image pulled: {}", image);
        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn create(&self, options: &ContainerCreateOptions) -> BerthResult<String> {
        self.pull_image(&options.image).await?;

        let config = Config {
            image: Some(options.image.clone()),
            cmd: (!options.command.is_empty()).then(|| options.command.clone()),
            env: (!options.env.is_empty()).then(|| options.env.clone()),
            ..Default::default()
        };

        let response = self
            .docker
            .create_container(None::<CreateContainerOptions<String>>, config)
            .await
            .map_err(BerthError::dependency)?;

        for warning in &response.warnings {
            tracing::warn!("docker warning for container {}: {}", response.id, warning);
        }

        tracing::info!("container created: {}", response.id);
        Ok(response.id)
    }

    async fn start(&self, id: &str) -> BerthResult<()> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| map_container_error(id, e))
    }

    async fn stop(&self, id: &str) -> BerthResult<()> {
        self.docker
            .stop_container(id, None::<StopContainerOptions>)
            .await
            .map_err(|e| map_container_error(id, e))
    }

    async fn remove(&self, id: &str) -> BerthResult<()> {
        self.docker
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| map_container_error(id, e))
    }

    async fn inspect(&self, id: &str) -> BerthResult<Container> {
        let response = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| map_container_error(id, e))?;

        let config = response.config.unwrap_or_default();
        let status = response
            .state
            .and_then(|state| state.status)
            .map(|status| status.to_string())
            .unwrap_or_default();

        Ok(Container {
            id: response.id.unwrap_or_else(|| id.to_string()),
            image: config.image.unwrap_or_default(),
            command: config.cmd.unwrap_or_default(),
            env: config.env.unwrap_or_default(),
            status,
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

/// Splits an image reference into the repository and the tag or digest to pull.
///
/// The engine pulls every tag of a repository when no tag is given, so a bare name resolves to
/// `latest`. A `:` inside a registry `host:port` is not a tag separator.
fn split_image_reference(image: &str) -> (&str, &str) {
    if let Some((repository, digest)) = image.split_once('@') {
        return (repository, digest);
    }

    let name_start = image.rfind('/').map_or(0, |slash| slash + 1);
    match image[name_start..].rfind(':') {
        Some(colon) => {
            let colon = name_start + colon;
            (&image[..colon], &image[colon + 1..])
        }
        None => (image, DEFAULT_IMAGE_TAG),
    }
}

/// Maps an engine error on an existing container, turning 404s into not-found errors.
fn map_container_error(id: &str, err: DockerError) -> BerthError {
    match err {
        DockerError::DockerResponseServerError {
            status_code: 404, ..
        } => BerthError::container_not_found(id),
        other => BerthError::dependency(other),
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
