use serde::{Deserialize, Serialize};

use crate::{BerthError, BerthResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Parameters for creating a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerCreateOptions {
    /// The image to create the container from
    pub image: String,

    /// The command to run, empty for the image default
    #[serde(default, rename = "cmd")]
    pub command: Vec<String>,

    /// Environment variables in `KEY=value` form
    #[serde(default)]
    pub env: Vec<String>,
}

/// A container as reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// The runtime's container identifier
    pub id: String,

    /// The image the container was created from
    pub image: String,

    /// The command the container runs
    pub command: Vec<String>,

    /// Environment variables in `KEY=value` form
    pub env: Vec<String>,

    /// The runtime's state string, e.g. `created`, `running` or `exited`
    pub status: String,
}

/// The result recorded on a completed container creation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerCreation {
    /// The identifier of the created container
    pub container_id: String,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ContainerCreateOptions {
    /// Creates options for the given image with no command or environment.
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            command: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Sets the command.
    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the environment variables.
    pub fn with_env<I, S>(mut self, env: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.env = env.into_iter().map(Into::into).collect();
        self
    }

    /// Rejects options the runtime could never act on.
    pub fn validate(&self) -> BerthResult<()> {
        if self.image.trim().is_empty() {
            return Err(BerthError::Validation("image must not be empty".to_string()));
        }

        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
