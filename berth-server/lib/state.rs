//! Application state shared by every request handler.

use std::sync::Arc;

use berth_core::management::ContainerOrchestrator;
use getset::Getters;

use crate::config::Config;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Application state structure
#[derive(Debug, Clone, Getters)]
#[getset(get = "pub with_prefix")]
pub struct AppState {
    /// The application configuration
    config: Arc<Config>,

    /// The orchestrator serving container and job requests
    orchestrator: ContainerOrchestrator,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl AppState {
    /// Create a new application state instance
    pub fn new(config: Arc<Config>, orchestrator: ContainerOrchestrator) -> Self {
        Self {
            config,
            orchestrator,
        }
    }
}
