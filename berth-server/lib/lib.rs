//! Berth Server - the REST API in front of the container orchestrator.

#![warn(missing_docs)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod payload;
pub mod route;
pub mod state;

#[cfg(test)]
mod route_tests;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use auth::*;
pub use config::*;
pub use error::*;
pub use middleware::*;
pub use payload::*;
pub use route::*;
pub use state::*;
