//! Records exchanged between the orchestrator, its stores and the container runtime.

mod container;
mod job;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use container::*;
pub use job::*;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Identifier of an authenticated user.
pub type UserId = i64;
