//! Container orchestration and the concurrency guard that protects it.

mod guard;
mod orchestrator;


//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use guard::*;
pub use orchestrator::*;
