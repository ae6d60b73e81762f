//! Berth CLI - command line entry points for running and administering the berth server.

#![warn(missing_docs)]

mod args;
mod error;
pub mod styles;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use args::*;
pub use error::*;
