use berth_core::BerthError;
use berth_server::ServerError;
use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of a berth CLI operation.
pub type BerthCliResult<T> = Result<T, BerthCliError>;

/// An error that occurred while running a berth CLI command.
#[derive(pretty_error_debug::Debug, Error)]
pub enum BerthCliError {
    /// An I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the orchestrator or its backends.
    #[error(transparent)]
    Berth(#[from] BerthError),

    /// An error from the server layer.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// The command line arguments were invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
