//! Constants and defaults shared across the berth workspace.

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The job type tag recorded on container creation jobs.
pub const CONTAINER_CREATION_JOB: &str = "container_creation";

/// The default port the server listens on.
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// The default host the server binds to.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// The maximum number of pooled connections to the SQLite database.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// Seconds to wait for a Docker engine response before giving up on a connection.
pub const DEFAULT_DOCKER_TIMEOUT_SECS: u64 = 120;

/// Environment variable for the server port.
pub const BERTH_PORT_ENV_VAR: &str = "BERTH_PORT";

/// Environment variable for the server host.
pub const BERTH_HOST_ENV_VAR: &str = "BERTH_HOST";

/// Environment variable for the JWT signing key.
pub const BERTH_KEY_ENV_VAR: &str = "BERTH_KEY";

/// Environment variable for the SQLite database path.
pub const BERTH_DATABASE_ENV_VAR: &str = "BERTH_DATABASE";

/// Environment variable for the Docker engine address.
pub const BERTH_DOCKER_HOST_ENV_VAR: &str = "BERTH_DOCKER_HOST";

/// Environment variable selecting the container runtime backend.
pub const BERTH_RUNTIME_ENV_VAR: &str = "BERTH_RUNTIME";
