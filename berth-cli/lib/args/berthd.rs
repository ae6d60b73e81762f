use std::{net::IpAddr, path::PathBuf};

use berth_core::config::{
    BERTH_DATABASE_ENV_VAR, BERTH_DOCKER_HOST_ENV_VAR, BERTH_HOST_ENV_VAR, BERTH_KEY_ENV_VAR,
    BERTH_PORT_ENV_VAR, BERTH_RUNTIME_ENV_VAR, DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT,
};
use berth_core::models::UserId;
use berth_server::RuntimeKind;
use clap::{Parser, Subcommand};

use crate::styles;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Default lifetime of keys issued by `berthd keygen`, in hours.
pub const DEFAULT_KEY_EXPIRE_HOURS: i64 = 24;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Arguments for the berthd command
#[derive(Debug, Parser)]
#[command(name = "berthd", author, version, styles=styles::styles())]
pub struct BerthdArgs {
    /// The subcommand to run
    #[command(subcommand)]
    pub subcommand: BerthdSubcommand,
}

/// Subcommands of berthd
#[derive(Debug, Subcommand)]
pub enum BerthdSubcommand {
    /// Run the API server
    Serve {
        /// Address to listen on
        #[arg(long, env = BERTH_HOST_ENV_VAR, default_value = DEFAULT_SERVER_HOST)]
        host: IpAddr,

        /// Port number to listen on
        #[arg(long, env = BERTH_PORT_ENV_VAR, default_value_t = DEFAULT_SERVER_PORT)]
        port: u16,

        /// Secret key used for JWT token validation
        #[arg(short = 'k', long, env = BERTH_KEY_ENV_VAR, hide_env_values = true)]
        key: Option<String>,

        /// Run in development mode
        #[arg(long = "dev", default_value_t = false)]
        dev_mode: bool,

        /// SQLite database file; state is kept in memory when omitted
        #[arg(long, env = BERTH_DATABASE_ENV_VAR)]
        database: Option<PathBuf>,

        /// Docker engine address, e.g. unix:///var/run/docker.sock
        #[arg(long, env = BERTH_DOCKER_HOST_ENV_VAR)]
        docker_host: Option<String>,

        /// Container engine to drive: docker or memory
        #[arg(long, env = BERTH_RUNTIME_ENV_VAR, default_value = "docker")]
        runtime: RuntimeKind,
    },

    /// Issue an API key for a user
    Keygen {
        /// User the key is issued to
        #[arg(short, long)]
        user: UserId,

        /// Hours until the key expires
        #[arg(long, default_value_t = DEFAULT_KEY_EXPIRE_HOURS)]
        expire_hours: i64,

        /// Secret key the server validates tokens with
        #[arg(short = 'k', long, env = BERTH_KEY_ENV_VAR, hide_env_values = true)]
        key: String,
    },
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_defaults() {
        let args = BerthdArgs::try_parse_from(["berthd", "serve", "--dev", "--runtime", "memory"])
            .unwrap();

        match args.subcommand {
            BerthdSubcommand::Serve {
                port,
                dev_mode,
                runtime,
                database,
                ..
            } => {
                assert_eq!(port, DEFAULT_SERVER_PORT);
                assert!(dev_mode);
                assert_eq!(runtime, RuntimeKind::Memory);
                assert!(database.is_none());
            }
            other => panic!("unexpected subcommand: {:?}", other),
        }
    }

    #[test]
    fn test_keygen_args() {
        let args = BerthdArgs::try_parse_from([
            "berthd",
            "keygen",
            "--user",
            "42",
            "--expire-hours",
            "2",
            "--key",
            "secret",
        ])
        .unwrap();

        match args.subcommand {
            BerthdSubcommand::Keygen {
                user,
                expire_hours,
                key,
            } => {
                assert_eq!(user, 42);
                assert_eq!(expire_hours, 2);
                assert_eq!(key, "secret");
            }
            other => panic!("unexpected subcommand: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_runtime() {
        assert!(BerthdArgs::try_parse_from(["berthd", "serve", "--runtime", "podman"]).is_err());
    }
}
