use std::sync::Arc;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Method,
};
use berth_cli::{BerthCliError, BerthCliResult, BerthdArgs, BerthdSubcommand};
use berth_core::{
    management::ContainerOrchestrator,
    runtime::{ContainerRuntime, DockerRuntime, InMemoryRuntime},
    store::{
        get_or_create_pool, JobStore, MemoryJobStore, MemoryOwnershipRegistry, OwnershipRegistry,
        SqliteJobStore, SqliteOwnershipRegistry,
    },
};
use berth_server::{generate_api_key, route, state::AppState, Config, RuntimeKind};
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

//--------------------------------------------------------------------------------------------------
// Functions: Main
//--------------------------------------------------------------------------------------------------

#[tokio::main]
pub async fn main() -> BerthCliResult<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = BerthdArgs::parse();

    match args.subcommand {
        BerthdSubcommand::Serve {
            host,
            port,
            key,
            dev_mode,
            database,
            docker_host,
            runtime,
        } => {
            let config = Config::new(key, host, port, database, docker_host, runtime, dev_mode)?;
            serve(config).await?;
        }
        BerthdSubcommand::Keygen {
            user,
            expire_hours,
            key,
        } => {
            keygen(&key, user, expire_hours)?;
        }
    }

    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Functions: Subcommands
//--------------------------------------------------------------------------------------------------

async fn serve(config: Config) -> BerthCliResult<()> {
    if *config.get_dev_mode() {
        tracing::info!("Development mode: {}", config.get_dev_mode());
        println!(
            "{} Running in {} mode",
            console::style("✓").green(),
            console::style("development").yellow()
        );
    }

    let runtime: Arc<dyn ContainerRuntime> = match config.get_runtime() {
        RuntimeKind::Docker => Arc::new(match config.get_docker_host() {
            Some(host) => DockerRuntime::connect(host)?,
            None => DockerRuntime::connect_local()?,
        }),
        RuntimeKind::Memory => {
            tracing::warn!("using the in-memory runtime, no containers will actually run");
            Arc::new(InMemoryRuntime::new())
        }
    };

    let (owners, jobs): (Arc<dyn OwnershipRegistry>, Arc<dyn JobStore>) =
        match config.get_database() {
            Some(path) => {
                let pool = get_or_create_pool(path).await?;
                (
                    Arc::new(SqliteOwnershipRegistry::new(pool.clone())),
                    Arc::new(SqliteJobStore::new(pool)),
                )
            }
            None => {
                tracing::warn!("no database configured, state will be lost on restart");
                (
                    Arc::new(MemoryOwnershipRegistry::new()),
                    Arc::new(MemoryJobStore::new()),
                )
            }
        };

    let config = Arc::new(config);
    let orchestrator = ContainerOrchestrator::new(runtime, owners, jobs);
    let state = AppState::new(config.clone(), orchestrator);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_origin(Any);

    let app = route::create_router(state).layer(cors);

    tracing::info!(
        "Starting server on {} with the {} runtime",
        config.get_addr(),
        config.get_runtime()
    );
    println!(
        "{} Server listening on {}",
        console::style("✓").green(),
        console::style(config.get_addr()).yellow()
    );

    let listener = tokio::net::TcpListener::bind(config.get_addr()).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

fn keygen(key: &str, user: i64, expire_hours: i64) -> BerthCliResult<()> {
    if expire_hours <= 0 {
        return Err(BerthCliError::InvalidArgument(format!(
            "--expire-hours must be positive, got {}",
            expire_hours
        )));
    }

    let api_key = generate_api_key(key, user, chrono::Duration::hours(expire_hours))?;

    println!("Generated new API key for user {}:", user);
    println!("{}", console::style(&api_key).cyan());
    println!(
        "Expires in {} hours",
        console::style(expire_hours).yellow()
    );

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
