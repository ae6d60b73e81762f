//! Request handlers for the berth server.
//!
//! Handlers only translate between HTTP and the orchestrator. Every authenticated handler reads
//! the caller from the [`AuthUser`] extension set by the auth middleware.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use berth_core::models::ContainerCreateOptions;

use crate::{
    middleware::AuthUser,
    payload::{
        ContainerResponse, CreateContainerRequest, CreateContainerResponse, JobResponse,
        RegularMessageResponse,
    },
    state::AppState,
    ServerResult,
};

//--------------------------------------------------------------------------------------------------
// Functions: Handlers
//--------------------------------------------------------------------------------------------------

/// Handler for health check
pub async fn health() -> ServerResult<impl IntoResponse> {
    Ok((
        StatusCode::OK,
        Json(RegularMessageResponse {
            message: "Service is healthy".to_string(),
        }),
    ))
}

/// Lists the caller's containers
pub async fn list_containers(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> ServerResult<impl IntoResponse> {
    let containers = state.get_orchestrator().list_containers(user_id).await?;
    let containers: Vec<ContainerResponse> =
        containers.into_iter().map(ContainerResponse::from).collect();

    Ok((StatusCode::OK, Json(containers)))
}

/// Accepts a container creation request and returns the tracking job
pub async fn create_container(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    request: Result<Json<CreateContainerRequest>, JsonRejection>,
) -> ServerResult<impl IntoResponse> {
    let Json(request) = request?;
    let options = ContainerCreateOptions::from(request);
    let job_id = state
        .get_orchestrator()
        .create_container(user_id, options)
        .await?;

    Ok((StatusCode::ACCEPTED, Json(CreateContainerResponse { job_id })))
}

/// Starts one of the caller's containers
pub async fn start_container(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ServerResult<impl IntoResponse> {
    state.get_orchestrator().start_container(user_id, &id).await?;
    Ok(message(format!("Container {} started", id)))
}

/// Stops one of the caller's containers
pub async fn stop_container(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ServerResult<impl IntoResponse> {
    state.get_orchestrator().stop_container(user_id, &id).await?;
    Ok(message(format!("Container {} stopped", id)))
}

/// Removes one of the caller's containers
pub async fn remove_container(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ServerResult<impl IntoResponse> {
    state.get_orchestrator().remove_container(user_id, &id).await?;
    Ok(message(format!("Container {} removed", id)))
}

/// Returns one of the caller's jobs
pub async fn get_job(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let job = state.get_orchestrator().get_job(user_id, &id).await?;
    Ok((StatusCode::OK, Json(JobResponse::from(job))))
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

fn message(message: String) -> (StatusCode, Json<RegularMessageResponse>) {
    (StatusCode::OK, Json(RegularMessageResponse { message }))
}
