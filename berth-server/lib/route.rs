//! Router configuration for the berth server.

use axum::{
    middleware,
    routing::{delete, get, patch},
    Router,
};

use crate::{handler, middleware as app_middleware, state::AppState};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Create a new router with the given state
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/containers",
            get(handler::list_containers).post(handler::create_container),
        )
        .route("/containers/{id}", delete(handler::remove_container))
        .route("/containers/{id}/start", patch(handler::start_container))
        .route("/containers/{id}/stop", patch(handler::stop_container))
        .route("/jobs/{id}", get(handler::get_job))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            app_middleware::auth_middleware,
        ));

    let rest_api = Router::new()
        .route("/health", get(handler::health))
        .merge(protected);

    Router::new()
        .nest("/api/v1", rest_api)
        .layer(middleware::from_fn(app_middleware::logging_middleware))
        .with_state(state)
}
