pub mod auth;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod validate;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tracing::error;

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;

/// All HTTP routes. Message routes sit behind bearer-token auth; `/` and the
/// `/user` routes are public.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(health))
        .route("/user", post(auth::register))
        .route("/user/login", post(auth::login));

    let protected_routes = Router::new()
        .route(
            "/message",
            post(messages::create_message).get(messages::list_messages),
        )
        .route(
            "/message/{id}",
            get(messages::get_message)
                .patch(messages::edit_message)
                .post(messages::edit_message)
                .delete(messages::delete_message),
        )
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Run blocking work (SQLite, Argon2) off the async runtime.
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(e.into())
    })?
}
