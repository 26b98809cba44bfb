use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::auth::AppState;
use crate::error::ApiError;

/// Identity resolved from the bearer token, available to handlers as
/// `Extension<Caller>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
}

/// Extract and validate the ES256 token from the Authorization header.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let user_id = state.tokens.verify_header(auth_header).map_err(|e| {
        debug!("Rejected {} {}: {}", req.method(), req.uri().path(), e);
        ApiError::from(e)
    })?;

    req.extensions_mut().insert(Caller { user_id });
    Ok(next.run(req).await)
}
