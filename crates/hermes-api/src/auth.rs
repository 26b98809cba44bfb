use std::sync::Arc;

use axum::{Json, extract::State, extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse};
use tracing::{debug, info};

use hermes_crypto::{PasswordScheme, TokenKeys};
use hermes_db::Database;
use hermes_types::api::{Credentials, TokenResponse};

use crate::error::ApiError;
use crate::run_blocking;
use crate::validate::Validate;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenKeys,
    pub passwords: PasswordScheme,
}

const BAD_LOGIN: &str = "username or password is not right";

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    req.validate()?;

    let db_state = state.clone();
    let username = req.username.clone();
    let user_id = run_blocking(move || {
        // Cheap pre-check so a taken name does not pay for a hash; the UNIQUE
        // constraint still catches concurrent registrations.
        if db_state.db.get_user_by_username(&req.username)?.is_some() {
            return Err(ApiError::Conflict);
        }

        let password_key = db_state.passwords.hash(&req.password)?;
        Ok(db_state.db.create_user(&req.username, &password_key)?)
    })
    .await?;

    info!("Registered user {} ({})", username, user_id);

    let access_token = state.tokens.issue(user_id)?;
    Ok((StatusCode::CREATED, Json(TokenResponse { access_token })))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    req.validate()?;

    let db_state = state.clone();
    let user_id = run_blocking(move || {
        let Some(user) = db_state.db.get_user_by_username(&req.username)? else {
            debug!("Login for unknown user {}", req.username);
            return Err(ApiError::Unauthorized(BAD_LOGIN.to_string()));
        };

        if !db_state.passwords.verify(&req.password, &user.password_key)? {
            debug!("Wrong password for user {}", req.username);
            return Err(ApiError::Unauthorized(BAD_LOGIN.to_string()));
        }

        Ok(user.id)
    })
    .await?;

    let access_token = state.tokens.issue(user_id)?;
    Ok(Json(TokenResponse { access_token }))
}
