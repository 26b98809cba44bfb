use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};

use hermes_db::models::MessageRow;
use hermes_types::api::{
    CreateMessageRequest, CreatedResponse, EditMessageRequest, MessageListResponse, MessageResponse,
};
use hermes_types::models::MessageDraft;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::Caller;
use crate::run_blocking;
use crate::validate::Validate;

/// Messages are visible to their owner and their recipients. Only the owner
/// may edit or delete. Every "not yours" outcome is reported exactly like
/// "does not exist".
pub async fn create_message(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<CreateMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    req.validate()?;

    let draft = MessageDraft::new(req.text);
    let id = run_blocking(move || {
        Ok(state
            .db
            .insert_message(caller.user_id, &draft, &req.recipient_ids)?)
    })
    .await?;

    info!("User {} created message {}", caller.user_id, id);
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = run_blocking(move || Ok(state.db.get_visible_messages(caller.user_id)?)).await?;

    let messages = rows.into_iter().map(to_response).collect();
    Ok(Json(MessageListResponse { messages }))
}

pub async fn get_message(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = path?;

    let row = run_blocking(move || Ok(state.db.get_visible_message(caller.user_id, id)?))
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(to_response(row)))
}

/// Serves both PATCH and POST on `/message/{id}`.
pub async fn edit_message(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<EditMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = path?;
    let Json(req) = payload?;
    req.validate()?;

    let draft = req.text.map(MessageDraft::new);
    let row = run_blocking(move || {
        Ok(state.db.update_message(
            caller.user_id,
            id,
            draft.as_ref(),
            req.recipient_ids.as_deref(),
        )?)
    })
    .await?
    .ok_or(ApiError::NotFound)?;

    info!("User {} edited message {}", caller.user_id, id);
    Ok(Json(to_response(row)))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = path?;

    let deleted = run_blocking(move || Ok(state.db.delete_message(caller.user_id, id)?)).await?;
    if !deleted {
        return Err(ApiError::NotFound);
    }

    info!("User {} deleted message {}", caller.user_id, id);
    Ok(Json(serde_json::json!({ "result": "message deleted" })))
}

fn to_response(row: MessageRow) -> MessageResponse {
    let created_at = row
        .created_at
        .parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
            // Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(&row.created_at, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on message {}: {}", row.created_at, row.id, e);
            chrono::DateTime::default()
        });

    MessageResponse {
        id: row.id,
        owner_id: row.owner_id,
        text: row.text,
        palindrome: row.palindrome,
        recipient_ids: row.recipient_ids,
        created_at,
    }
}
