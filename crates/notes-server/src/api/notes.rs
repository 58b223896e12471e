//! Note endpoints. Every handler takes [`AuthUser`], so the token is checked
//! before the body is read.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::{AuthUser, MessageResponse};
use crate::error::{ApiError, Result};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct NotesResponse {
    pub notes: Vec<String>,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddNoteRequest {
    #[serde(default)]
    pub content: Option<String>,
}

/// Handler for `GET /api/notes`
pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<NotesResponse>> {
    let listing = state.notes.list_notes(&claims.id).await?;

    Ok(Json(NotesResponse {
        notes: listing.notes,
        email: claims.email,
        name: listing.name,
    }))
}

/// Handler for `POST /api/notes`
pub async fn add_note(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    payload: std::result::Result<Json<AddNoteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    // A non-string `content` fails to deserialize; report it like a missing one
    let content = payload.ok().and_then(|Json(req)| req.content);
    state.notes.add_note(&claims.id, content.as_deref()).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Note added successfully")),
    ))
}

/// Handler for `DELETE /api/notes/{id}`, where `id` is the note's position
/// in the most-recent-first listing
pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let index: usize = id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid note index".to_string()))?;

    state.notes.delete_note(&claims.id, index).await?;
    Ok(Json(MessageResponse::new("Note deleted successfully")))
}
