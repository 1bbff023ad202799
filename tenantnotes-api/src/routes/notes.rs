/// Note endpoints
///
/// All routes act on the authenticated user's own notes. Every query carries
/// `owner_user_id`, so each request touches one shard.
///
/// # Endpoints
///
/// - `GET /v1/notes` - List notes, newest first
/// - `POST /v1/notes` - Create a note
/// - `GET /v1/notes/:id` - Fetch one note
/// - `PUT /v1/notes/:id` - Replace a note's content

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tenantnotes_shared::{auth::middleware::AuthContext, models::note::Note};

/// Note id taken from the path
///
/// A non-integer id is answered with the JSON `bad_request` body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteId(pub i32);

#[async_trait]
impl<S> FromRequestParts<S> for NoteId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i32>::from_request_parts(parts, state).await?;
        Ok(Self(id))
    }
}

/// Create or update request
#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub content: String,
}

/// Note as returned to clients
#[derive(Debug, Serialize, Deserialize)]
pub struct NoteResponse {
    pub id: i32,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            content: note.content,
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

/// Note list response
#[derive(Debug, Serialize, Deserialize)]
pub struct ListNotesResponse {
    pub notes: Vec<NoteResponse>,
}

pub async fn list_notes(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ListNotesResponse>> {
    let notes = Note::list_for_user(&state.db, auth.user_id).await?;

    Ok(Json(ListNotesResponse {
        notes: notes.into_iter().map(NoteResponse::from).collect(),
    }))
}

/// Create a note
///
/// Content is trimmed; blank content is rejected with `422`.
pub async fn create_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<NoteRequest>,
) -> ApiResult<(StatusCode, Json<NoteResponse>)> {
    let note = Note::create(&state.db, auth.user_id, &req.content).await?;

    tracing::debug!(note_id = note.id, user_id = auth.user_id, "Note created");

    Ok((StatusCode::CREATED, Json(note.into())))
}

pub async fn get_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    NoteId(id): NoteId,
) -> ApiResult<Json<NoteResponse>> {
    let note = Note::find(&state.db, auth.user_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Note not found".to_string()))?;

    Ok(Json(note.into()))
}

/// Replace a note's content
///
/// Notes owned by someone else answer `404`, same as missing ones.
pub async fn update_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    NoteId(id): NoteId,
    Json(req): Json<NoteRequest>,
) -> ApiResult<Json<NoteResponse>> {
    let note = Note::update_content(&state.db, auth.user_id, id, &req.content)
        .await?
        .ok_or_else(|| ApiError::NotFound("Note not found".to_string()))?;

    Ok(Json(note.into()))
}
