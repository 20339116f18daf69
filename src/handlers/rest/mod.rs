use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{FromRequest, Path, Request, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use axum_macros::debug_handler;
use serde::de::DeserializeOwned;
use utoipa::OpenApi;

use std::sync::Arc;

use crate::{
    dto::{ApiResponse, CreateNoteRequest, NoteResponse, UpdateNoteRequest},
    service::{NoteService, NoteServiceError},
};

#[derive(OpenApi)]
#[openapi(
    paths(create_note, get_all_notes, get_one_note, update_note, delete_note),
    components(schemas(NoteResponse, CreateNoteRequest, UpdateNoteRequest)),
    tags(
        (name = "notes", description = "Notes management API")
    )
)]
pub struct ApiDoc;

pub fn router(service: Arc<NoteService>) -> Router {
    Router::new()
        .route("/notes", get(get_all_notes).post(create_note))
        .route(
            "/notes/{id}",
            get(get_one_note)
                .put(update_note)
                .patch(update_note)
                .delete(delete_note),
        )
        .with_state(service)
}

/// JSON body where an absent or blank body stands for `T::default()`,
/// i.e. no fields supplied.
pub struct JsonOrDefault<T>(pub T);

impl<T, S> FromRequest<S> for JsonOrDefault<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = JsonRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();
        let bytes = Bytes::from_request(Request::new(body), state).await?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(T::default()));
        }

        let Json(value) =
            Json::from_request(Request::from_parts(parts, Body::from(bytes)), state).await?;
        Ok(Self(value))
    }
}

/// Maps a service failure onto the envelope. `context` is the message used
/// for internal errors.
fn error_response(e: &NoteServiceError, context: &str) -> Response {
    let (status, message) = match e {
        NoteServiceError::Validation(_) => {
            tracing::warn!("rejected request: {e}");
            (StatusCode::BAD_REQUEST, "Title and content are required")
        }
        NoteServiceError::InvalidBody(_) => {
            tracing::warn!("rejected request: {e}");
            (StatusCode::BAD_REQUEST, "Invalid request body")
        }
        NoteServiceError::NotFound(_) => {
            tracing::info!("{e}");
            (StatusCode::NOT_FOUND, "Note not found")
        }
        NoteServiceError::MalformedId(_) | NoteServiceError::Repository(_) => {
            tracing::error!("{context}: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, context)
        }
    };

    (status, Json(ApiResponse::failure(message, e.to_string()))).into_response()
}

#[utoipa::path(
    post,
    path = "/notes",
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Note created successfully", body = ApiResponse<NoteResponse>),
        (status = 400, description = "Title or content missing"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn create_note(
    State(service): State<Arc<NoteService>>,
    payload: Result<JsonOrDefault<CreateNoteRequest>, JsonRejection>,
) -> Response {
    const CONTEXT: &str = "Error creating note";

    let JsonOrDefault(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return error_response(
                &NoteServiceError::InvalidBody(rejection.body_text()),
                CONTEXT,
            );
        }
    };

    match service.create_note(payload).await {
        Ok(note) => (
            StatusCode::CREATED,
            Json(ApiResponse::ok(note).with_message("Note created successfully")),
        )
            .into_response(),
        Err(e) => error_response(&e, CONTEXT),
    }
}

#[utoipa::path(
    get,
    path = "/notes",
    responses(
        (
            status = 200,
            description = "All notes, newest first",
            body = ApiResponse<Vec<NoteResponse>>
        ),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn get_all_notes(State(service): State<Arc<NoteService>>) -> Response {
    match service.get_all_notes().await {
        Ok(notes) => (StatusCode::OK, Json(ApiResponse::list(notes))).into_response(),
        Err(e) => error_response(&e, "Error retrieving notes"),
    }
}

#[utoipa::path(
    get,
    path = "/notes/{id}",
    params(
        ("id" = String, Path, description = "Note ID")
    ),
    responses(
        (status = 200, description = "Note found", body = ApiResponse<NoteResponse>),
        (status = 404, description = "Note not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn get_one_note(
    State(service): State<Arc<NoteService>>,
    Path(id): Path<String>,
) -> Response {
    match service.get_one_note(&id).await {
        Ok(note) => (StatusCode::OK, Json(ApiResponse::ok(note))).into_response(),
        Err(e) => error_response(&e, "Error retrieving note"),
    }
}

#[utoipa::path(
    put,
    path = "/notes/{id}",
    params(
        ("id" = String, Path, description = "Note ID")
    ),
    request_body = UpdateNoteRequest,
    responses(
        (status = 200, description = "Note updated successfully", body = ApiResponse<NoteResponse>),
        (status = 400, description = "Body is not a valid update"),
        (status = 404, description = "Note not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn update_note(
    State(service): State<Arc<NoteService>>,
    Path(id): Path<String>,
    payload: Result<JsonOrDefault<UpdateNoteRequest>, JsonRejection>,
) -> Response {
    const CONTEXT: &str = "Error updating note";

    let JsonOrDefault(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            // Unknown ids answer 404 whatever the body
            let e = match service.get_one_note(&id).await {
                Ok(_) => NoteServiceError::InvalidBody(rejection.body_text()),
                Err(e) => e,
            };
            return error_response(&e, CONTEXT);
        }
    };

    match service.update_note(&id, payload).await {
        Ok(note) => (
            StatusCode::OK,
            Json(ApiResponse::ok(note).with_message("Note updated successfully")),
        )
            .into_response(),
        Err(e) => error_response(&e, CONTEXT),
    }
}

#[utoipa::path(
    delete,
    path = "/notes/{id}",
    params(
        ("id" = String, Path, description = "Note ID")
    ),
    responses(
        (
            status = 200,
            description = "Note deleted, returns its last state",
            body = ApiResponse<NoteResponse>
        ),
        (status = 404, description = "Note not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn delete_note(
    State(service): State<Arc<NoteService>>,
    Path(id): Path<String>,
) -> Response {
    match service.delete_note(&id).await {
        Ok(note) => (
            StatusCode::OK,
            Json(ApiResponse::ok(note).with_message("Note deleted successfully")),
        )
            .into_response(),
        Err(e) => error_response(&e, "Error deleting note"),
    }
}
