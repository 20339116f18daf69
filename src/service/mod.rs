use chrono::{TimeDelta, Utc};

use std::sync::Arc;

use crate::{
    dto::{CreateNoteRequest, NoteResponse, UpdateNoteRequest},
    repository::{NoteRepository, RepositoryError},
};

#[derive(Debug, thiserror::Error)]
pub enum NoteServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidBody(String),

    #[error("no note with id {0}")]
    NotFound(i64),

    #[error("invalid note id \"{0}\"")]
    MalformedId(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Clone)]
pub struct NoteService {
    repo: Arc<dyn NoteRepository>,
}

impl NoteService {
    pub fn new(repo: Arc<dyn NoteRepository>) -> Self {
        Self { repo }
    }

    pub async fn create_note(
        &self,
        request: CreateNoteRequest,
    ) -> Result<NoteResponse, NoteServiceError> {
        let (title, content) = match (non_empty(request.title), non_empty(request.content)) {
            (Some(title), Some(content)) => (title, content),
            (None, Some(_)) => return Err(missing_fields(&["title"])),
            (Some(_), None) => return Err(missing_fields(&["content"])),
            (None, None) => return Err(missing_fields(&["title", "content"])),
        };

        let note = self.repo.create(title, content).await?;
        tracing::info!(note_id = note.id, "created note");

        Ok(note.into())
    }

    pub async fn get_all_notes(&self) -> Result<Vec<NoteResponse>, NoteServiceError> {
        let notes = self.repo.find_all().await?;
        tracing::info!("retrieved {} notes", notes.len());

        Ok(notes.into_iter().map(NoteResponse::from).collect())
    }

    pub async fn get_one_note(&self, id: &str) -> Result<NoteResponse, NoteServiceError> {
        let id = parse_id(id)?;
        let note = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or(NoteServiceError::NotFound(id))?;
        tracing::info!(note_id = id, "retrieved note");

        Ok(note.into())
    }

    pub async fn update_note(
        &self,
        id: &str,
        request: UpdateNoteRequest,
    ) -> Result<NoteResponse, NoteServiceError> {
        let id = parse_id(id)?;
        let mut note = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or(NoteServiceError::NotFound(id))?;

        // Only supplied fields are overwritten, empty strings included
        if let Some(title) = request.title {
            note.title = title;
        }
        if let Some(content) = request.content {
            note.content = content;
        }
        // Strictly after creation, whichever clock stamped `created_at`
        note.updated_at = Utc::now().max(note.created_at + TimeDelta::microseconds(1));

        // Last write wins; a concurrent delete surfaces as not found
        let note = self
            .repo
            .save(&note)
            .await?
            .ok_or(NoteServiceError::NotFound(id))?;
        tracing::info!(note_id = id, "updated note");

        Ok(note.into())
    }

    /// Returns the note as it was right before removal.
    pub async fn delete_note(&self, id: &str) -> Result<NoteResponse, NoteServiceError> {
        let id = parse_id(id)?;
        let snapshot = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or(NoteServiceError::NotFound(id))?;

        if self.repo.delete_by_id(id).await? {
            tracing::info!(note_id = id, "deleted note");
        } else {
            tracing::warn!(note_id = id, "note disappeared before it could be deleted");
        }

        Ok(snapshot.into())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn missing_fields(fields: &[&str]) -> NoteServiceError {
    NoteServiceError::Validation(format!("missing required field(s): {}", fields.join(", ")))
}

fn parse_id(id: &str) -> Result<i64, NoteServiceError> {
    id.parse()
        .map_err(|_| NoteServiceError::MalformedId(id.to_string()))
}
