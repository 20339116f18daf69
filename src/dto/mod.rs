use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::models::Note;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteResponse {
    /// Note ID
    pub id: i64,
    /// Note title
    pub title: String,
    /// Note content
    pub content: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            title: note.title,
            content: note.content,
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

/// Both fields are required; they stay optional here so a missing field
/// is reported as a validation error rather than a deserialization one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateNoteRequest {
    /// Note title
    pub title: Option<String>,
    /// Note content
    pub content: Option<String>,
}

/// `None` leaves the stored value untouched, `Some("")` overwrites it.
/// An explicit `null` is rejected rather than read as omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateNoteRequest {
    /// New title
    #[serde(default, deserialize_with = "present")]
    pub title: Option<String>,
    /// New content
    #[serde(default, deserialize_with = "present")]
    pub content: Option<String>,
}

// Only runs for fields that appear in the body.
fn present<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(Some)
}

/// Uniform body returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            count: None,
            error: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T> ApiResponse<Vec<T>> {
    pub fn list(data: Vec<T>) -> Self {
        let count = data.len();
        Self {
            count: Some(count),
            ..Self::ok(data)
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            count: None,
            error: Some(error.into()),
        }
    }
}
