use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicI64, Ordering},
};

use super::{NoteRepository, RepositoryError};
use crate::models::Note;

/// In-process stand-in for the Postgres repository.
#[derive(Default)]
pub struct MemoryNoteRepository {
    notes: Mutex<BTreeMap<i64, Note>>,
    // Ids are never reused, matching a database sequence.
    last_id: AtomicI64,
}

impl MemoryNoteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `note` as given, timestamps included.
    pub async fn insert(&self, note: Note) {
        self.last_id.fetch_max(note.id, Ordering::Relaxed);
        self.notes.lock().await.insert(note.id, note);
    }

    pub async fn len(&self) -> usize {
        self.notes.lock().await.len()
    }
}

#[async_trait]
impl NoteRepository for MemoryNoteRepository {
    async fn create(&self, title: String, content: String) -> Result<Note, RepositoryError> {
        let mut notes = self.notes.lock().await;
        let id = self.last_id.fetch_add(1, Ordering::Relaxed) + 1;
        let now = Utc::now();
        let note = Note {
            id,
            title,
            content,
            created_at: now,
            updated_at: now,
        };

        notes.insert(id, note.clone());
        Ok(note)
    }

    async fn find_all(&self) -> Result<Vec<Note>, RepositoryError> {
        let mut notes: Vec<Note> = self.notes.lock().await.values().cloned().collect();
        notes.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(notes)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Note>, RepositoryError> {
        Ok(self.notes.lock().await.get(&id).cloned())
    }

    async fn save(&self, note: &Note) -> Result<Option<Note>, RepositoryError> {
        let mut notes = self.notes.lock().await;
        Ok(notes.get_mut(&note.id).map(|stored| {
            stored.title.clone_from(&note.title);
            stored.content.clone_from(&note.content);
            stored.updated_at = note.updated_at;
            stored.clone()
        }))
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool, RepositoryError> {
        Ok(self.notes.lock().await.remove(&id).is_some())
    }
}
