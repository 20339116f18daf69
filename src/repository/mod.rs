mod connection;
mod embedded;
#[cfg(test)]
pub mod memory;

pub use connection::spawn_connect;

use async_trait::async_trait;
use embedded::migrations;
use tokio::sync::OnceCell;
use tokio_postgres::{Client, NoTls, Row, config::Host};

use crate::models::Note;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database is not connected")]
    Disconnected,

    #[error("database connection is already established")]
    AlreadyConnected,

    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),

    #[error("failed to migrate database: {0}")]
    Migration(#[from] refinery::Error),
}

/// Storage for notes. Every call is a single round trip to the backing store.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    async fn create(&self, title: String, content: String) -> Result<Note, RepositoryError>;

    /// All notes, newest first.
    async fn find_all(&self) -> Result<Vec<Note>, RepositoryError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Note>, RepositoryError>;

    /// Writes title, content and `updated_at` of an existing note.
    /// Returns `None` if the note no longer exists.
    async fn save(&self, note: &Note) -> Result<Option<Note>, RepositoryError>;

    async fn delete_by_id(&self, id: i64) -> Result<bool, RepositoryError>;
}

impl TryFrom<&Row> for Note {
    type Error = tokio_postgres::Error;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Postgres-backed repository. Starts out disconnected; the client is
/// installed once by [`PgNoteRepository::connect`].
#[derive(Default)]
pub struct PgNoteRepository {
    client: OnceCell<Client>,
}

impl PgNoteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.client.initialized()
    }

    /// Opens the connection, applies migrations and installs the client.
    /// Returns the hosts named by the DSN.
    pub async fn connect(&self, database_dsn: &str) -> Result<Vec<String>, RepositoryError> {
        if self.is_connected() {
            return Err(RepositoryError::AlreadyConnected);
        }

        let config: tokio_postgres::Config = database_dsn.parse()?;
        let (mut client, con) = config.connect(NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = con.await {
                tracing::error!("connection error: {}", e);
            }
        });

        Self::migrate(&mut client).await?;

        self.client
            .set(client)
            .map_err(|_| RepositoryError::AlreadyConnected)?;

        Ok(config.get_hosts().iter().map(host_name).collect())
    }

    async fn migrate(client: &mut Client) -> Result<(), refinery::Error> {
        let migrations_report = migrations::runner().run_async(client).await?;

        for migration in migrations_report.applied_migrations() {
            tracing::info!(
                "Migration Applied -  Name: {}, Version: {}",
                migration.name(),
                migration.version()
            );
        }

        tracing::info!("DB migrations finished!");

        Ok(())
    }

    fn client(&self) -> Result<&Client, RepositoryError> {
        self.client.get().ok_or(RepositoryError::Disconnected)
    }
}

fn host_name(host: &Host) -> String {
    match host {
        Host::Tcp(name) => name.clone(),
        #[cfg(unix)]
        Host::Unix(path) => path.display().to_string(),
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn create(&self, title: String, content: String) -> Result<Note, RepositoryError> {
        let row = self
            .client()?
            .query_one(
                "INSERT INTO notes (title, content) VALUES ($1, $2) \
                 RETURNING id, title, content, created_at, updated_at",
                &[&title, &content],
            )
            .await?;

        Ok(Note::try_from(&row)?)
    }

    async fn find_all(&self) -> Result<Vec<Note>, RepositoryError> {
        let rows = self
            .client()?
            .query(
                "SELECT id, title, content, created_at, updated_at FROM notes \
                 ORDER BY created_at DESC, id DESC",
                &[],
            )
            .await?;

        let notes = rows
            .iter()
            .map(Note::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(notes)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Note>, RepositoryError> {
        let row = self
            .client()?
            .query_opt(
                "SELECT id, title, content, created_at, updated_at FROM notes WHERE id = $1",
                &[&id],
            )
            .await?;

        Ok(row.as_ref().map(Note::try_from).transpose()?)
    }

    async fn save(&self, note: &Note) -> Result<Option<Note>, RepositoryError> {
        let row = self
            .client()?
            .query_opt(
                "UPDATE notes SET title = $1, content = $2, updated_at = $3 WHERE id = $4 \
                 RETURNING id, title, content, created_at, updated_at",
                &[&note.title, &note.content, &note.updated_at, &note.id],
            )
            .await?;

        Ok(row.as_ref().map(Note::try_from).transpose()?)
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool, RepositoryError> {
        let rows = self
            .client()?
            .execute("DELETE FROM notes WHERE id = $1", &[&id])
            .await?;

        Ok(rows == 1)
    }
}
