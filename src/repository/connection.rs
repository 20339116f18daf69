use std::sync::Arc;

use tokio::task::JoinHandle;

use super::PgNoteRepository;

/// Makes a single background attempt to connect `repo`. The caller does not
/// wait for it; until it succeeds every data operation fails.
///
/// Returns `None` when no DSN is configured.
pub fn spawn_connect(
    database_dsn: Option<String>,
    repo: Arc<PgNoteRepository>,
) -> Option<JoinHandle<()>> {
    let Some(database_dsn) = database_dsn else {
        tracing::warn!("Database DSN not found in configuration");
        tracing::warn!(
            "Set PG_DSN to enable persistence; all note operations will fail until then"
        );
        return None;
    };

    Some(tokio::spawn(async move {
        match repo.connect(&database_dsn).await {
            Ok(hosts) => tracing::info!("Database connected: {}", hosts.join(",")),
            Err(e) => tracing::error!("Database connection error: {e}"),
        }
    }))
}
