mod config;
mod dto;
mod handlers;
mod models;
mod repository;
mod service;

use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use std::{net::SocketAddr, sync::Arc};

use handlers::rest;
use repository::PgNoteRepository;

use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use service::NoteService;

#[tokio::main]
async fn main() {
    // Log setup
    tracing_subscriber::fmt::init();

    // Load config
    let cfg = config::load_config().unwrap_or_else(|e| {
        tracing::error!("Failed to load configuration: {e}");
        panic!("failed to load configuration: {e}");
    });

    // Repository creation, connected in the background
    let repo = Arc::new(PgNoteRepository::new());
    repository::spawn_connect(cfg.pg_dsn.clone(), repo.clone());

    // Service creation
    let service = Arc::new(NoteService::new(repo));

    // Router config
    let router = Router::new()
        .route("/", get(root))
        .merge(rest::router(service))
        .merge(
            SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", rest::ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind to {addr}: {e}");
            panic!("failed to bind to {addr}: {e}");
        });

    tracing::info!("REST server starting, listening on {}", addr);

    if let Err(e) = axum::serve(listener, router).await {
        tracing::error!("HTTP server error: {e}");
        panic!("failed to start HTTP server: {e}");
    }
}

async fn root() -> Response {
    (StatusCode::OK, "Notes API is running").into_response()
}
