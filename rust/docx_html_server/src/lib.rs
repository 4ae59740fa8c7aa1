//! HTTP front end for the Word → HTML formatter.
//!
//! One endpoint, `POST /api/convert`, takes a multipart upload in the `docx`
//! field and answers with the formatted HTML. Everything else is served from
//! the static client directory.

mod handlers;
mod types;

use axum::{extract::DefaultBodyLimit, routing::post, Router};
use docx_html_format::{DocumentConverter, DocxConverter, StyleMap};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use handlers::*;
pub use types::*;

/// Shared by all handlers; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub converter: Arc<dyn DocumentConverter + Send + Sync>,
    pub public_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppState {
    #[must_use]
    pub fn new(public_dir: impl Into<PathBuf>, max_upload_mb: usize) -> Self {
        Self {
            converter: Arc::new(DocxConverter::new(StyleMap::default())),
            public_dir: public_dir.into(),
            max_upload_bytes: max_upload_mb.saturating_mul(1024 * 1024),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.public_dir);
    let limit = state.max_upload_bytes;
    Router::new()
        .route("/api/convert", post(convert))
        .fallback_service(static_files)
        .layer(DefaultBodyLimit::max(limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(addr: &str, state: AppState) -> Result<(), std::io::Error> {
    tracing::info!(
        %addr,
        public_dir = %state.public_dir.display(),
        max_upload_bytes = state.max_upload_bytes,
        "starting server"
    );
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_limit_is_in_megabytes() {
        let state = AppState::new("public", 25);
        assert_eq!(state.max_upload_bytes, 25 * 1024 * 1024);
        assert_eq!(state.public_dir, PathBuf::from("public"));
    }

    #[test]
    fn upload_limit_saturates() {
        let state = AppState::new("public", usize::MAX);
        assert_eq!(state.max_upload_bytes, usize::MAX);
    }
}
