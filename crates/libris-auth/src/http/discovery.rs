//! Metadata endpoint handler.

use axum::{
    Json,
    extract::State,
    http::header,
    response::IntoResponse,
};

use crate::http::state::AuthState;

/// Handler for `GET /.well-known/oauth-authorization-server`.
///
/// The document never changes while the process runs, so it is cacheable.
pub async fn metadata_handler(State(state): State<AuthState>) -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, "public, max-age=3600")],
        Json(state.metadata.as_ref().clone()),
    )
}
