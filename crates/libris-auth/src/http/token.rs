//! Token endpoint handler.
//!
//! ```text
//! POST /token
//! Content-Type: application/x-www-form-urlencoded
//!
//! grant_type=authorization_code
//! &code=abc123
//! &redirect_uri=https://app.example/cb
//! &code_verifier=verifier123
//! &client_id=c1
//! ```

use axum::{
    Form, Json,
    extract::{State, rejection::FormRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::error::AuthError;
use crate::http::credentials::extract_credentials;
use crate::http::state::AuthState;
use crate::oauth::token::TokenRequest;

/// Handler for `POST /token`.
pub async fn token_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Result<Response, AuthError> {
    let Form(request) = form.map_err(|e| AuthError::invalid_request(e.body_text()))?;

    tracing::debug!(
        grant_type = ?request.grant_type,
        client_id = ?request.client_id,
        "Processing token request"
    );

    let credentials = extract_credentials(
        &headers,
        request.client_id.as_deref(),
        request.client_secret.as_deref(),
    )?;

    let response = state.dispatcher.dispatch(&request, &credentials).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CACHE_CONTROL, "no-store"),
            (header::PRAGMA, "no-cache"),
        ],
        Json(response),
    )
        .into_response())
}
