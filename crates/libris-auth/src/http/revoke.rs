//! Revocation endpoint handler (RFC 7009).
//!
//! ```text
//! POST /revoke
//! Content-Type: application/x-www-form-urlencoded
//! Authorization: Basic <client_credentials>
//!
//! token=<token_to_revoke>&token_type_hint=refresh_token
//! ```
//!
//! Answers 200 with an empty body for every well-formed request from an
//! authenticated client, whether or not the token existed.

use axum::{
    Form,
    extract::{State, rejection::FormRejection},
    http::{HeaderMap, StatusCode},
};

use crate::error::AuthError;
use crate::http::credentials::extract_credentials;
use crate::http::state::AuthState;
use crate::token::revocation::RevocationRequest;

/// Handler for `POST /revoke`.
pub async fn revoke_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
    form: Result<Form<RevocationRequest>, FormRejection>,
) -> Result<StatusCode, AuthError> {
    let Form(request) = form.map_err(|e| AuthError::invalid_request(e.body_text()))?;

    let credentials = extract_credentials(
        &headers,
        request.client_id.as_deref(),
        request.client_secret.as_deref(),
    )?;
    let client = state.clients.authenticate_client(&credentials).await?;

    state.revocation.revoke(&request, &client.client).await?;
    Ok(StatusCode::OK)
}
