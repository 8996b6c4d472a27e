//! Introspection endpoint handler (RFC 7662).
//!
//! Callers authenticate as confidential clients with HTTP Basic or
//! `client_secret_post`.

use axum::{
    Form, Json,
    extract::{State, rejection::FormRejection},
    http::HeaderMap,
};

use crate::error::AuthError;
use crate::http::credentials::extract_credentials;
use crate::http::state::AuthState;
use crate::token::introspection::{IntrospectionRequest, IntrospectionResponse};

/// Handler for `POST /introspect`.
pub async fn introspect_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
    form: Result<Form<IntrospectionRequest>, FormRejection>,
) -> Result<Json<IntrospectionResponse>, AuthError> {
    let Form(request) = form.map_err(|e| AuthError::invalid_request(e.body_text()))?;

    let credentials = extract_credentials(
        &headers,
        request.client_id.as_deref(),
        request.client_secret.as_deref(),
    )?;
    let client = state.clients.authenticate_client(&credentials).await?;

    let response = state.introspection.introspect(&request, &client).await?;
    Ok(Json(response))
}
