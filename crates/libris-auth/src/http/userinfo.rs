//! UserInfo endpoint handler.
//!
//! Accepts `GET` and `POST` with `Authorization: Bearer <access_token>`.
//!
//! # Errors
//!
//! - 401 with `WWW-Authenticate: Bearer error="invalid_token"` if the token
//!   is missing, malformed, expired or revoked
//! - 403 with `error="insufficient_scope"` if `openid` was not granted or
//!   the token has no resource owner

use axum::{Json, extract::State};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};

use crate::error::AuthError;
use crate::http::state::AuthState;
use crate::types::UserInfo;

/// Handler for `GET /userinfo` and `POST /userinfo`.
///
/// # Example Response
///
/// ```json
/// {
///   "sub": "reader-42",
///   "email": "ada@example.org",
///   "email_verified": true
/// }
/// ```
pub async fn userinfo_handler(
    State(state): State<AuthState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
) -> Result<Json<UserInfo>, AuthError> {
    let TypedHeader(Authorization(bearer)) =
        bearer.map_err(|_| AuthError::invalid_token("Missing or malformed bearer token"))?;

    let claims = state.userinfo.userinfo(bearer.token()).await?;
    Ok(Json(claims))
}
