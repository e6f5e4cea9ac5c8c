use crate::{error::AppError, AppState};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use service::Caller;
use session::resolve_profile;
use std::sync::Arc;

/// The caller behind a request's `Authorization: Bearer <token>` header.
///
/// The token is checked with the auth provider; the profile is fetched, or created on
/// the user's first request.
pub struct Authenticated(pub Caller);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let user = state.auth.user_for_token(token).await.map_err(|e| {
            if e.is_unavailable() {
                AppError::Session(e.into())
            } else {
                AppError::Unauthorized("Invalid or expired session".into())
            }
        })?;
        let profile = resolve_profile(state.backend.as_ref(), &user).await?;
        Ok(Authenticated(Caller::new(profile)))
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;
    let value = header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Malformed Authorization header".into()))?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Expected a bearer token".into()))
}
