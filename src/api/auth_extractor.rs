use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};

use crate::{
    AppState,
    api::{
        api_error::ApiError,
        cookies::{ACCESS_COOKIE, read_cookie},
    },
    models::user::Session,
    services::token::TokenError,
};

pub struct AuthUser(pub Session);

/// Access token from the `accessToken` cookie, else a bearer header.
pub fn access_token(headers: &HeaderMap) -> Option<&str> {
    read_cookie(headers, ACCESS_COOKIE).or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = access_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("Unauthorized request".into()))?;

        let claims = state.tokens.validate_access_token(token).map_err(|e| {
            if matches!(e, TokenError::Invalid) {
                tracing::warn!(path = %parts.uri.path(), "rejected invalid access token");
            }
            ApiError::from(e)
        })?;

        Ok(AuthUser(Session::from(claims)))
    }
}
