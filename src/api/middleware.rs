use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    AppState,
    api::{api_error::ApiError, auth_extractor::AuthUser},
    models::user::Session,
};

pub struct AdminUser(pub Session);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(session) = AuthUser::from_request_parts(parts, state).await?;

        if !session.is_admin() {
            tracing::info!(user_id = session.user_id, "non-admin denied admin route");
            return Err(ApiError::Forbidden("Admin access required".into()));
        }

        Ok(AdminUser(session))
    }
}
