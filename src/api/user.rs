use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderName, StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse},
};
use serde_json::json;

use crate::{
    AppState,
    api::{
        api_error::ApiError,
        auth_extractor::{AuthUser, access_token},
        cookies::{ACCESS_COOKIE, REFRESH_COOKIE, clear_cookie, read_cookie, session_cookie},
        extract::AppJson,
    },
    db::user::get_user_by_id,
    models::user::{
        ChangePasswordDto, LoginDto, RefreshDto, RegisterDto, UpdateAccountDto, UserProfile,
    },
    services::{
        accounts,
        token::{RefreshOutcome, TokenPair},
    },
};

fn token_cookies(state: &AppState, pair: &TokenPair) -> AppendHeaders<[(HeaderName, String); 2]> {
    let secure = state.config.cookie_secure;
    AppendHeaders([
        (
            SET_COOKIE,
            session_cookie(ACCESS_COOKIE, &pair.access_token, state.tokens.access_ttl(), secure),
        ),
        (
            SET_COOKIE,
            session_cookie(REFRESH_COOKIE, &pair.refresh_token, state.tokens.refresh_ttl(), secure),
        ),
    ])
}

pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterDto>,
) -> Result<impl IntoResponse, ApiError> {
    let user = accounts::register(&state.db_pool, &payload).await?;
    tracing::info!(user_id = user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Registered successfully",
            "data": UserProfile::from(&user),
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginDto>,
) -> Result<impl IntoResponse, ApiError> {
    let user = accounts::authenticate(&state.db_pool, &payload).await?;
    let pair = state.tokens.issue_token_pair(&state.db_pool, &user).await?;
    tracing::info!(user_id = user.id, "user logged in");

    Ok((
        StatusCode::OK,
        token_cookies(&state, &pair),
        Json(json!({
            "success": true,
            "message": "User logged in successfully",
            "data": {
                "user": UserProfile::from(&user),
                "accessToken": pair.access_token,
                "refreshToken": pair.refresh_token,
            },
        })),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    state.tokens.revoke(&state.db_pool, session.user_id).await?;
    tracing::info!(user_id = session.user_id, "user logged out");

    let secure = state.config.cookie_secure;
    Ok((
        StatusCode::OK,
        AppendHeaders([
            (SET_COOKIE, clear_cookie(ACCESS_COOKIE, secure)),
            (SET_COOKIE, clear_cookie(REFRESH_COOKIE, secure)),
        ]),
        Json(json!({ "success": true, "message": "User logged out" })),
    ))
}

pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    // Cookie first; the body is only read when the cookie is absent.
    let cookie_token = read_cookie(&headers, REFRESH_COOKIE);
    let body_token = match cookie_token {
        Some(_) => None,
        None if body.is_empty() => None,
        None => {
            serde_json::from_slice::<RefreshDto>(&body)
                .map_err(|_| ApiError::BadRequest("Malformed request body".into()))?
                .refresh_token
        }
    };
    let incoming = cookie_token.or(body_token.as_deref());

    let outcome = state
        .tokens
        .rotate_on_refresh(&state.db_pool, incoming, access_token(&headers))
        .await?;

    let response = match outcome {
        RefreshOutcome::StillValid => (
            StatusCode::OK,
            Json(json!({ "success": true, "message": "Access token is still valid" })),
        )
            .into_response(),
        RefreshOutcome::Renewed(access) => {
            let cookie = session_cookie(
                ACCESS_COOKIE,
                &access,
                state.tokens.access_ttl(),
                state.config.cookie_secure,
            );
            (
                StatusCode::OK,
                AppendHeaders([(SET_COOKIE, cookie)]),
                Json(json!({
                    "success": true,
                    "message": "Access token refreshed successfully",
                    "data": { "accessToken": access },
                })),
            )
                .into_response()
        }
    };

    Ok(response)
}

pub async fn current_user(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let user = get_user_by_id(&state.db_pool, session.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(json!({
        "success": true,
        "message": "Current user fetched successfully",
        "data": UserProfile::from(&user),
    })))
}

pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    AppJson(payload): AppJson<ChangePasswordDto>,
) -> Result<impl IntoResponse, ApiError> {
    accounts::change_password(&state.db_pool, session.user_id, &payload).await?;

    Ok(Json(json!({ "success": true, "message": "Password changed successfully" })))
}

pub async fn update_account(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    AppJson(payload): AppJson<UpdateAccountDto>,
) -> Result<impl IntoResponse, ApiError> {
    let user = accounts::update_account(&state.db_pool, session.user_id, &payload).await?;
    let pair = state.tokens.issue_token_pair(&state.db_pool, &user).await?;

    Ok((
        StatusCode::OK,
        token_cookies(&state, &pair),
        Json(json!({
            "success": true,
            "message": "Account details updated successfully",
            "data": {
                "user": UserProfile::from(&user),
                "accessToken": pair.access_token,
                "refreshToken": pair.refresh_token,
            },
        })),
    ))
}
