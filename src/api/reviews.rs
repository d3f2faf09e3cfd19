use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    AppState,
    api::{
        api_error::ApiError,
        auth_extractor::AuthUser,
        extract::{AppJson, AppPath, AppQuery},
    },
    models::reviews::{AverageDto, ReviewDto, ReviewQuery},
    services::reviews,
};

pub async fn submit_review(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    AppJson(payload): AppJson<ReviewDto>,
) -> Result<impl IntoResponse, ApiError> {
    let review = reviews::record_review(&state.db_pool, session.user_id, &payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Review submitted successfully",
            "data": review,
        })),
    ))
}

pub async fn average_rating(
    State(state): State<AppState>,
    AppJson(payload): AppJson<AverageDto>,
) -> Result<impl IntoResponse, ApiError> {
    let book_id = payload
        .book_id
        .ok_or_else(|| ApiError::BadRequest("BookId is required".into()))?;

    let summary = reviews::average_rating(&state.db_pool, book_id).await?;
    Ok(Json(summary))
}

/// Full listing, or one page of it when `?page=N` is given.
pub async fn get_reviews(
    State(state): State<AppState>,
    AppPath(book_id): AppPath<i64>,
    AppQuery(query): AppQuery<ReviewQuery>,
) -> Result<axum::response::Response, ApiError> {
    match query.page {
        Some(page) => {
            let page = reviews::review_page(&state.db_pool, book_id, page).await?;
            Ok(Json(page).into_response())
        }
        None => {
            let all = reviews::list_reviews(&state.db_pool, book_id).await?;
            Ok(Json(all).into_response())
        }
    }
}
