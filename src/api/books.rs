use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    AppState,
    api::{api_error::ApiError, extract::AppPath, middleware::AdminUser},
    models::books::BookDraft,
    services::{
        catalog,
        reviews::{FEATURED_LIMIT, top_rated_books},
    },
};

const COVER_FIELD: &str = "bookImage";

pub async fn add_book(
    State(state): State<AppState>,
    AdminUser(session): AdminUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut draft = BookDraft::default();
    let mut staged_cover = None;

    let parsed = async {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_owned();

            if name == COVER_FIELD {
                if staged_cover.is_some() {
                    return Err(ApiError::BadRequest(
                        "Only one book cover image is allowed.".into(),
                    ));
                }
                let file_name = field.file_name().map(str::to_owned);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                staged_cover = Some(state.covers.stage(file_name.as_deref(), &bytes).await?);
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            if !draft.apply(&name, value)? {
                tracing::debug!(field = %name, "ignoring unknown book field");
            }
        }
        Ok::<(), ApiError>(())
    }
    .await;

    if let Err(e) = parsed {
        if let Some(path) = &staged_cover {
            state.covers.discard(path).await;
        }
        return Err(e);
    }

    let book = catalog::add_book(&state.db_pool, &state.covers, draft, staged_cover).await?;
    tracing::info!(admin_id = session.user_id, book_id = book.id, "admin added book");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Book added successfully.",
            "data": book,
        })),
    ))
}

pub async fn list_books(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let books = catalog::list_books(&state.db_pool).await?;
    Ok(Json(books))
}

pub async fn get_book(
    State(state): State<AppState>,
    AppPath(book_id): AppPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let book = catalog::get_book(&state.db_pool, book_id).await?;
    Ok(Json(book))
}

pub async fn featured_books(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let books = top_rated_books(&state.db_pool, FEATURED_LIMIT).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Featured books fetched successfully.",
        "count": books.len(),
        "data": books,
    })))
}
