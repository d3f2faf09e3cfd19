use std::path::PathBuf;

use sqlx::{Pool, Sqlite};

use crate::{
    api::api_error::{ApiError, conflict_on_unique},
    db::books,
    models::books::{Book, BookDraft, NewBook},
    services::covers::CoverStore,
};

const DUPLICATE_BOOK: &str = "Book already exists.";

/// Validates the draft, publishes the staged cover and stores the book.
/// The staged cover is discarded on every rejection path.
pub async fn add_book(
    db: &Pool<Sqlite>,
    covers: &CoverStore,
    draft: BookDraft,
    staged_cover: Option<PathBuf>,
) -> Result<Book, ApiError> {
    let result = checked_add(db, covers, draft, staged_cover.clone()).await;

    if result.is_err() {
        if let Some(path) = staged_cover.filter(|p| p.exists()) {
            covers.discard(&path).await;
        }
    }

    result
}

async fn checked_add(
    db: &Pool<Sqlite>,
    covers: &CoverStore,
    draft: BookDraft,
    staged_cover: Option<PathBuf>,
) -> Result<Book, ApiError> {
    let title = draft.title.as_deref().map(str::trim).unwrap_or_default();
    let author = draft.author.as_deref().map(str::trim).unwrap_or_default();

    if title.is_empty() || author.is_empty() {
        return Err(ApiError::BadRequest("Title and Author are required.".into()));
    }

    if books::find_by_title_and_author(db, title, author)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(DUPLICATE_BOOK.into()));
    }

    let staged_cover = staged_cover
        .ok_or_else(|| ApiError::BadRequest("Book cover image is required.".into()))?;
    let book_image_url = covers.upload(&staged_cover, title).await?;

    let new_book = NewBook {
        title: title.to_owned(),
        author: author.to_owned(),
        genre: draft.genre,
        published_date: draft.published_date,
        summary: draft.summary,
        book_image_url,
    };

    let book = match books::insert_book(db, &new_book).await {
        Ok(book) => book,
        Err(e) => {
            // Lost the UNIQUE race or the write failed; nothing points at the cover now.
            covers.unpublish(&new_book.book_image_url).await;
            return Err(conflict_on_unique(e, DUPLICATE_BOOK));
        }
    };
    tracing::info!(book_id = book.id, title = %book.title, "book added");

    Ok(book)
}

/// Whole catalog, newest first. An empty catalog is a 404.
pub async fn list_books(db: &Pool<Sqlite>) -> Result<Vec<Book>, ApiError> {
    let books = books::list_all_books(db).await?;

    if books.is_empty() {
        return Err(ApiError::NotFound("No books found.".into()));
    }

    Ok(books)
}

pub async fn get_book(db: &Pool<Sqlite>, book_id: i64) -> Result<Book, ApiError> {
    books::get_book_by_id(db, book_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Book not found.".into()))
}
