use chrono::Utc;
use sqlx::{Pool, Result, Sqlite};

use crate::models::books::{Book, NewBook};

const BOOK_COLUMNS: &str =
    "id, title, author, genre, published_date, summary, book_image_url, created_at";

pub async fn insert_book(db: &Pool<Sqlite>, book: &NewBook) -> Result<Book> {
    sqlx::query_as::<_, Book>(&format!(
        r#"
        INSERT INTO books
            (title, author, genre, published_date, summary, book_image_url, created_at)
        VALUES
            (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        RETURNING {BOOK_COLUMNS}
        "#
    ))
    .bind(&book.title)
    .bind(&book.author)
    .bind(&book.genre)
    .bind(book.published_date)
    .bind(&book.summary)
    .bind(&book.book_image_url)
    .bind(Utc::now())
    .fetch_one(db)
    .await
}

pub async fn find_by_title_and_author(
    db: &Pool<Sqlite>,
    title: &str,
    author: &str,
) -> Result<Option<Book>> {
    sqlx::query_as::<_, Book>(&format!(
        r#"
        SELECT {BOOK_COLUMNS}
        FROM books
        WHERE title = ?1 AND author = ?2
        "#
    ))
    .bind(title)
    .bind(author)
    .fetch_optional(db)
    .await
}

pub async fn get_book_by_id(db: &Pool<Sqlite>, book_id: i64) -> Result<Option<Book>> {
    sqlx::query_as::<_, Book>(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?1"))
        .bind(book_id)
        .fetch_optional(db)
        .await
}

/// Newest first.
pub async fn list_all_books(db: &Pool<Sqlite>) -> Result<Vec<Book>> {
    sqlx::query_as::<_, Book>(&format!(
        r#"
        SELECT {BOOK_COLUMNS}
        FROM books
        ORDER BY created_at DESC, id DESC
        "#
    ))
    .fetch_all(db)
    .await
}

/// Fetches books keeping the order of `ids`. Unknown ids are skipped.
pub async fn get_books_in_order(db: &Pool<Sqlite>, ids: &[i64]) -> Result<Vec<Book>> {
    let mut books = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(book) = get_book_by_id(db, *id).await? {
            books.push(book);
        }
    }
    Ok(books)
}
