use chrono::Utc;
use sqlx::{Pool, Result, Sqlite};

use crate::models::reviews::{NewReview, Review, ReviewWithAuthor};

pub async fn insert_review(db: &Pool<Sqlite>, user_id: i64, review: &NewReview) -> Result<Review> {
    sqlx::query_as::<_, Review>(
        r#"
        INSERT INTO reviews (book_id, user_id, rating, description, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING id, book_id, user_id, rating, description, created_at
        "#,
    )
    .bind(review.book_id)
    .bind(user_id)
    .bind(review.rating)
    .bind(&review.description)
    .bind(Utc::now())
    .fetch_one(db)
    .await
}

/// `(AVG(rating), COUNT(*))`. The average is NULL when nothing matched.
pub async fn rating_summary(db: &Pool<Sqlite>, book_id: i64) -> Result<(Option<f64>, i64)> {
    sqlx::query_as::<_, (Option<f64>, i64)>(
        r#"
        SELECT AVG(rating), COUNT(*)
        FROM reviews
        WHERE book_id = ?1
        "#,
    )
    .bind(book_id)
    .fetch_one(db)
    .await
}

pub async fn count_reviews(db: &Pool<Sqlite>, book_id: i64) -> Result<i64> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reviews WHERE book_id = ?1")
        .bind(book_id)
        .fetch_one(db)
        .await
}

/// Reviews in creation order, `LIMIT -1` meaning all of them.
pub async fn reviews_for_book(
    db: &Pool<Sqlite>,
    book_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<ReviewWithAuthor>> {
    sqlx::query_as::<_, ReviewWithAuthor>(
        r#"
        SELECT
            r.id,
            r.book_id,
            r.user_id,
            u.full_name AS reviewer_name,
            r.rating,
            r.description,
            r.created_at
        FROM reviews r
        JOIN users u ON u.id = r.user_id
        WHERE r.book_id = ?1
        ORDER BY r.created_at, r.id
        LIMIT ?2 OFFSET ?3
        "#,
    )
    .bind(book_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
}

/// Book ids ranked by average rating, ties broken by the lower id.
pub async fn top_rated_book_ids(db: &Pool<Sqlite>, limit: i64) -> Result<Vec<(i64, f64)>> {
    sqlx::query_as::<_, (i64, f64)>(
        r#"
        SELECT book_id, AVG(rating) AS average
        FROM reviews
        GROUP BY book_id
        ORDER BY average DESC, book_id ASC
        LIMIT ?1
        "#,
    )
    .bind(limit)
    .fetch_all(db)
    .await
}
