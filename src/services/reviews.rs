//! Review aggregation: recording reviews, per-book averages, listings and
//! the top-rated ranking.

use sqlx::{Pool, Sqlite};

use crate::{
    api::api_error::ApiError,
    db::{books, reviews},
    models::{
        books::Book,
        reviews::{AverageRating, NewReview, Review, ReviewDto, ReviewPage, ReviewWithAuthor},
    },
};

pub const REVIEW_PAGE_SIZE: i64 = 5;
pub const FEATURED_LIMIT: i64 = 5;
pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

pub fn validate_review(payload: &ReviewDto) -> Result<NewReview, ApiError> {
    let (Some(rating), Some(book_id), Some(description)) = (
        payload.rating,
        payload.book_id,
        payload.description.as_deref().map(str::trim),
    ) else {
        return Err(ApiError::BadRequest("All fields are required".into()));
    };

    if description.is_empty() {
        return Err(ApiError::BadRequest("All fields are required".into()));
    }
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(ApiError::BadRequest(format!(
            "Rating must be between {MIN_RATING} and {MAX_RATING}"
        )));
    }

    Ok(NewReview {
        book_id,
        rating,
        description: description.to_owned(),
    })
}

pub async fn record_review(
    db: &Pool<Sqlite>,
    user_id: i64,
    payload: &ReviewDto,
) -> Result<Review, ApiError> {
    let new_review = validate_review(payload)?;

    if books::get_book_by_id(db, new_review.book_id).await?.is_none() {
        return Err(ApiError::NotFound("Book not found".into()));
    }

    let review = reviews::insert_review(db, user_id, &new_review).await?;
    tracing::info!(
        review_id = review.id,
        book_id = review.book_id,
        user_id,
        "review recorded"
    );

    Ok(review)
}

/// Mean rating and review count. A book without reviews is `{0, 0}`.
pub async fn average_rating(db: &Pool<Sqlite>, book_id: i64) -> Result<AverageRating, ApiError> {
    let (average, count) = reviews::rating_summary(db, book_id).await?;

    Ok(AverageRating {
        average_rating: average.unwrap_or(0.0),
        count,
    })
}

/// Every review of a book in creation order. No reviews is a 404.
pub async fn list_reviews(
    db: &Pool<Sqlite>,
    book_id: i64,
) -> Result<Vec<ReviewWithAuthor>, ApiError> {
    let reviews = reviews::reviews_for_book(db, book_id, -1, 0).await?;

    if reviews.is_empty() {
        return Err(ApiError::NotFound("No reviews found".into()));
    }

    Ok(reviews)
}

/// One 1-based page of `REVIEW_PAGE_SIZE` reviews.
pub async fn review_page(
    db: &Pool<Sqlite>,
    book_id: i64,
    page: i64,
) -> Result<ReviewPage, ApiError> {
    if page < 1 {
        return Err(ApiError::BadRequest("page must be 1 or greater".into()));
    }

    let total = reviews::count_reviews(db, book_id).await?;
    if total == 0 {
        return Err(ApiError::NotFound("No reviews found".into()));
    }

    let offset = (page - 1).saturating_mul(REVIEW_PAGE_SIZE);
    let reviews = reviews::reviews_for_book(db, book_id, REVIEW_PAGE_SIZE, offset).await?;

    Ok(ReviewPage {
        page,
        per_page: REVIEW_PAGE_SIZE,
        total,
        total_pages: total_pages(total, REVIEW_PAGE_SIZE),
        reviews,
    })
}

pub fn total_pages(total: i64, per_page: i64) -> i64 {
    (total + per_page - 1) / per_page
}

/// Books ranked by average rating, highest first. Equal averages keep
/// the lower book id first.
pub async fn top_rated_books(db: &Pool<Sqlite>, limit: i64) -> Result<Vec<Book>, ApiError> {
    if limit <= 0 {
        return Ok(Vec::new());
    }

    let ranked = reviews::top_rated_book_ids(db, limit).await?;
    let ids: Vec<i64> = ranked.iter().map(|(id, _)| *id).collect();

    Ok(books::get_books_in_order(db, &ids).await?)
}
