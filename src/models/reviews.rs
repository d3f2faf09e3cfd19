use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: i64,
    pub book_id: i64,
    pub user_id: i64,
    pub rating: i64,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// A review joined with the reviewer's display name.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewWithAuthor {
    pub id: i64,
    pub book_id: i64,
    pub user_id: i64,
    pub reviewer_name: String,
    pub rating: i64,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewReview {
    pub book_id: i64,
    pub rating: i64,
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReviewDto {
    pub rating: Option<i64>,
    #[serde(rename = "BookId")]
    pub book_id: Option<i64>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AverageDto {
    #[serde(rename = "BookId")]
    pub book_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewQuery {
    pub page: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AverageRating {
    pub average_rating: f64,
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPage {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
    pub reviews: Vec<ReviewWithAuthor>,
}
