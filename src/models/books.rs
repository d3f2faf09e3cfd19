use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::api::api_error::ApiError;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub summary: Option<String>,
    pub book_image_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub summary: Option<String>,
    pub book_image_url: String,
}

/// Optional attributes a book form may carry. Anything else is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionalBookField {
    Genre,
    PublishedDate,
    Summary,
}

impl OptionalBookField {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "genre" => Some(OptionalBookField::Genre),
            "publishedDate" => Some(OptionalBookField::PublishedDate),
            "summary" => Some(OptionalBookField::Summary),
            _ => None,
        }
    }
}

/// Book fields collected from a submitted form before validation.
#[derive(Debug, Default)]
pub struct BookDraft {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub summary: Option<String>,
}

impl BookDraft {
    /// Merges one form field into the draft. Returns `false` for fields
    /// outside the allow-list.
    pub fn apply(&mut self, name: &str, value: String) -> Result<bool, ApiError> {
        match name {
            "title" => self.title = Some(value),
            "author" => self.author = Some(value),
            _ => {
                let Some(field) = OptionalBookField::from_name(name) else {
                    return Ok(false);
                };
                let value = value.trim();
                if value.is_empty() {
                    return Ok(true);
                }
                match field {
                    OptionalBookField::Genre => self.genre = Some(value.to_owned()),
                    OptionalBookField::Summary => self.summary = Some(value.to_owned()),
                    OptionalBookField::PublishedDate => {
                        self.published_date = Some(parse_published_date(value)?)
                    }
                }
            }
        }
        Ok(true)
    }
}

fn parse_published_date(raw: &str) -> Result<NaiveDate, ApiError> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .map_err(|_| ApiError::BadRequest(format!("Invalid publishedDate: {raw}")))
}
