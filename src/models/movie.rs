use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use super::{add_error, collect};

static IMDB_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^tt\d{7,8}$").expect("IMDb id pattern compiles"));

/// `tt` followed by 7 or 8 digits.
pub fn is_imdb_id(value: &str) -> bool {
    IMDB_ID.is_match(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "movie_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MovieStatus {
    Released,
    Upcoming,
    InProduction,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub synopsis: String,
    pub image_url: String,
    /// Free text, e.g. "120 min" or "1h 30m"
    pub duration: String,
    pub language: String,
    pub status: MovieStatus,
    pub genres: Vec<String>,
    pub budget: Option<String>,
    pub revenue: Option<String>,
    pub profit: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub watched_percentage: Option<i32>,
    pub trailer_url: Option<String>,
    pub imdb_id: Option<String>,
    /// Decimal rating kept as text, e.g. "8.8"
    pub imdb_rating: Option<String>,
    /// Vote count kept as text without separators, e.g. "2301234"
    pub imdb_votes: Option<String>,
    pub remind_user_on_launch: bool,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Movie fields as submitted by the add/edit form.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MovieInput {
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Title must have between 1 and 255 characters"))]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[validate(length(
        min = 1,
        max = 3000,
        message = "Synopsis must have between 1 and 3000 characters"
    ))]
    pub synopsis: String,
    pub image_url: String,
    #[validate(length(min = 1, message = "Duration is required"))]
    pub duration: String,
    #[validate(length(min = 1, max = 50, message = "Language must have between 1 and 50 characters"))]
    pub language: String,
    pub status: MovieStatus,
    /// Comma-separated genre list
    #[validate(length(min = 1, message = "At least one genre is required"))]
    pub genres: String,
    #[serde(default)]
    pub budget: Option<String>,
    #[serde(default)]
    pub revenue: Option<String>,
    #[serde(default)]
    pub profit: Option<String>,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    #[validate(range(min = 0, max = 100, message = "Watched percentage must be between 0 and 100"))]
    pub watched_percentage: Option<i32>,
    #[serde(default)]
    pub trailer_url: Option<String>,
    #[serde(default)]
    #[validate(length(max = 10, message = "IMDb rating must have at most 10 characters"))]
    pub imdb_rating: Option<String>,
    #[serde(default)]
    pub imdb_votes: Option<String>,
    #[serde(default)]
    pub remind_user_on_launch: bool,
}

/// Normalized movie fields ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieDraft {
    pub title: String,
    pub description: String,
    pub synopsis: String,
    pub image_url: String,
    pub duration: String,
    pub language: String,
    pub status: MovieStatus,
    pub genres: Vec<String>,
    pub budget: Option<String>,
    pub revenue: Option<String>,
    pub profit: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub watched_percentage: Option<i32>,
    pub trailer_url: Option<String>,
    pub imdb_id: Option<String>,
    pub imdb_rating: Option<String>,
    pub imdb_votes: Option<String>,
    pub remind_user_on_launch: bool,
}

impl MovieInput {
    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = collect(self.validate());

        if let Some(id) = non_empty(&self.imdb_id) {
            if !is_imdb_id(id) {
                add_error(
                    &mut errors,
                    "imdb_id",
                    "format",
                    "IMDb id must look like ttNNNNNNN",
                );
            }
        }
        if let Some(url) = non_empty(&self.trailer_url) {
            if reqwest::Url::parse(url).is_err() {
                add_error(
                    &mut errors,
                    "trailer_url",
                    "url",
                    "Trailer URL must be valid",
                );
            }
        }
        if split_genres(&self.genres).is_empty() && !self.genres.is_empty() {
            add_error(
                &mut errors,
                "genres",
                "length",
                "At least one genre is required",
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn into_draft(self) -> MovieDraft {
        MovieDraft {
            genres: split_genres(&self.genres),
            description: self.description.unwrap_or_default(),
            budget: blank_to_none(self.budget),
            revenue: blank_to_none(self.revenue),
            profit: blank_to_none(self.profit),
            trailer_url: blank_to_none(self.trailer_url),
            imdb_id: blank_to_none(self.imdb_id),
            imdb_rating: blank_to_none(self.imdb_rating),
            imdb_votes: blank_to_none(self.imdb_votes),
            title: self.title,
            synopsis: self.synopsis,
            image_url: self.image_url,
            duration: self.duration,
            language: self.language,
            status: self.status,
            release_date: self.release_date,
            watched_percentage: self.watched_percentage,
            remind_user_on_launch: self.remind_user_on_launch,
        }
    }
}

pub fn split_genres(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
