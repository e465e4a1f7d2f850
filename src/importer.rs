//! OMDb lookups normalized into the catalog's movie shape.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::movie::{is_imdb_id, split_genres, MovieDraft, MovieStatus};

/// Pause between consecutive calls of a batch import.
pub const BATCH_DELAY: Duration = Duration::from_millis(250);

const NOT_AVAILABLE: &str = "N/A";
const DATE_FORMATS: [&str; 2] = ["%d %b %Y", "%Y-%m-%d"];

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Movie import is not configured")]
    NotConfigured,
    #[error("{0} is not a valid IMDb id")]
    InvalidId(String),
    /// The provider answered but had nothing for the id; carries its message.
    #[error("{0}")]
    NotFound(String),
    #[error("Movie database unavailable: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for ImportError {
    fn from(e: reqwest::Error) -> Self {
        ImportError::Transport(e.to_string())
    }
}

/// Raw OMDb payload. Only the fields the catalog uses are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OmdbResponse {
    #[serde(rename = "Title", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "Released", default, skip_serializing_if = "Option::is_none")]
    pub released: Option<String>,
    #[serde(rename = "Runtime", default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(rename = "Genre", default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(rename = "Plot", default, skip_serializing_if = "Option::is_none")]
    pub plot: Option<String>,
    #[serde(rename = "Language", default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(rename = "Poster", default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(rename = "imdbRating", default, skip_serializing_if = "Option::is_none")]
    pub imdb_rating: Option<String>,
    #[serde(rename = "imdbVotes", default, skip_serializing_if = "Option::is_none")]
    pub imdb_votes: Option<String>,
    #[serde(rename = "imdbID", default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(rename = "BoxOffice", default, skip_serializing_if = "Option::is_none")]
    pub box_office: Option<String>,
    #[serde(rename = "Response", default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(rename = "Error", default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OmdbResponse {
    fn is_failure(&self) -> bool {
        self.response
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case("false"))
    }
}

/// Metadata ready to prefill or create a catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    pub title: Option<String>,
    pub synopsis: Option<String>,
    pub image_url: Option<String>,
    pub duration: Option<String>,
    pub language: Option<String>,
    pub status: Option<MovieStatus>,
    pub genres: Vec<String>,
    pub revenue: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub imdb_id: Option<String>,
    pub imdb_rating: Option<f64>,
    pub imdb_votes: Option<i64>,
}

impl NormalizedRecord {
    /// Draft for a new catalog entry. Imported movies never opt into reminders.
    pub fn into_draft(self) -> MovieDraft {
        let synopsis = self.synopsis.unwrap_or_default();
        MovieDraft {
            title: self.title.unwrap_or_else(|| "Untitled".to_string()),
            description: synopsis.clone(),
            synopsis,
            image_url: self.image_url.unwrap_or_default(),
            duration: self.duration.unwrap_or_default(),
            language: self.language.unwrap_or_default(),
            status: self.status.unwrap_or(MovieStatus::Upcoming),
            genres: self.genres,
            budget: None,
            revenue: self.revenue,
            profit: None,
            release_date: self.release_date,
            watched_percentage: Some(0),
            trailer_url: None,
            imdb_id: self.imdb_id,
            imdb_rating: self.imdb_rating.map(|r| r.to_string()),
            imdb_votes: self.imdb_votes.map(|v| v.to_string()),
            remind_user_on_launch: false,
        }
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != NOT_AVAILABLE)
}

fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Map a raw payload onto catalog names. `today` decides released vs upcoming.
pub fn normalize(raw: OmdbResponse, today: NaiveDate) -> NormalizedRecord {
    let release_date = present(raw.released).and_then(|d| parse_release_date(&d));
    let status = release_date.map(|date| {
        if date <= today {
            MovieStatus::Released
        } else {
            MovieStatus::Upcoming
        }
    });

    NormalizedRecord {
        title: present(raw.title),
        synopsis: present(raw.plot),
        image_url: present(raw.poster),
        duration: present(raw.runtime),
        language: present(raw.language),
        status,
        genres: present(raw.genre)
            .map(|g| split_genres(&g))
            .unwrap_or_default(),
        revenue: present(raw.box_office),
        release_date,
        imdb_id: present(raw.imdb_id),
        imdb_rating: present(raw.imdb_rating)
            .and_then(|r| r.parse::<f64>().ok())
            .filter(|r| r.is_finite()),
        imdb_votes: present(raw.imdb_votes).and_then(|v| v.replace(',', "").parse().ok()),
    }
}

/// Ids fetched by a batch import, and the ones that failed.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub records: BTreeMap<String, OmdbResponse>,
    pub failed: Vec<String>,
}

#[derive(Clone)]
pub struct OmdbClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl fmt::Debug for OmdbClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OmdbClient")
            .field("base_url", &self.base_url)
            .field("configured", &self.api_key.is_some())
            .finish()
    }
}

impl OmdbClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.to_string(),
            api_key,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// The raw payload for `imdb_id`, with provider refusals turned into errors.
    pub async fn fetch_raw(&self, imdb_id: &str, long_plot: bool) -> Result<OmdbResponse, ImportError> {
        if !is_imdb_id(imdb_id) {
            return Err(ImportError::InvalidId(imdb_id.to_string()));
        }
        let api_key = self.api_key.as_deref().ok_or(ImportError::NotConfigured)?;
        let plot = if long_plot { "full" } else { "short" };

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("i", imdb_id), ("apikey", api_key), ("plot", plot)])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ImportError::Transport(format!(
                "OMDb answered {} for {}",
                resp.status(),
                imdb_id
            )));
        }

        let raw: OmdbResponse = resp.json().await?;
        if raw.is_failure() {
            let message = raw
                .error
                .unwrap_or_else(|| "Movie not found!".to_string());
            return Err(ImportError::NotFound(message));
        }
        Ok(raw)
    }

    pub async fn fetch_by_external_id(
        &self,
        imdb_id: &str,
        long_plot: bool,
        today: NaiveDate,
    ) -> Result<NormalizedRecord, ImportError> {
        let raw = self.fetch_raw(imdb_id, long_plot).await?;
        Ok(normalize(raw, today))
    }

    /// Fetch ids one after another, pausing `delay` after each successful call.
    /// A failing id is logged and skipped.
    pub async fn import_batch(&self, ids: &[String], delay: Duration) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for id in ids {
            match self.fetch_raw(id, false).await {
                Ok(raw) => {
                    tracing::info!(
                        imdb_id = %id,
                        title = raw.title.as_deref().unwrap_or("?"),
                        "Fetched movie"
                    );
                    outcome.records.insert(id.clone(), raw);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::warn!(imdb_id = %id, error = %e, "Skipping movie");
                    outcome.failed.push(id.clone());
                }
            }
        }
        outcome
    }
}
