//! Catalog filtering and pagination.
//!
//! Everything here is pure: the same movies, filters, page size and page
//! always give the same page, and filtering only ever drops movies while
//! keeping the input order.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::models::movie::Movie;
use crate::models::{add_error, collect};

static MINUTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*min").expect("minutes pattern compiles"));
static HOURS_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*h").expect("hours pattern compiles"));
// "m" not followed by "in"; the regex crate has no lookahead, so the next
// character is captured and checked by hand.
static MINUTES_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*m(.?.?)").expect("minute part pattern compiles"));
static LEADING_INT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([+-]?\d+)").expect("integer pattern compiles"));

/// Parse free-text durations into minutes.
///
/// `"120 min"` wins over everything else, then any mix of `"1h"` and `"30m"`,
/// then a leading integer. Anything else is unknown.
pub fn parse_duration_minutes(duration: &str) -> Option<i64> {
    if duration.is_empty() {
        return None;
    }
    if let Some(caps) = MINUTES.captures(duration) {
        return caps[1].parse().ok();
    }

    let hours = HOURS_PART
        .captures(duration)
        .and_then(|c| c[1].parse::<i64>().ok());
    let minutes = MINUTES_PART
        .captures_iter(duration)
        .find(|c| &c[2] != "in")
        .and_then(|c| c[1].parse::<i64>().ok());
    if hours.is_some() || minutes.is_some() {
        return Some(hours.unwrap_or(0) * 60 + minutes.unwrap_or(0));
    }

    LEADING_INT
        .captures(duration)
        .and_then(|c| c[1].parse().ok())
}

/// Optional bounds; every bound that is set must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    pub release_start: Option<NaiveDate>,
    pub release_end: Option<NaiveDate>,
    #[validate(range(min = 0, message = "Minimum duration cannot be negative"))]
    pub duration_min: Option<i64>,
    #[validate(range(min = 0, message = "Maximum duration cannot be negative"))]
    pub duration_max: Option<i64>,
    #[validate(range(min = 0.0, max = 10.0, message = "Rating must be between 0 and 10"))]
    pub imdb_rating_min: Option<f64>,
    #[validate(range(min = 0.0, max = 10.0, message = "Rating must be between 0 and 10"))]
    pub imdb_rating_max: Option<f64>,
    #[validate(range(min = 0, message = "Minimum votes cannot be negative"))]
    pub imdb_votes_min: Option<i64>,
    #[validate(range(min = 0, message = "Maximum votes cannot be negative"))]
    pub imdb_votes_max: Option<i64>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = collect(self.validate());
        if let (Some(start), Some(end)) = (self.release_start, self.release_end) {
            if start > end {
                add_error(
                    &mut errors,
                    "release_end",
                    "range",
                    "Start date cannot be after end date",
                );
            }
        }
        if let (Some(min), Some(max)) = (self.duration_min, self.duration_max) {
            if min > max {
                add_error(
                    &mut errors,
                    "duration_max",
                    "range",
                    "Minimum duration cannot exceed maximum duration",
                );
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// A bound is only checked when the movie has the data it needs.
    pub fn matches(&self, movie: &Movie) -> bool {
        if let Some(date) = movie.release_date {
            if self.release_start.is_some_and(|start| date < start) {
                return false;
            }
            if self.release_end.is_some_and(|end| date > end) {
                return false;
            }
        }

        if let Some(mins) = parse_duration_minutes(&movie.duration) {
            if self.duration_min.is_some_and(|min| mins < min) {
                return false;
            }
            if self.duration_max.is_some_and(|max| mins > max) {
                return false;
            }
        }

        if let Some(rating) = numeric(&movie.imdb_rating) {
            if self.imdb_rating_min.is_some_and(|min| rating < min) {
                return false;
            }
            if self.imdb_rating_max.is_some_and(|max| rating > max) {
                return false;
            }
        }

        if let Some(votes) = numeric(&movie.imdb_votes) {
            if self.imdb_votes_min.is_some_and(|min| votes < min as f64) {
                return false;
            }
            if self.imdb_votes_max.is_some_and(|max| votes > max as f64) {
                return false;
            }
        }

        true
    }
}

/// String-encoded numbers; blank or unparseable text counts as missing.
fn numeric(value: &Option<String>) -> Option<f64> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Order-preserving subset of `movies` that satisfies `filters`.
pub fn filter_movies<'a>(movies: &'a [Movie], filters: Option<&SearchFilters>) -> Vec<&'a Movie> {
    match filters {
        None => movies.iter().collect(),
        Some(f) => movies.iter().filter(|m| f.matches(m)).collect(),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum PageSize {
    Ten,
    #[default]
    Fourteen,
    Sixteen,
    Eighteen,
    Twenty,
}

impl PageSize {
    pub const ALL: [PageSize; 5] = [
        PageSize::Ten,
        PageSize::Fourteen,
        PageSize::Sixteen,
        PageSize::Eighteen,
        PageSize::Twenty,
    ];

    pub fn get(self) -> usize {
        match self {
            PageSize::Ten => 10,
            PageSize::Fourteen => 14,
            PageSize::Sixteen => 16,
            PageSize::Eighteen => 18,
            PageSize::Twenty => 20,
        }
    }
}

impl TryFrom<u32> for PageSize {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        PageSize::ALL
            .into_iter()
            .find(|s| s.get() == value as usize)
            .ok_or_else(|| format!("page size must be one of 10, 14, 16, 18, 20 (got {})", value))
    }
}

impl From<PageSize> for u32 {
    fn from(size: PageSize) -> Self {
        size.get() as u32
    }
}

pub fn total_pages(count: usize, size: PageSize) -> usize {
    count.div_ceil(size.get()).max(1)
}

/// Items of the 1-based `page`. Pages past the end are empty; callers clamp
/// page numbers below 1 before calling.
pub fn page_slice<T>(items: &[T], size: PageSize, page: usize) -> &[T] {
    let start = page.saturating_sub(1).saturating_mul(size.get());
    if start >= items.len() {
        return &[];
    }
    let end = (start + size.get()).min(items.len());
    &items[start..end]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

pub fn paginate<T: Clone>(items: &[T], size: PageSize, page: usize) -> Page<T> {
    Page {
        items: page_slice(items, size, page).to_vec(),
        page,
        page_size: size.get(),
        total_items: items.len(),
        total_pages: total_pages(items.len(), size),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::movie::MovieStatus;
    use chrono::Utc;
    use uuid::Uuid;

    pub(crate) fn movie(title: &str) -> Movie {
        Movie {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: String::new(),
            synopsis: format!("{} synopsis", title),
            image_url: String::new(),
            duration: String::new(),
            language: "English".into(),
            status: MovieStatus::Released,
            genres: vec![],
            budget: None,
            revenue: None,
            profit: None,
            release_date: None,
            watched_percentage: None,
            trailer_url: None,
            imdb_id: None,
            imdb_rating: None,
            imdb_votes: None,
            remind_user_on_launch: false,
            user_id: Uuid::nil(),
            created_at: Utc::now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_duration_parsing() {
        assert_eq!(parse_duration_minutes("120 min"), Some(120));
        assert_eq!(parse_duration_minutes("148min"), Some(148));
        assert_eq!(parse_duration_minutes("1h 30m"), Some(90));
        assert_eq!(parse_duration_minutes("2h"), Some(120));
        assert_eq!(parse_duration_minutes("45m"), Some(45));
        assert_eq!(parse_duration_minutes("1h30m"), Some(90));
        assert_eq!(parse_duration_minutes("95"), Some(95));
        assert_eq!(parse_duration_minutes("95 minutes long"), Some(95));
        assert_eq!(parse_duration_minutes("abc"), None);
        assert_eq!(parse_duration_minutes(""), None);
    }

    #[test]
    fn test_min_takes_priority_over_hours() {
        assert_eq!(parse_duration_minutes("2h (130 min)"), Some(130));
    }

    #[test]
    fn test_filter_keeps_order_and_subset() {
        let mut movies: Vec<Movie> = (0..10).map(|i| movie(&format!("m{}", i))).collect();
        for (i, m) in movies.iter_mut().enumerate() {
            m.imdb_rating = Some(format!("{}.0", i));
        }
        let filters = SearchFilters {
            imdb_rating_min: Some(3.0),
            imdb_rating_max: Some(7.0),
            ..Default::default()
        };

        let titles: Vec<&str> = filter_movies(&movies, Some(&filters))
            .iter()
            .map(|m| m.title.as_str())
            .collect();
        assert_eq!(titles, vec!["m3", "m4", "m5", "m6", "m7"]);
    }

    #[test]
    fn test_missing_data_never_excludes() {
        let bare = movie("bare");
        let filters = SearchFilters {
            release_start: date(2020, 1, 1),
            release_end: date(2020, 12, 31),
            duration_min: Some(90),
            duration_max: Some(100),
            imdb_rating_min: Some(9.0),
            imdb_rating_max: Some(9.5),
            imdb_votes_min: Some(1_000_000),
            imdb_votes_max: Some(2_000_000),
        };
        assert!(filters.matches(&bare));

        let mut unparseable = movie("unparseable");
        unparseable.duration = "abc".into();
        unparseable.imdb_rating = Some("N/A".into());
        assert!(filters.matches(&unparseable));
    }

    #[test]
    fn test_release_bounds_are_inclusive() {
        let mut m = movie("dated");
        m.release_date = date(2021, 6, 15);

        let exact = SearchFilters {
            release_start: date(2021, 6, 15),
            release_end: date(2021, 6, 15),
            ..Default::default()
        };
        assert!(exact.matches(&m));

        let later = SearchFilters {
            release_start: date(2021, 6, 16),
            ..Default::default()
        };
        assert!(!later.matches(&m));
    }

    #[test]
    fn test_duration_and_votes_bounds() {
        let mut long = movie("long");
        long.duration = "2h 30m".into();
        long.imdb_votes = Some("1500".into());

        let short_only = SearchFilters {
            duration_max: Some(120),
            ..Default::default()
        };
        assert!(!short_only.matches(&long));

        let popular = SearchFilters {
            imdb_votes_min: Some(2000),
            ..Default::default()
        };
        assert!(!popular.matches(&long));

        let fits = SearchFilters {
            duration_min: Some(150),
            duration_max: Some(150),
            imdb_votes_max: Some(1500),
            ..Default::default()
        };
        assert!(fits.matches(&long));
    }

    #[test]
    fn test_no_filters_returns_everything() {
        let movies = vec![movie("a"), movie("b")];
        assert_eq!(filter_movies(&movies, None).len(), 2);
        assert_eq!(filter_movies(&movies, Some(&SearchFilters::default())).len(), 2);
    }

    #[test]
    fn test_filter_validation() {
        let bad = SearchFilters {
            release_start: date(2022, 1, 2),
            release_end: date(2022, 1, 1),
            duration_min: Some(100),
            duration_max: Some(90),
            imdb_rating_max: Some(11.0),
            imdb_votes_min: Some(-1),
            ..Default::default()
        };
        let errors = bad.check().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("release_end"));
        assert!(fields.contains_key("duration_max"));
        assert!(fields.contains_key("imdb_rating_max"));
        assert!(fields.contains_key("imdb_votes_min"));

        assert!(SearchFilters::default().check().is_ok());
    }

    #[test]
    fn test_pagination_thirty_by_fourteen() {
        let items: Vec<u32> = (0..30).collect();
        let size = PageSize::Fourteen;
        assert_eq!(total_pages(items.len(), size), 3);
        assert_eq!(page_slice(&items, size, 1).len(), 14);
        assert_eq!(page_slice(&items, size, 3), &[28, 29]);
        assert!(page_slice(&items, size, 4).is_empty());
    }

    #[test]
    fn test_empty_set_has_one_page() {
        let items: Vec<u32> = vec![];
        assert_eq!(total_pages(0, PageSize::Ten), 1);
        let page = paginate(&items, PageSize::Ten, 1);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_paginate_is_idempotent() {
        let movies: Vec<Movie> = (0..25).map(|i| movie(&format!("m{}", i))).collect();
        let filtered: Vec<Movie> = filter_movies(&movies, None).into_iter().cloned().collect();
        let first = paginate(&filtered, PageSize::Ten, 2);
        let second = paginate(&filtered, PageSize::Ten, 2);
        assert_eq!(first, second);
        assert_eq!(first.items[0].title, "m10");
    }

    #[test]
    fn test_page_size_accepts_only_known_values() {
        assert_eq!(PageSize::try_from(18).unwrap(), PageSize::Eighteen);
        assert!(PageSize::try_from(15).is_err());
        let parsed: PageSize = serde_json::from_str("20").unwrap();
        assert_eq!(parsed, PageSize::Twenty);
        assert!(serde_json::from_str::<PageSize>("12").is_err());
        assert_eq!(PageSize::default().get(), 14);
    }
}
