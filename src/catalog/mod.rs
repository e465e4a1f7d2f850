//! Owner-scoped movie operations and the release-reminder bookkeeping that
//! rides along with them.

pub mod search;
pub mod view;

use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::db::{Store, StoreError};
use crate::error::AppError;
use crate::filter::{Page, PageSize, SearchFilters};

use self::view::{CatalogAction, CatalogState};
use crate::models::movie::{Movie, MovieDraft, MovieInput};
use crate::models::reminder::ReleaseReminder;
use crate::models::add_error;

const MOVIE_NOT_FOUND: &str = "Movie not found";
const DUPLICATE_MOVIE: &str = "This movie is already in your catalog";

/// Query string of `GET /api/movies/catalog`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CatalogQuery {
    pub keyword: Option<String>,
    /// 1-based; clamped into `1..=totalPages`.
    pub page: Option<i64>,
    /// One of 10, 14, 16, 18, 20. Defaults to 14.
    pub page_size: Option<u32>,
    pub release_start: Option<NaiveDate>,
    pub release_end: Option<NaiveDate>,
    pub duration_min: Option<i64>,
    pub duration_max: Option<i64>,
    pub imdb_rating_min: Option<f64>,
    pub imdb_rating_max: Option<f64>,
    pub imdb_votes_min: Option<i64>,
    pub imdb_votes_max: Option<i64>,
}

impl CatalogQuery {
    pub fn filters(&self) -> SearchFilters {
        SearchFilters {
            release_start: self.release_start,
            release_end: self.release_end,
            duration_min: self.duration_min,
            duration_max: self.duration_max,
            imdb_rating_min: self.imdb_rating_min,
            imdb_rating_max: self.imdb_rating_max,
            imdb_votes_min: self.imdb_votes_min,
            imdb_votes_max: self.imdb_votes_max,
        }
    }

    fn page_size(&self) -> Option<PageSize> {
        match self.page_size {
            None => Some(PageSize::default()),
            Some(raw) => PageSize::try_from(raw).ok(),
        }
    }

    /// Filters and page size, with every problem reported at once.
    pub fn validated(&self) -> Result<(SearchFilters, PageSize), ValidationErrors> {
        let filters = self.filters();
        let mut errors = filters.check().err().unwrap_or_default();
        let size = self.page_size();
        if size.is_none() {
            add_error(
                &mut errors,
                "page_size",
                "page_size",
                "Page size must be one of 10, 14, 16, 18, 20",
            );
        }
        match size {
            Some(size) if errors.is_empty() => Ok((filters, size)),
            _ => Err(errors),
        }
    }
}

pub async fn list(store: &dyn Store, owner: Uuid) -> Result<Vec<Movie>, AppError> {
    Ok(store.list_movies(owner).await?)
}

/// An empty keyword returns the owner's whole list.
pub async fn search(store: &dyn Store, owner: Uuid, keyword: &str) -> Result<Vec<Movie>, AppError> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return list(store, owner).await;
    }
    Ok(store.search_movies(owner, keyword).await?)
}

pub async fn get(store: &dyn Store, owner: Uuid, id: Uuid) -> Result<Movie, AppError> {
    store
        .find_movie(owner, id)
        .await?
        .ok_or(AppError::NotFound(MOVIE_NOT_FOUND))
}

pub async fn create(
    store: &dyn Store,
    owner: Uuid,
    input: MovieInput,
    today: NaiveDate,
) -> Result<Movie, AppError> {
    input.check()?;
    let draft = input.into_draft();
    let movie = store
        .insert_movie(owner, &draft)
        .await
        .map_err(duplicate_movie)?;
    sync_reminder(store, &movie, today).await?;
    tracing::info!(movie_id = %movie.id, user_id = %owner, "Movie created");
    Ok(movie)
}

pub async fn update(
    store: &dyn Store,
    owner: Uuid,
    id: Uuid,
    input: MovieInput,
    today: NaiveDate,
) -> Result<Movie, AppError> {
    input.check()?;
    let draft = input.into_draft();
    let movie = store
        .update_movie(owner, id, &draft)
        .await
        .map_err(duplicate_movie)?
        .ok_or(AppError::NotFound(MOVIE_NOT_FOUND))?;
    sync_reminder(store, &movie, today).await?;
    tracing::info!(movie_id = %movie.id, user_id = %owner, "Movie updated");
    Ok(movie)
}

/// Stores an imported record, returning the owner's existing copy when the
/// IMDb id is already catalogued.
pub async fn save_imported(
    store: &dyn Store,
    owner: Uuid,
    draft: &MovieDraft,
    today: NaiveDate,
) -> Result<Movie, AppError> {
    let movie = store.upsert_imported_movie(owner, draft).await?;
    sync_reminder(store, &movie, today).await?;
    Ok(movie)
}

/// Removes the movie; its reminder goes with it.
pub async fn delete(store: &dyn Store, owner: Uuid, id: Uuid) -> Result<(), AppError> {
    if !store.delete_movie(owner, id).await? {
        return Err(AppError::NotFound(MOVIE_NOT_FOUND));
    }
    tracing::info!(movie_id = %id, user_id = %owner, "Movie deleted");
    Ok(())
}

/// Keyword search, filters and paging in one pass, through the same
/// [`CatalogState`] transitions a catalog screen goes through.
pub async fn catalog_page(
    store: &dyn Store,
    owner: Uuid,
    query: &CatalogQuery,
) -> Result<Page<Movie>, AppError> {
    let (filters, size) = query.validated()?;

    let base = search(store, owner, query.keyword.as_deref().unwrap_or("")).await?;
    let page = usize::try_from(query.page.unwrap_or(1).max(1)).unwrap_or(usize::MAX);
    let state = CatalogState::new(size)
        .reduce(CatalogAction::Loaded(base))
        .reduce(CatalogAction::FiltersApplied(filters))
        .reduce(CatalogAction::PageSelected(page));
    Ok(state.page())
}

/// Opting in creates or refreshes the reminder; opting out removes it.
async fn sync_reminder(store: &dyn Store, movie: &Movie, today: NaiveDate) -> Result<(), AppError> {
    if movie.remind_user_on_launch {
        let reminder = ReleaseReminder {
            movie_id: movie.id,
            user_id: movie.user_id,
            movie_title: movie.title.clone(),
            movie_release_date: movie.release_date.unwrap_or(today),
            already_sent: false,
        };
        store.save_reminder(&reminder).await?;
    } else if store.delete_reminder(movie.id, movie.user_id).await? {
        tracing::debug!(movie_id = %movie.id, "Release reminder removed");
    }
    Ok(())
}

fn duplicate_movie(err: StoreError) -> AppError {
    match err {
        StoreError::Conflict => AppError::Conflict(DUPLICATE_MOVIE),
        other => other.into(),
    }
}
