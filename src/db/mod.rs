//! Persistence seam.
//!
//! Every movie and reminder operation takes the owner id and filters on it, so
//! a record that belongs to someone else looks exactly like a missing one.

mod postgres;

pub use postgres::{connect, PgStore};

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::movie::{Movie, MovieDraft};
use crate::models::reminder::{DueReminder, ReleaseReminder};
use crate::models::user::{NewUser, RecoveryToken, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

#[async_trait]
pub trait Store: Send + Sync {
    // ── Users ────────────────────────────────────────────────────────────

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Match either the email or the username.
    async fn find_user_by_login(&self, email_or_username: &str)
        -> Result<Option<User>, StoreError>;

    /// Any user already holding `username` or `email`.
    async fn find_user_conflict(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, StoreError>;

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<(), StoreError>;

    // ── Password recovery ───────────────────────────────────────────────

    async fn create_recovery_token(
        &self,
        user_id: Uuid,
        token: &str,
    ) -> Result<RecoveryToken, StoreError>;

    async fn find_recovery_token(&self, token: &str) -> Result<Option<RecoveryToken>, StoreError>;

    async fn delete_recovery_token(&self, id: Uuid) -> Result<bool, StoreError>;

    // ── Movies ──────────────────────────────────────────────────────────

    async fn insert_movie(&self, owner: Uuid, draft: &MovieDraft) -> Result<Movie, StoreError>;

    /// Insert, or return the owner's existing movie with the same IMDb id untouched.
    async fn upsert_imported_movie(
        &self,
        owner: Uuid,
        draft: &MovieDraft,
    ) -> Result<Movie, StoreError>;

    async fn update_movie(
        &self,
        owner: Uuid,
        id: Uuid,
        draft: &MovieDraft,
    ) -> Result<Option<Movie>, StoreError>;

    async fn find_movie(&self, owner: Uuid, id: Uuid) -> Result<Option<Movie>, StoreError>;

    async fn delete_movie(&self, owner: Uuid, id: Uuid) -> Result<bool, StoreError>;

    /// Newest first.
    async fn list_movies(&self, owner: Uuid) -> Result<Vec<Movie>, StoreError>;

    /// Case-insensitive substring match over title, synopsis and description.
    async fn search_movies(&self, owner: Uuid, keyword: &str) -> Result<Vec<Movie>, StoreError>;

    // ── Release reminders ───────────────────────────────────────────────

    /// Create the reminder, or refresh its title/date snapshot. Never resets `already_sent`.
    async fn save_reminder(&self, reminder: &ReleaseReminder) -> Result<(), StoreError>;

    async fn find_reminder(
        &self,
        movie_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ReleaseReminder>, StoreError>;

    async fn delete_reminder(&self, movie_id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;

    /// Unsent reminders of opted-in movies releasing in `[from, until)`.
    async fn due_reminders(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<DueReminder>, StoreError>;

    /// Flip `already_sent` from false to true. Returns false if it was already set.
    async fn claim_reminder(&self, movie_id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;
}
