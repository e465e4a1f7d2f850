use chrono::NaiveDate;
use uuid::Uuid;

/// One pending or sent release-day notification for a (movie, user) pair.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ReleaseReminder {
    pub movie_id: Uuid,
    pub user_id: Uuid,
    pub movie_title: String,
    pub movie_release_date: NaiveDate,
    pub already_sent: bool,
}

/// A reminder picked up by the sweep, joined with what delivery needs.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct DueReminder {
    pub movie_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub release_date: NaiveDate,
    pub email: String,
}
