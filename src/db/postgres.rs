use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::models::movie::{Movie, MovieDraft};
use crate::models::reminder::{DueReminder, ReleaseReminder};
use crate::models::user::{NewUser, RecoveryToken, User};

const USER_COLUMNS: &str = "id, name, email, username, password_hash, created_at";

const MOVIE_COLUMNS: &str = "id, title, description, synopsis, image_url, duration, language, \
     status, genres, budget, revenue, profit, release_date, watched_percentage, trailer_url, \
     imdb_id, imdb_rating, imdb_votes, remind_user_on_launch, user_id, created_at";

/// Open the pool and apply pending migrations.
pub async fn connect(database_url: &str) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    sqlx::migrate!("./src/db/migrations").run(&pool).await?;
    Ok(pool)
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn unique_to_conflict(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict,
        _ => StoreError::Database(e),
    }
}

/// Escape LIKE wildcards so the keyword matches literally.
fn like_pattern(keyword: &str) -> String {
    let escaped = keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, username, password_hash)
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(unique_to_conflict)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_login(
        &self,
        email_or_username: &str,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 OR username = $1 LIMIT 1"
        ))
        .bind(email_or_username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_conflict(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $2 LIMIT 1"
        ))
        .bind(username)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_recovery_token(
        &self,
        user_id: Uuid,
        token: &str,
    ) -> Result<RecoveryToken, StoreError> {
        sqlx::query_as::<_, RecoveryToken>(
            "INSERT INTO password_recovery_tokens (user_id, token)
             VALUES ($1, $2) RETURNING id, user_id, token, created_at",
        )
        .bind(user_id)
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map_err(unique_to_conflict)
    }

    async fn find_recovery_token(&self, token: &str) -> Result<Option<RecoveryToken>, StoreError> {
        let row = sqlx::query_as::<_, RecoveryToken>(
            "SELECT id, user_id, token, created_at FROM password_recovery_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_recovery_token(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM password_recovery_tokens WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_movie(&self, owner: Uuid, draft: &MovieDraft) -> Result<Movie, StoreError> {
        sqlx::query_as::<_, Movie>(&format!(
            "INSERT INTO movies (title, description, synopsis, image_url, duration, language,
                 status, genres, budget, revenue, profit, release_date, watched_percentage,
                 trailer_url, imdb_id, imdb_rating, imdb_votes, remind_user_on_launch, user_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                 $17, $18, $19)
             RETURNING {MOVIE_COLUMNS}"
        ))
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.synopsis)
        .bind(&draft.image_url)
        .bind(&draft.duration)
        .bind(&draft.language)
        .bind(draft.status)
        .bind(&draft.genres)
        .bind(&draft.budget)
        .bind(&draft.revenue)
        .bind(&draft.profit)
        .bind(draft.release_date)
        .bind(draft.watched_percentage)
        .bind(&draft.trailer_url)
        .bind(&draft.imdb_id)
        .bind(&draft.imdb_rating)
        .bind(&draft.imdb_votes)
        .bind(draft.remind_user_on_launch)
        .bind(owner)
        .fetch_one(&self.pool)
        .await
        .map_err(unique_to_conflict)
    }

    async fn upsert_imported_movie(
        &self,
        owner: Uuid,
        draft: &MovieDraft,
    ) -> Result<Movie, StoreError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let movie = sqlx::query_as::<_, Movie>(&format!(
            "INSERT INTO movies (title, description, synopsis, image_url, duration, language,
                 status, genres, budget, revenue, profit, release_date, watched_percentage,
                 trailer_url, imdb_id, imdb_rating, imdb_votes, remind_user_on_launch, user_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                 $17, $18, $19)
             ON CONFLICT (user_id, imdb_id) DO UPDATE SET imdb_id = EXCLUDED.imdb_id
             RETURNING {MOVIE_COLUMNS}"
        ))
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.synopsis)
        .bind(&draft.image_url)
        .bind(&draft.duration)
        .bind(&draft.language)
        .bind(draft.status)
        .bind(&draft.genres)
        .bind(&draft.budget)
        .bind(&draft.revenue)
        .bind(&draft.profit)
        .bind(draft.release_date)
        .bind(draft.watched_percentage)
        .bind(&draft.trailer_url)
        .bind(&draft.imdb_id)
        .bind(&draft.imdb_rating)
        .bind(&draft.imdb_votes)
        .bind(draft.remind_user_on_launch)
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;
        Ok(movie)
    }

    async fn update_movie(
        &self,
        owner: Uuid,
        id: Uuid,
        draft: &MovieDraft,
    ) -> Result<Option<Movie>, StoreError> {
        sqlx::query_as::<_, Movie>(&format!(
            "UPDATE movies SET title = $3, description = $4, synopsis = $5, image_url = $6,
                 duration = $7, language = $8, status = $9, genres = $10, budget = $11,
                 revenue = $12, profit = $13, release_date = $14, watched_percentage = $15,
                 trailer_url = $16, imdb_id = $17, imdb_rating = $18, imdb_votes = $19,
                 remind_user_on_launch = $20
             WHERE id = $1 AND user_id = $2
             RETURNING {MOVIE_COLUMNS}"
        ))
        .bind(id)
        .bind(owner)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.synopsis)
        .bind(&draft.image_url)
        .bind(&draft.duration)
        .bind(&draft.language)
        .bind(draft.status)
        .bind(&draft.genres)
        .bind(&draft.budget)
        .bind(&draft.revenue)
        .bind(&draft.profit)
        .bind(draft.release_date)
        .bind(draft.watched_percentage)
        .bind(&draft.trailer_url)
        .bind(&draft.imdb_id)
        .bind(&draft.imdb_rating)
        .bind(&draft.imdb_votes)
        .bind(draft.remind_user_on_launch)
        .fetch_optional(&self.pool)
        .await
        .map_err(unique_to_conflict)
    }

    async fn find_movie(&self, owner: Uuid, id: Uuid) -> Result<Option<Movie>, StoreError> {
        let movie = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;
        Ok(movie)
    }

    async fn delete_movie(&self, owner: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM movies WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_movies(&self, owner: Uuid) -> Result<Vec<Movie>, StoreError> {
        let movies = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(movies)
    }

    async fn search_movies(&self, owner: Uuid, keyword: &str) -> Result<Vec<Movie>, StoreError> {
        let movies = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies
             WHERE user_id = $1
               AND (title ILIKE $2 OR synopsis ILIKE $2 OR description ILIKE $2)
             ORDER BY created_at DESC"
        ))
        .bind(owner)
        .bind(like_pattern(keyword))
        .fetch_all(&self.pool)
        .await?;
        Ok(movies)
    }

    async fn save_reminder(&self, reminder: &ReleaseReminder) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO release_reminders (movie_id, user_id, movie_title, movie_release_date)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (movie_id, user_id)
             DO UPDATE SET movie_title = $3, movie_release_date = $4",
        )
        .bind(reminder.movie_id)
        .bind(reminder.user_id)
        .bind(&reminder.movie_title)
        .bind(reminder.movie_release_date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_reminder(
        &self,
        movie_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ReleaseReminder>, StoreError> {
        let reminder = sqlx::query_as::<_, ReleaseReminder>(
            "SELECT movie_id, user_id, movie_title, movie_release_date, already_sent
             FROM release_reminders WHERE movie_id = $1 AND user_id = $2",
        )
        .bind(movie_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(reminder)
    }

    async fn delete_reminder(&self, movie_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let result =
            sqlx::query("DELETE FROM release_reminders WHERE movie_id = $1 AND user_id = $2")
                .bind(movie_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn due_reminders(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<DueReminder>, StoreError> {
        let rows = sqlx::query_as::<_, DueReminder>(
            "SELECT r.movie_id, r.user_id, m.title, m.release_date, u.email
             FROM release_reminders r
             JOIN movies m ON m.id = r.movie_id
             JOIN users u ON u.id = r.user_id
             WHERE m.release_date >= $1 AND m.release_date < $2
               AND m.remind_user_on_launch
               AND NOT r.already_sent
             ORDER BY m.release_date, m.title",
        )
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn claim_reminder(&self, movie_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE release_reminders SET already_sent = TRUE
             WHERE movie_id = $1 AND user_id = $2 AND NOT already_sent",
        )
        .bind(movie_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
