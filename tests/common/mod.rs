#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use chrono::{NaiveDate, Utc};
use http_body_util::BodyExt;
use reelshelf::config::Config;
use reelshelf::db::{Store, StoreError};
use reelshelf::mailer::{MailError, Mailer, Message};
use reelshelf::models::movie::{Movie, MovieDraft};
use reelshelf::models::reminder::{DueReminder, ReleaseReminder};
use reelshelf::models::user::{NewUser, RecoveryToken, User};
use reelshelf::{build_app, AppState};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const AUTH_SECRET: &str = "test-secret";
pub const CRON_TOKEN: &str = "cron-secret";

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    tokens: Vec<RecoveryToken>,
    movies: Vec<Movie>,
    reminders: Vec<ReleaseReminder>,
}

/// In-memory `Store` with switches to simulate outages.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    pub fail_due: AtomicBool,
    pub fail_claims: AtomicBool,
}

fn outage() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

fn movie_from(owner: Uuid, draft: &MovieDraft) -> Movie {
    Movie {
        id: Uuid::new_v4(),
        title: draft.title.clone(),
        description: draft.description.clone(),
        synopsis: draft.synopsis.clone(),
        image_url: draft.image_url.clone(),
        duration: draft.duration.clone(),
        language: draft.language.clone(),
        status: draft.status,
        genres: draft.genres.clone(),
        budget: draft.budget.clone(),
        revenue: draft.revenue.clone(),
        profit: draft.profit.clone(),
        release_date: draft.release_date,
        watched_percentage: draft.watched_percentage,
        trailer_url: draft.trailer_url.clone(),
        imdb_id: draft.imdb_id.clone(),
        imdb_rating: draft.imdb_rating.clone(),
        imdb_votes: draft.imdb_votes.clone(),
        remind_user_on_launch: draft.remind_user_on_launch,
        user_id: owner,
        created_at: Utc::now(),
    }
}

fn duplicate_imdb(tables: &Tables, owner: Uuid, draft: &MovieDraft, except: Option<Uuid>) -> bool {
    draft.imdb_id.as_ref().is_some_and(|imdb| {
        tables.movies.iter().any(|m| {
            m.user_id == owner && m.imdb_id.as_ref() == Some(imdb) && Some(m.id) != except
        })
    })
}

impl MemoryStore {
    pub fn reminder(&self, movie_id: Uuid, user_id: Uuid) -> Option<ReleaseReminder> {
        let tables = self.tables.lock().unwrap();
        tables
            .reminders
            .iter()
            .find(|r| r.movie_id == movie_id && r.user_id == user_id)
            .cloned()
    }

    pub fn recovery_tokens(&self) -> Vec<RecoveryToken> {
        self.tables.lock().unwrap().tokens.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        if tables
            .users
            .iter()
            .any(|u| u.email == user.email || u.username == user.username)
        {
            return Err(StoreError::Conflict);
        }
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            username: user.username,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_login(
        &self,
        email_or_username: &str,
    ) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .users
            .iter()
            .find(|u| u.email == email_or_username || u.username == email_or_username)
            .cloned())
    }

    async fn find_user_conflict(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .users
            .iter()
            .find(|u| u.username == username || u.email == email)
            .cloned())
    }

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(user) = tables.users.iter_mut().find(|u| u.id == user_id) {
            user.password_hash = password_hash.to_string();
        }
        Ok(())
    }

    async fn create_recovery_token(
        &self,
        user_id: Uuid,
        token: &str,
    ) -> Result<RecoveryToken, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        let row = RecoveryToken {
            id: Uuid::new_v4(),
            user_id,
            token: token.to_string(),
            created_at: Utc::now(),
        };
        tables.tokens.push(row.clone());
        Ok(row)
    }

    async fn find_recovery_token(&self, token: &str) -> Result<Option<RecoveryToken>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.tokens.iter().find(|t| t.token == token).cloned())
    }

    async fn delete_recovery_token(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.tokens.len();
        tables.tokens.retain(|t| t.id != id);
        Ok(tables.tokens.len() < before)
    }

    async fn insert_movie(&self, owner: Uuid, draft: &MovieDraft) -> Result<Movie, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        if duplicate_imdb(&tables, owner, draft, None) {
            return Err(StoreError::Conflict);
        }
        let movie = movie_from(owner, draft);
        tables.movies.push(movie.clone());
        Ok(movie)
    }

    async fn upsert_imported_movie(
        &self,
        owner: Uuid,
        draft: &MovieDraft,
    ) -> Result<Movie, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(existing) = tables
            .movies
            .iter()
            .find(|m| m.user_id == owner && m.imdb_id.is_some() && m.imdb_id == draft.imdb_id)
        {
            return Ok(existing.clone());
        }
        let movie = movie_from(owner, draft);
        tables.movies.push(movie.clone());
        Ok(movie)
    }

    async fn update_movie(
        &self,
        owner: Uuid,
        id: Uuid,
        draft: &MovieDraft,
    ) -> Result<Option<Movie>, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        if duplicate_imdb(&tables, owner, draft, Some(id)) {
            return Err(StoreError::Conflict);
        }
        let Some(slot) = tables
            .movies
            .iter_mut()
            .find(|m| m.id == id && m.user_id == owner)
        else {
            return Ok(None);
        };
        let mut updated = movie_from(owner, draft);
        updated.id = slot.id;
        updated.created_at = slot.created_at;
        *slot = updated.clone();
        Ok(Some(updated))
    }

    async fn find_movie(&self, owner: Uuid, id: Uuid) -> Result<Option<Movie>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .movies
            .iter()
            .find(|m| m.id == id && m.user_id == owner)
            .cloned())
    }

    async fn delete_movie(&self, owner: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.movies.len();
        tables.movies.retain(|m| !(m.id == id && m.user_id == owner));
        let deleted = tables.movies.len() < before;
        if deleted {
            tables.reminders.retain(|r| r.movie_id != id);
        }
        Ok(deleted)
    }

    async fn list_movies(&self, owner: Uuid) -> Result<Vec<Movie>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .movies
            .iter()
            .rev()
            .filter(|m| m.user_id == owner)
            .cloned()
            .collect())
    }

    async fn search_movies(&self, owner: Uuid, keyword: &str) -> Result<Vec<Movie>, StoreError> {
        let needle = keyword.to_lowercase();
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .movies
            .iter()
            .rev()
            .filter(|m| m.user_id == owner)
            .filter(|m| {
                [&m.title, &m.synopsis, &m.description]
                    .iter()
                    .any(|text| text.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect())
    }

    async fn save_reminder(&self, reminder: &ReleaseReminder) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().unwrap();
        match tables
            .reminders
            .iter_mut()
            .find(|r| r.movie_id == reminder.movie_id && r.user_id == reminder.user_id)
        {
            Some(existing) => {
                existing.movie_title = reminder.movie_title.clone();
                existing.movie_release_date = reminder.movie_release_date;
            }
            None => tables.reminders.push(ReleaseReminder {
                already_sent: false,
                ..reminder.clone()
            }),
        }
        Ok(())
    }

    async fn find_reminder(
        &self,
        movie_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ReleaseReminder>, StoreError> {
        Ok(self.reminder(movie_id, user_id))
    }

    async fn delete_reminder(&self, movie_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.reminders.len();
        tables
            .reminders
            .retain(|r| !(r.movie_id == movie_id && r.user_id == user_id));
        Ok(tables.reminders.len() < before)
    }

    async fn due_reminders(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<DueReminder>, StoreError> {
        if self.fail_due.load(Ordering::SeqCst) {
            return Err(outage());
        }
        let tables = self.tables.lock().unwrap();
        let mut due = Vec::new();
        for reminder in tables.reminders.iter().filter(|r| !r.already_sent) {
            let Some(movie) = tables.movies.iter().find(|m| m.id == reminder.movie_id) else {
                continue;
            };
            let Some(release_date) = movie.release_date else {
                continue;
            };
            if !movie.remind_user_on_launch || release_date < from || release_date >= until {
                continue;
            }
            let Some(user) = tables.users.iter().find(|u| u.id == reminder.user_id) else {
                continue;
            };
            due.push(DueReminder {
                movie_id: movie.id,
                user_id: user.id,
                title: movie.title.clone(),
                release_date,
                email: user.email.clone(),
            });
        }
        Ok(due)
    }

    async fn claim_reminder(&self, movie_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        if self.fail_claims.load(Ordering::SeqCst) {
            return Err(outage());
        }
        let mut tables = self.tables.lock().unwrap();
        match tables
            .reminders
            .iter_mut()
            .find(|r| r.movie_id == movie_id && r.user_id == user_id && !r.already_sent)
        {
            Some(reminder) => {
                reminder.already_sent = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Captures outgoing mail instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Message>>,
    pub fail: AtomicBool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: Message) -> Result<(), MailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::Rejected("mailbox unavailable".into()));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".into(),
        auth_secret: AUTH_SECRET.into(),
        listen_addr: "127.0.0.1:0".into(),
        cors_origins: "*".into(),
        public_url: "http://localhost:3000".into(),
        cron_token: Some(CRON_TOKEN.into()),
        omdb_api_key: None,
        omdb_base_url: "http://127.0.0.1:9/".into(),
        resend_api_key: None,
        resend_base_url: "http://127.0.0.1:9".into(),
        email_domain: Some("reelshelf.test".into()),
        reminder_timezone: chrono_tz::UTC,
        static_dir: None,
        cookie_secure: false,
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryStore::default());
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::with_mailer(store.clone(), mailer.clone(), config);
        Self {
            router: build_app(state.clone()),
            state,
            store,
            mailer,
        }
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.unwrap()
    }

    /// Register and sign in; returns the session cookie (`name=value`).
    pub async fn sign_up(&self, username: &str) -> String {
        let body = serde_json::json!({
            "username": username,
            "name": "Test User",
            "email": format!("{}@example.com", username),
            "password": "secret123",
            "confirmPassword": "secret123",
        });
        let resp = self.send(json_request("POST", "/api/auth/register", None, &body)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = serde_json::json!({ "emailOrUsername": username, "password": "secret123" });
        let resp = self.send(json_request("POST", "/api/auth/login", None, &body)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        session_cookie(&resp).expect("login sets the session cookie")
    }
}

pub fn session_cookie(resp: &Response<Body>) -> Option<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("reelshelf-session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub fn request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_json(resp: Response<Body>) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn movie_body(title: &str) -> Value {
    serde_json::json!({
        "title": title,
        "synopsis": format!("{} synopsis", title),
        "imageUrl": "https://example.com/poster.jpg",
        "duration": "120 min",
        "language": "English",
        "status": "released",
        "genres": "Drama, Thriller",
        "remindUserOnLaunch": false,
    })
}
