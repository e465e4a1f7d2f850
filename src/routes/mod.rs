pub mod auth;
pub mod cron;
pub mod movies;

use axum::Router;

use crate::AppState;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth::router())
        .nest("/api/movies", movies::router())
        .nest("/api/cron", cron::router())
}
