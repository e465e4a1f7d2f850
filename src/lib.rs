pub mod accounts;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod filter;
pub mod importer;
pub mod mailer;
pub mod middleware;
pub mod models;
pub mod reminders;
pub mod routes;
pub mod session;

use std::path::Path;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::{middleware as axum_middleware, Router};
use chrono::{NaiveDate, Utc};
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::db::Store;
use crate::error::AppError;
use crate::importer::OmdbClient;
use crate::mailer::{Mailer, ResendMailer};
use crate::session::SessionManager;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub sessions: SessionManager,
    pub omdb: OmdbClient,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Production wiring: Resend for mail, OMDb for metadata.
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let mailer = ResendMailer::new(
            &config.resend_base_url,
            config.resend_api_key.clone(),
            config.email_domain.as_deref(),
        );
        Self::with_mailer(store, Arc::new(mailer), config)
    }

    pub fn with_mailer(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>, config: Config) -> Self {
        Self {
            store,
            sessions: SessionManager::new(&config.auth_secret, config.cookie_secure),
            omdb: OmdbClient::new(&config.omdb_base_url, config.omdb_api_key.clone()),
            mailer,
            config: Arc::new(config),
        }
    }

    /// Current date in the reference timezone.
    pub fn today(&self) -> NaiveDate {
        reminders::today_window(Utc::now(), self.config.reminder_timezone).0
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::auth::register,
        routes::auth::login,
        routes::auth::logout,
        routes::auth::me,
        routes::auth::forgot_password,
        routes::auth::recover_password,
        routes::movies::list_movies,
        routes::movies::search_movies,
        routes::movies::catalog_page,
        routes::movies::get_movie,
        routes::movies::create_movie,
        routes::movies::update_movie,
        routes::movies::delete_movie,
        routes::movies::import_movie,
        routes::cron::check_releases,
    ),
    components(schemas(
        error::ApiError,
        models::user::RegisterRequest,
        models::user::LoginRequest,
        models::user::ForgotPasswordRequest,
        models::user::RecoverPasswordRequest,
        models::user::UserProfile,
        models::movie::Movie,
        models::movie::MovieInput,
        models::movie::MovieStatus,
        filter::SearchFilters,
        importer::NormalizedRecord,
        routes::cron::SweepResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Accounts and sessions"),
        (name = "Movies", description = "Personal movie catalog"),
        (name = "Cron", description = "Scheduled jobs")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            utoipa::openapi::security::SecurityScheme::Http(
                utoipa::openapi::security::Http::new(
                    utoipa::openapi::security::HttpAuthScheme::Bearer,
                ),
            ),
        );
    }
}

fn cors_layer(origins: &str) -> CorsLayer {
    if origins.is_empty() || origins == "*" {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}

async fn page_not_found() -> AppError {
    AppError::NotFound("Page not found")
}

/// Everything outside `/api` and the docs: the page gate in front of the
/// prebuilt frontend, when one is configured.
fn pages(state: &AppState) -> Router<AppState> {
    let pages = match state.config.static_dir.as_deref() {
        Some(dir) => {
            let index = Path::new(dir).join("index.html");
            Router::new().fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)))
        }
        None => Router::new().fallback(page_not_found),
    };
    pages.layer(axum_middleware::from_fn_with_state(
        state.clone(),
        middleware::auth::session_gate,
    ))
}

pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    routes::api_router()
        .merge(pages(&state))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
