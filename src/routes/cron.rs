use axum::{
    extract::State,
    http::{header, HeaderMap},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use subtle::ConstantTimeEq;
use utoipa::ToSchema;

use crate::error::{ApiError, AppError};
use crate::reminders::{self, SweepReport};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/check-releases", get(check_releases).post(check_releases))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SweepResponse {
    pub success: bool,
    /// Reminders delivered by this run.
    pub count: usize,
}

/// Constant-time comparison of the presented bearer token.
fn authorized(headers: &HeaderMap, expected: Option<&str>) -> bool {
    let Some(expected) = expected else {
        return false;
    };
    let Some(presented) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    else {
        return false;
    };
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[utoipa::path(
    post,
    path = "/api/cron/check-releases",
    responses(
        (status = 200, description = "Sweep finished", body = SweepResponse),
        (status = 401, description = "Missing or wrong cron token", body = ApiError),
        (status = 500, description = "Due reminders could not be read", body = ApiError),
    ),
    security(("bearer" = [])),
    tag = "Cron"
)]
pub(crate) async fn check_releases(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SweepResponse>, AppError> {
    if !authorized(&headers, state.config.cron_token.as_deref()) {
        tracing::warn!("Rejected release sweep: bad or missing cron token");
        return Err(AppError::Unauthorized);
    }

    let window = reminders::today_window(Utc::now(), state.config.reminder_timezone);
    let SweepReport { delivered } =
        reminders::run_sweep(state.store.as_ref(), state.mailer.as_ref(), window).await?;
    Ok(Json(SweepResponse {
        success: true,
        count: delivered,
    }))
}
