use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;

use crate::accounts;
use crate::error::{ApiError, ApiResponse, AppError};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::auth::AuthUser;
use crate::models::user::{
    ForgotPasswordRequest, LoginRequest, RecoverPasswordRequest, RegisterRequest, UserProfile,
};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/forgot-password", post(forgot_password))
        .route("/recover-password/{token}", post(recover_password))
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = UserProfile),
        (status = 409, description = "Username or email taken", body = ApiError),
        (status = 422, description = "Invalid input", body = ApiError),
    ),
    tag = "Auth"
)]
pub(crate) async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<Json<ApiResponse<UserProfile>>, AppError> {
    let user = accounts::register(state.store.as_ref(), state.mailer.as_ref(), req).await?;
    Ok(ApiResponse::ok("Account created", user.into()))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in; session cookie set", body = UserProfile),
        (status = 401, description = "Invalid credentials", body = ApiError),
        (status = 422, description = "Invalid input", body = ApiError),
    ),
    tag = "Auth"
)]
pub(crate) async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<UserProfile>>), AppError> {
    let (user, token) = accounts::login(state.store.as_ref(), &state.sessions, req).await?;
    let cookie = state
        .sessions
        .cookie(&token)
        .ok_or_else(|| AppError::internal("Session cookie", "freshly issued token did not verify"))?;
    Ok((jar.add(cookie), ApiResponse::ok("Signed in", user.into())))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Session cookie cleared")),
    tag = "Auth"
)]
pub(crate) async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<ApiResponse<()>>) {
    (state.sessions.destroy(jar), ApiResponse::done("Signed out"))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserProfile),
        (status = 401, description = "Not signed in", body = ApiError),
    ),
    security(("bearer" = [])),
    tag = "Auth"
)]
pub(crate) async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<UserProfile>>, AppError> {
    // A token can outlive its account.
    let user = state
        .store
        .find_user_by_id(auth.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(ApiResponse::ok("Current user", user.into()))
}

#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Recovery link sent"),
        (status = 401, description = "Unknown email", body = ApiError),
        (status = 502, description = "Mail provider failure", body = ApiError),
    ),
    tag = "Auth"
)]
pub(crate) async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    accounts::forgot_password(
        state.store.as_ref(),
        state.mailer.as_ref(),
        &state.config.public_url,
        req,
    )
    .await?;
    Ok(ApiResponse::done("Check your inbox for a recovery link"))
}

#[utoipa::path(
    post,
    path = "/api/auth/recover-password/{token}",
    params(("token" = String, Path, description = "Recovery token from the mailed link")),
    request_body = RecoverPasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 404, description = "Unknown or used token", body = ApiError),
        (status = 422, description = "Invalid input", body = ApiError),
    ),
    tag = "Auth"
)]
pub(crate) async fn recover_password(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
    ApiJson(req): ApiJson<RecoverPasswordRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    accounts::recover_password(state.store.as_ref(), &token, req).await?;
    Ok(ApiResponse::done("Password changed"))
}
