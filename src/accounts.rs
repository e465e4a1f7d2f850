//! Registration, login and password recovery.

use argon2::Argon2;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use rand::RngCore;
use validator::Validate;

use crate::db::{Store, StoreError};
use crate::error::AppError;
use crate::mailer::{self, Mailer};
use crate::models::user::{
    ForgotPasswordRequest, LoginRequest, NewUser, RecoverPasswordRequest, RegisterRequest, User,
};
use crate::session::SessionManager;

const USER_EXISTS: &str = "User already exists";
const INVALID_RECOVERY_LINK: &str = "Invalid or expired recovery link";

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::internal("Failed to hash password", e))
}

/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Unreadable password hash: {}", e);
            false
        }
    }
}

/// 32 random bytes, URL-safe.
pub fn generate_recovery_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub async fn register(
    store: &dyn Store,
    mailer: &dyn Mailer,
    req: RegisterRequest,
) -> Result<User, AppError> {
    let req = req.normalized();
    req.check()?;

    if store
        .find_user_conflict(&req.username, &req.email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(USER_EXISTS));
    }

    let password_hash = hash_password(&req.password)?;
    let user = store
        .create_user(NewUser {
            name: req.name,
            email: req.email,
            username: req.username,
            password_hash,
        })
        .await
        .map_err(|e| match e {
            StoreError::Conflict => AppError::Conflict(USER_EXISTS),
            other => other.into(),
        })?;
    tracing::info!(user_id = %user.id, "User registered");

    // The account exists either way; a lost welcome mail is only logged.
    if let Err(e) = mailer.send(mailer::welcome(&user.email, &user.name)).await {
        tracing::warn!(user_id = %user.id, error = %e, "Welcome mail not sent");
    }

    Ok(user)
}

/// Check credentials and issue a session token.
pub async fn login(
    store: &dyn Store,
    sessions: &SessionManager,
    req: LoginRequest,
) -> Result<(User, String), AppError> {
    req.validate()?;

    let user = store
        .find_user_by_login(req.email_or_username.trim())
        .await?
        .ok_or(AppError::InvalidCredentials)?;
    if !verify_password(&req.password, &user.password_hash) {
        return Err(AppError::InvalidCredentials);
    }

    let payload = serde_json::json!({
        "emailOrUsername": req.email_or_username.trim(),
        "name": user.name,
    });
    let token = sessions
        .issue(payload, user.id)
        .map_err(|e| AppError::internal("Failed to create token", e))?;
    tracing::info!(user_id = %user.id, "User logged in");
    Ok((user, token))
}

/// Mail a single-use recovery link to the account holder.
pub async fn forgot_password(
    store: &dyn Store,
    mailer: &dyn Mailer,
    public_url: &str,
    req: ForgotPasswordRequest,
) -> Result<(), AppError> {
    req.validate()?;

    let user = store
        .find_user_by_email(req.email.trim())
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let token = generate_recovery_token();
    store.create_recovery_token(user.id, &token).await?;

    mailer
        .send(mailer::password_recovery(&user.email, public_url, &token))
        .await
        .map_err(|e| AppError::Mail(e.to_string()))?;
    tracing::info!(user_id = %user.id, "Password recovery mail sent");
    Ok(())
}

/// Redeem a recovery token. The token is consumed before the password changes.
pub async fn recover_password(
    store: &dyn Store,
    token: &str,
    req: RecoverPasswordRequest,
) -> Result<(), AppError> {
    req.check()?;

    let recovery = store
        .find_recovery_token(token)
        .await?
        .ok_or(AppError::NotFound(INVALID_RECOVERY_LINK))?;
    if !store.delete_recovery_token(recovery.id).await? {
        return Err(AppError::NotFound(INVALID_RECOVERY_LINK));
    }

    let password_hash = hash_password(&req.password)?;
    store
        .update_password(recovery.user_id, &password_hash)
        .await?;
    tracing::info!(user_id = %recovery.user_id, "Password recovered");
    Ok(())
}
