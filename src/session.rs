//! Signed session tokens and the cookie that carries them.
//!
//! Tokens are HS256 JWTs valid for seven days. There is no server-side
//! revocation: logging out only drops the cookie, a copied token keeps working
//! until its `exp`.

use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "reelshelf-session";

const SESSION_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    /// Arbitrary data bound to the session at login.
    #[serde(default)]
    pub payload: serde_json::Value,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

#[derive(Clone)]
pub struct SessionManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    cookie_secure: bool,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("cookie_secure", &self.cookie_secure)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(secret: &str, cookie_secure: bool) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            cookie_secure,
        }
    }

    pub fn issue(
        &self,
        payload: serde_json::Value,
        subject: Uuid,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_at(payload, subject, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(
        &self,
        payload: serde_json::Value,
        subject: Uuid,
        now: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            sub: subject,
            payload,
            iat: now.timestamp(),
            exp: (now + Duration::days(SESSION_TTL_DAYS)).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// Returns `None` for a missing, malformed, tampered or expired token.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        if token.is_empty() {
            return None;
        }
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!("Rejected session token: {}", e);
                None
            }
        }
    }

    /// Verify the session carried by the request cookie jar.
    pub fn from_jar(&self, jar: &CookieJar) -> Option<Claims> {
        jar.get(SESSION_COOKIE).and_then(|c| self.verify(c.value()))
    }

    /// HttpOnly cookie for the whole site, expiring with the token.
    pub fn cookie(&self, token: &str) -> Option<Cookie<'static>> {
        let claims = self.verify(token)?;
        let expires = claims.expires_at()?;
        let mut raw = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Expires={}",
            SESSION_COOKIE,
            token,
            expires.format("%a, %d %b %Y %H:%M:%S GMT"),
        );
        if self.cookie_secure {
            raw.push_str("; Secure");
        }
        Cookie::parse(raw).ok()
    }

    /// Drop the session cookie from the client.
    pub fn destroy(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
    }
}
