use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, HeaderValue, StatusCode, header::InvalidHeaderValue, request::Parts},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use std::convert::Infallible;

use crate::{
    config::AppConfig,
    models::User,
    repository::RepositoryState,
};

pub const SESSION_COOKIE_NAME: &str = "blog_session";
pub const FLASH_COOKIE_NAME: &str = "blog_flash";

/// Sessions expire server-side after two weeks regardless of activity.
pub const SESSION_TTL_SECONDS: i64 = 60 * 60 * 24 * 14;

// --- Password Hashing ---

/// Hash a plaintext password with Argon2id. A fresh random 16-byte salt is
/// generated per call, so two hashes of the same password never match.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Verify a plaintext password against a stored PHC string. Malformed stored
/// hashes count as a failed verification rather than an error.
pub fn verify_password(stored_hash: &str, password: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

// --- Session Tokens ---

/// Create a new session token for the auth cookie.
/// The raw value is only returned to set the cookie; the database stores a
/// keyed hash.
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash a session token, keyed with the configured session secret, so raw
/// cookie values never touch the database and stored hashes are useless
/// without the secret.
pub fn hash_session_token(secret: &str, token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

// --- Cookies ---

/// Build the `HttpOnly` session cookie carrying the raw token.
pub fn session_cookie(token: &str, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={SESSION_TTL_SECONDS}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Expire the session cookie. Sent on logout whether or not a session row
/// existed.
pub fn clear_session_cookie(secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Build the one-shot flash cookie. The message is base64-encoded so
/// arbitrary text survives the cookie value grammar.
pub fn flash_cookie(message: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let encoded = URL_SAFE_NO_PAD.encode(message.as_bytes());
    HeaderValue::from_str(&format!(
        "{FLASH_COOKIE_NAME}={encoded}; Path=/; HttpOnly; SameSite=Lax; Max-Age=60"
    ))
}

/// Expire the flash cookie; sent alongside any page that displayed it.
pub fn clear_flash_cookie() -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{FLASH_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
    ))
}

/// Pull a single cookie value out of the request's `Cookie` header.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == name {
            return Some(val.to_string());
        }
    }
    None
}

/// The raw session token presented by the client, if any.
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, SESSION_COOKIE_NAME)
}

/// The pending flash message, if the client presented one.
pub fn extract_flash(headers: &HeaderMap) -> Option<String> {
    let encoded = cookie_value(headers, FLASH_COOKIE_NAME)?;
    let bytes = URL_SAFE_NO_PAD.decode(encoded.as_bytes()).ok()?;
    String::from_utf8(bytes).ok()
}

// --- Extractors ---

/// Resolve the session cookie to a user record. Missing, invalid, or expired
/// tokens resolve to `None`; resolution never fails the request.
async fn resolve_identity<S>(parts: &Parts, state: &S) -> Option<User>
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    let repo = RepositoryState::from_ref(state);
    let config = AppConfig::from_ref(state);

    let token = extract_session_token(&parts.headers)?;
    // Only the keyed hash is ever compared against the database.
    let token_hash = hash_session_token(&config.session_secret, &token);
    repo.session_user(&token_hash).await
}

/// CurrentUser
///
/// The per-request identity context: `Some(User)` for an authenticated
/// caller, `None` for an anonymous one. Constructed once per request from the
/// incoming session cookie and passed explicitly into handlers.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<User>);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentUser(resolve_identity(parts, state).await))
    }
}

/// AdminUser
///
/// The admin guard: usable as a handler argument on every administrative
/// route. Resolution runs the same session lookup as `CurrentUser` and then
/// requires the admin capability.
///
/// Rejection: HTTP 403 for anonymous callers and for authenticated readers
/// alike. No custom error page is rendered.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match resolve_identity(parts, state).await {
            Some(user) if user.is_admin() => Ok(AdminUser(user)),
            _ => Err(StatusCode::FORBIDDEN),
        }
    }
}

/// IncomingFlash
///
/// One-shot message queued by a previous redirect. Pages that display it must
/// also clear the cookie so the message shows exactly once.
#[derive(Debug, Clone)]
pub struct IncomingFlash(pub Option<String>);

impl<S> FromRequestParts<S> for IncomingFlash
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(IncomingFlash(extract_flash(&parts.headers)))
    }
}
