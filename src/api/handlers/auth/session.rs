//! Cookie sessions: random token in the browser, SHA-256 hash in the store.

use anyhow::{Context, Result};
use axum::http::{HeaderMap, HeaderValue};
use base64::Engine;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::debug;

use super::state::REMEMBER_ME_SECONDS;
use crate::{
    api::{
        cookies::{build_cookie, clear_cookie, read_cookie},
        AppState,
    },
    storage::User,
};

pub(crate) const SESSION_COOKIE_NAME: &str = "simo_session";

/// Create a new session token for the auth cookie.
/// The raw value is only returned to set the cookie; the store keeps a hash.
pub(crate) fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a session token so raw values never touch the database.
pub(crate) fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Resolve the session cookie into its user, if any.
///
/// # Errors
/// Returns an error only when the store lookup fails.
pub(crate) async fn authenticate(headers: &HeaderMap, state: &AppState) -> Result<Option<User>> {
    let Some(token) = read_cookie(headers, SESSION_COOKIE_NAME) else {
        return Ok(None);
    };
    if token.is_empty() {
        return Ok(None);
    }
    state.store().lookup_session(&hash_session_token(&token)).await
}

/// Persist a new session for `user_id` and return its `Set-Cookie` value.
///
/// "Remember me" sessions last two weeks and survive browser restarts;
/// others expire server-side after the configured TTL and use a
/// browser-session cookie.
///
/// # Errors
/// Returns an error if the token cannot be generated or stored.
pub(crate) async fn start_session(
    state: &AppState,
    user_id: i64,
    remember: bool,
) -> Result<HeaderValue> {
    let token = generate_session_token()?;
    let (ttl_seconds, max_age) = if remember {
        (REMEMBER_ME_SECONDS, Some(REMEMBER_ME_SECONDS))
    } else {
        (state.auth().session_ttl_seconds(), None)
    };
    let ttl = Duration::from_secs(u64::try_from(ttl_seconds).unwrap_or_default());

    state
        .store()
        .insert_session(&hash_session_token(&token), user_id, ttl)
        .await
        .context("Failed to store session")?;

    debug!(user_id, remember, "session started");

    build_cookie(
        SESSION_COOKIE_NAME,
        &token,
        max_age,
        state.auth().session_cookie_secure(),
    )
    .context("Failed to build session cookie")
}

/// Delete the session named by the request cookie and return a clearing cookie.
///
/// # Errors
/// Returns an error if the store delete fails.
pub(crate) async fn end_session(headers: &HeaderMap, state: &AppState) -> Result<HeaderValue> {
    if let Some(token) = read_cookie(headers, SESSION_COOKIE_NAME) {
        state
            .store()
            .delete_session(&hash_session_token(&token))
            .await
            .context("Failed to delete session")?;
    }
    clear_cookie(SESSION_COOKIE_NAME, state.auth().session_cookie_secure())
        .context("Failed to build session cookie")
}
