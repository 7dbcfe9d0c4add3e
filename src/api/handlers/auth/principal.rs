//! Authenticated principal extraction and route guards.
//!
//! Flow Overview: read the session cookie, resolve it to a user, and insert a
//! [`Principal`] into the request extensions for downstream handlers. Guards
//! are applied with `route_layer` so unmatched paths still 404.

use axum::{
    extract::{Query, Request},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use std::sync::Arc;
use tracing::debug;

use super::{login::LoginQuery, session::authenticate};
use crate::{
    api::{error::AppError, flash::Flash, AppState},
    storage::{User, UserType},
};

pub(crate) const UNAUTHORIZED_REDIRECT: &str = "/login?error=unauthorized";

/// Authenticated user context derived from the session cookie.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: i64,
    pub email: String,
    pub full_name: String,
    pub user_type: UserType,
}

impl Principal {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user_type == UserType::Admin
    }
}

impl From<User> for Principal {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            email: user.email,
            full_name: user.full_name,
            user_type: user.user_type,
        }
    }
}

/// True only for authenticated administrators.
#[must_use]
pub fn is_admin(principal: Option<&Principal>) -> bool {
    principal.is_some_and(Principal::is_admin)
}

#[must_use]
pub fn is_guest(principal: Option<&Principal>) -> bool {
    principal.is_none()
}

async fn resolve(headers: &HeaderMap, state: &AppState) -> Result<Option<Principal>, AppError> {
    let user = authenticate(headers, state).await?;
    Ok(user.map(Principal::from))
}

/// Let authenticated users through; send guests to `/login`.
pub async fn require_login(
    Extension(state): Extension<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve(request.headers(), &state).await {
        Ok(Some(principal)) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Ok(None) => {
            debug!(path = request.uri().path(), "guest redirected to login");
            Redirect::to("/login").into_response()
        }
        Err(err) => err.into_response(),
    }
}

/// Let guests through; send authenticated users to the dashboard.
///
/// An authenticated user bounced here by [`require_admin`] gets an
/// "access denied" notice in place of whatever was pending.
pub async fn require_guest(
    Extension(state): Extension<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let principal = match resolve(request.headers(), &state).await {
        Ok(principal) => principal,
        Err(err) => return err.into_response(),
    };
    if is_guest(principal.as_ref()) {
        return next.run(request).await;
    }

    let unauthorized = Query::<LoginQuery>::try_from_uri(request.uri())
        .is_ok_and(|Query(query)| query.is_unauthorized());
    if unauthorized {
        let mut flash = Flash::from_headers(request.headers());
        flash.discard_pending();
        flash.error("Unauthorized Access was denied.");
        return flash.redirect("/");
    }
    Redirect::to("/").into_response()
}

/// Let administrators through; everyone else lands on the login page with
/// the unauthorized flag.
pub async fn require_admin(
    Extension(state): Extension<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve(request.headers(), &state).await {
        Ok(Some(principal)) if is_admin(Some(&principal)) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Ok(principal) => {
            debug!(
                path = request.uri().path(),
                user_id = principal.map(|principal| principal.user_id),
                "admin access denied"
            );
            Redirect::to(UNAUTHORIZED_REDIRECT).into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(user_type: UserType) -> Principal {
        Principal {
            user_id: 1,
            email: "p@example.com".to_string(),
            full_name: "P".to_string(),
            user_type,
        }
    }

    #[test]
    fn predicates() {
        let admin = principal(UserType::Admin);
        let regular = principal(UserType::Regular);

        assert!(is_admin(Some(&admin)));
        assert!(!is_admin(Some(&regular)));
        assert!(!is_admin(None));

        assert!(is_guest(None));
        assert!(!is_guest(Some(&regular)));
    }

    #[test]
    fn from_user_keeps_identity() {
        let user = User {
            id: 7,
            email: "u@example.com".to_string(),
            full_name: "U".to_string(),
            password_hash: "hash".to_string(),
            user_type: UserType::Admin,
            image: None,
            created_at: "2024-01-01 00:00".to_string(),
        };
        let principal = Principal::from(user);
        assert_eq!(principal.user_id, 7);
        assert!(principal.is_admin());
    }
}
