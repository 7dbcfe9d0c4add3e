use axum::{
    extract::Query,
    http::{header::SET_COOKIE, HeaderMap},
    response::Response,
    Extension, Form,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{password::verify_password, session::start_session};
use crate::api::{
    error::AppError,
    flash::Flash,
    forms::{normalize_email, LoginRequest},
    views, AppState,
};

const UNAUTHORIZED_FLAG: &str = "unauthorized";

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub error: Option<String>,
}

impl LoginQuery {
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.error.as_deref() == Some(UNAUTHORIZED_FLAG)
    }
}

pub async fn login_form(headers: HeaderMap, Query(query): Query<LoginQuery>) -> Response {
    let mut flash = Flash::from_headers(&headers);
    if query.is_unauthorized() {
        flash.error("Unauthorized Access. Login to Continue.");
    }
    views::render(flash, None, "Login", &views::login_page(""))
}

#[instrument(skip_all)]
pub async fn login(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Form(request): Form<LoginRequest>,
) -> Result<Response, AppError> {
    let mut flash = Flash::from_headers(&headers);
    let email = normalize_email(&request.email);

    let user = if email.is_empty() {
        None
    } else {
        state.store().find_user_by_email(&email).await?
    };

    let Some(user) = user.filter(|user| verify_password(&request.password, &user.password_hash))
    else {
        warn!("Invalid login attempt");
        flash.error("Invalid User Credentials");
        return Ok(views::render(
            flash,
            None,
            "Login",
            &views::login_page(&request.email),
        ));
    };

    let cookie = start_session(&state, user.id, request.remember()).await?;
    info!(user_id = user.id, "User logged in");

    let mut response = flash.redirect("/");
    response.headers_mut().append(SET_COOKIE, cookie);
    Ok(response)
}
