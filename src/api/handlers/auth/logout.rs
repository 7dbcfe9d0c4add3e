use axum::{
    http::{header::SET_COOKIE, HeaderMap},
    response::Response,
    Extension,
};
use std::sync::Arc;
use tracing::info;

use super::{principal::Principal, session::end_session};
use crate::api::{error::AppError, flash::Flash, AppState};

/// End the current session. Accepts GET and POST.
pub async fn logout(
    Extension(state): Extension<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let cookie = end_session(&headers, &state).await?;
    info!(user_id = principal.user_id, "User logged out");

    let mut flash = Flash::from_headers(&headers);
    flash.success("Logged Out Successfully");
    let mut response = flash.redirect("/login");
    response.headers_mut().append(SET_COOKIE, cookie);
    Ok(response)
}
