use axum::{http::HeaderMap, response::Response, Extension};
use std::sync::Arc;
use tracing::debug;

use super::auth::Principal;
use crate::api::{error::AppError, flash::Flash, views, AppState};

/// Gallery of images, newest first. Admins see every user's images.
pub async fn dashboard(
    Extension(state): Extension<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let owner = if principal.is_admin() {
        None
    } else {
        Some(principal.user_id)
    };
    let images = state.store().list_images(owner).await?;
    debug!(count = images.len(), admin = principal.is_admin(), "dashboard images");

    Ok(views::render(
        Flash::from_headers(&headers),
        Some(&principal),
        "Dashboard",
        &views::dashboard_page(&images, &principal),
    ))
}
