use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tracing::error;

use super::views;

/// Failures a handler cannot turn into a form error or a flash message.
#[derive(Debug)]
pub enum AppError {
    NotFound,
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound => (
                StatusCode::NOT_FOUND,
                Html(views::error_page("Not Found", "The requested record does not exist.")),
            )
                .into_response(),
            Self::Internal(err) => {
                error!("Failed to handle request: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html(views::error_page(
                        "Server Error",
                        "Something went wrong. Please try again.",
                    )),
                )
                    .into_response()
            }
        }
    }
}
