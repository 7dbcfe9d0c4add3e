use anyhow::Result;
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, MatchedPath},
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

pub(crate) mod cookies;
pub(crate) mod error;
pub(crate) mod flash;
pub(crate) mod forms;
pub mod handlers;
mod state;
pub(crate) mod views;


use handlers::{
    auth::{login, logout, register, require_admin, require_guest, require_login},
    users,
};

pub use handlers::auth::AuthConfig;
pub use state::{AppState, DEFAULT_MAX_BODY_BYTES};

pub use crate::GIT_COMMIT_HASH;

/// Build the application router.
///
/// Routes are grouped by guard: guest-only pages, pages for any logged-in
/// user, and admin user management.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    let guest = Router::new()
        .route("/login", get(login::login_form).post(login::login))
        .route(
            "/register",
            get(register::register_form).post(register::register),
        )
        .route_layer(middleware::from_fn(require_guest));

    let member = Router::new()
        .route("/", get(handlers::dashboard))
        .route("/logout", get(logout::logout).post(logout::logout))
        .route_layer(middleware::from_fn(require_login));

    let admin = Router::new()
        .route("/users", get(users::list_users))
        .route("/users/add", get(users::add_user_form).post(users::add_user))
        .route(
            "/users/edit/:id",
            get(users::edit_user_form).post(users::edit_user),
        )
        .route(
            "/users/delete/:id",
            post(users::delete_user).fallback(users::delete_user_rejected),
        )
        .route_layer(middleware::from_fn(require_admin));

    Router::new()
        .merge(guest)
        .merge(member)
        .merge(admin)
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(state.max_body_bytes()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, state: Arc<AppState>) -> Result<()> {
    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
