use crate::{
    api::{self, AppState, AuthConfig},
    media::MediaStore,
    storage::postgres::PgStore,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub media_root: String,
    pub max_body_bytes: usize,
    pub session_ttl_seconds: i64,
    pub session_cookie_secure: bool,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the schema cannot be
/// applied, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let store = PgStore::connect(&args.dsn).await?;
    store.apply_schema().await?;
    debug!("database schema applied");

    let media = MediaStore::new(&args.media_root);
    tokio::fs::create_dir_all(media.root())
        .await
        .with_context(|| format!("Failed to create media root {}", args.media_root))?;

    let auth = AuthConfig::new()
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_session_cookie_secure(args.session_cookie_secure);

    let state = AppState::new(Arc::new(store), media, auth).with_max_body_bytes(args.max_body_bytes);

    info!(
        media_root = %args.media_root,
        session_ttl_seconds = args.session_ttl_seconds,
        "Starting server"
    );

    api::new(args.port, Arc::new(state)).await
}
