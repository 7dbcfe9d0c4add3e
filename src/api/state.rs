use std::sync::Arc;

use super::handlers::auth::AuthConfig;
use crate::{media::MediaStore, storage::Store};

/// Default request body limit: 10 MiB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shared state handed to every handler via `Extension<Arc<AppState>>`.
pub struct AppState {
    store: Arc<dyn Store>,
    media: MediaStore,
    auth: AuthConfig,
    max_body_bytes: usize,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, media: MediaStore, auth: AuthConfig) -> Self {
        Self {
            store,
            media,
            auth,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    #[must_use]
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    #[must_use]
    pub fn media(&self) -> &MediaStore {
        &self.media
    }

    #[must_use]
    pub fn auth(&self) -> &AuthConfig {
        &self.auth
    }

    #[must_use]
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }
}
