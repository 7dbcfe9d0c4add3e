//! Profile image files on local disk.
//!
//! Paths stored in the database are relative to the media root
//! (`user_images/<ulid>_<name>`), never absolute.

use anyhow::{anyhow, Context, Result};
use axum::body::Bytes;
use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};
use tracing::{debug, instrument};
use ulid::Ulid;

pub const USER_IMAGES_DIR: &str = "user_images";

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// A file received in a multipart form.
#[derive(Clone, Debug)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Bytes,
}

impl Upload {
    #[must_use]
    pub fn has_image_extension(&self) -> bool {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
    }
}

#[derive(Clone, Debug)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write an uploaded profile image and return its media-relative path.
    ///
    /// # Errors
    /// Returns an error if the directory or file cannot be written.
    #[instrument(skip(self, upload), fields(file_name = %upload.file_name))]
    pub async fn save_user_image(&self, upload: &Upload) -> Result<String> {
        let dir = self.root.join(USER_IMAGES_DIR);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let name = format!("{}_{}", Ulid::new(), sanitize_file_name(&upload.file_name));
        let path = dir.join(&name);
        tokio::fs::write(&path, &upload.bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        debug!("stored user image {}", path.display());

        Ok(format!("{USER_IMAGES_DIR}/{name}"))
    }

    /// Remove a stored file. A file that is already gone is not an error.
    ///
    /// # Errors
    /// Returns an error for paths escaping the media root or failed removals.
    #[instrument(skip(self))]
    pub async fn delete(&self, relative: &str) -> Result<()> {
        let path = self.resolve(relative)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("removed {}", path.display());
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let relative = Path::new(relative);
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(anyhow!(
                "media path must stay inside the media root: {}",
                relative.display()
            ));
        }
        Ok(self.root.join(relative))
    }
}

/// Keep `[A-Za-z0-9._-]`, replace everything else, and never return an empty name.
fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|base| base.to_str())
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}
