use std::{
    io,
    path::{Path, PathBuf},
};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{debug, warn};

/// URL path below which stored images are served, whatever the disk root is.
pub const IMAGE_URL_PREFIX: &str = "images";

pub const ACCEPTED_IMAGE_TYPES: [&str; 3] = ["image/png", "image/jpg", "image/jpeg"];

const FALLBACK_FILE_NAME: &str = "image";

#[must_use]
pub fn is_accepted_image_type(content_type: &str) -> bool {
    ACCEPTED_IMAGE_TYPES.contains(&content_type)
}

/// Somewhere uploaded images are kept.
pub trait ImageStorage: Send + Sync {
    /// Persists `bytes` under a name derived from `suggested_name` and returns
    /// the path clients use to refer to it.
    fn store(
        &self,
        bytes: &[u8],
        suggested_name: &str,
    ) -> impl Future<Output = io::Result<String>> + Send;

    /// Removes a previously stored image. Failures are logged, never returned.
    fn delete(&self, path: &str) -> impl Future<Output = ()> + Send;
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct DiskImageStorage {
    root: PathBuf,
}

impl DiskImageStorage {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a stored reference back onto a file inside the root. Only the final
    /// path component is kept, so references cannot escape the root.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let file_name = file_name(path)?;
        Some(self.root.join(file_name))
    }

}

fn file_name(path: &str) -> Option<&str> {
    path.rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
}

#[must_use]
pub fn generate_file_name(suggested_name: &str, now: OffsetDateTime) -> String {
    let timestamp = now
        .format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string());
    let original = file_name(suggested_name).unwrap_or(FALLBACK_FILE_NAME);

    format!("{timestamp}-{original}")
}

impl ImageStorage for DiskImageStorage {
    async fn store(&self, bytes: &[u8], suggested_name: &str) -> io::Result<String> {
        let file_name = generate_file_name(suggested_name, OffsetDateTime::now_utc());

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&file_name), bytes).await?;

        debug!(%file_name, size = bytes.len(), "Stored image");
        Ok(format!("{IMAGE_URL_PREFIX}/{file_name}"))
    }

    async fn delete(&self, path: &str) {
        let Some(resolved) = self.resolve(path) else {
            warn!(%path, "Not deleting image with unusable path");
            return;
        };

        match tokio::fs::remove_file(&resolved).await {
            Ok(()) => debug!(path = %resolved.display(), "Deleted image"),
            Err(err) => warn!(path = %resolved.display(), error = %err, "Deleting image failed"),
        }
    }
}
