use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use tokio::fs;
use uuid::Uuid;

use crate::api::api_error::ApiError;

lazy_static! {
    static ref UNSAFE_CHARS: Regex = Regex::new(r"[^a-z0-9_\-\.]").unwrap();
}

pub const COVERS_ROUTE: &str = "/covers";

/// Local stand-in for an image host: uploads are staged in a temp dir,
/// then moved under the covers dir which is served at `/covers`.
#[derive(Debug, Clone)]
pub struct CoverStore {
    staging_dir: PathBuf,
    covers_dir: PathBuf,
}

impl CoverStore {
    pub async fn new(
        staging_dir: impl Into<PathBuf>,
        covers_dir: impl Into<PathBuf>,
    ) -> Result<Self, ApiError> {
        let store = CoverStore {
            staging_dir: staging_dir.into(),
            covers_dir: covers_dir.into(),
        };

        for dir in [&store.staging_dir, &store.covers_dir] {
            fs::create_dir_all(dir).await.map_err(|e| {
                tracing::error!("Err creating dir {}", dir.display());
                e
            })?;
        }

        Ok(store)
    }

    pub fn covers_dir(&self) -> &Path {
        &self.covers_dir
    }

    /// Writes an uploaded image to the staging dir and returns its path.
    pub async fn stage(&self, file_name: Option<&str>, bytes: &[u8]) -> Result<PathBuf, ApiError> {
        let ext = file_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .filter(|ext| matches!(ext.as_str(), "jpg" | "jpeg" | "png" | "webp"))
            .ok_or_else(|| {
                ApiError::BadRequest("Book cover must be a jpg, jpeg, png or webp image.".into())
            })?;

        if bytes.is_empty() {
            return Err(ApiError::BadRequest("Book cover image is empty.".into()));
        }

        let staged = self
            .staging_dir
            .join(format!("{}.{}", Uuid::new_v4().simple(), ext));
        fs::write(&staged, bytes).await?;

        Ok(staged)
    }

    /// Publishes a staged file and returns its public URL. The staged file
    /// is gone afterwards, whether or not the upload worked.
    pub async fn upload(&self, local_path: &Path, title: &str) -> Result<String, ApiError> {
        let ext = local_path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("img");
        let cover_name = cover_file_name(title, ext);
        let target = self.covers_dir.join(&cover_name);

        if let Err(e) = fs::rename(local_path, &target).await {
            tracing::warn!("rename into covers failed ({}), copying instead", e);
            let copied = fs::copy(local_path, &target).await;
            self.discard(local_path).await;
            copied.map_err(|e| {
                tracing::error!("Failed to store cover {}. {}", cover_name, e);
                ApiError::Internal("Failed to upload book cover image.".into())
            })?;
        }

        Ok(format!("{COVERS_ROUTE}/{cover_name}"))
    }

    /// Removes a cover published by `upload`, given its public URL.
    pub async fn unpublish(&self, url: &str) {
        let Some(name) = url
            .strip_prefix(COVERS_ROUTE)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| !name.is_empty() && !name.contains(['/', '\\']))
        else {
            tracing::warn!("not a published cover url: {}", url);
            return;
        };

        self.discard(&self.covers_dir.join(name)).await;
    }

    pub async fn discard(&self, local_path: &Path) {
        if let Err(e) = fs::remove_file(local_path).await {
            tracing::warn!("Could not remove cover file {}: {}", local_path.display(), e);
        }
    }
}

/// `"The Left Hand of Darkness"` → `the_left_hand_of_darkness-<suffix>.<ext>`
pub fn cover_file_name(title: &str, ext: &str) -> String {
    let slug = title.trim().replace(' ', "_").to_lowercase();
    let slug = UNSAFE_CHARS.replace_all(&slug, "");
    let suffix = Uuid::new_v4().simple().to_string();

    format!("{}-{}.{}", slug, &suffix[..8], ext)
}
