//! Multipart intake: stages the `image` file on local disk for the lifetime
//! of a request.
//!
//! Staged files are owned by [`UploadedFile`] and removed when it is dropped,
//! unless the store was configured to retain them.

use axum::extract::Multipart;
use rand::Rng;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::error::AppError;
use crate::types::PredictionRequest;

pub const IMAGE_FIELD: &str = "image";
pub const CROP_TYPE_FIELD: &str = "cropType";

const SUFFIX_MAX: u32 = 1_000_000_000;

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    retain: bool,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, retain: bool) -> Self {
        Self {
            dir: dir.into(),
            retain,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        if !tokio::fs::try_exists(&self.dir).await? {
            tokio::fs::create_dir_all(&self.dir).await?;
            tracing::info!(dir = %self.dir.display(), "Created uploads directory");
        }
        Ok(())
    }

    /// Reads the form, staging the first `image` file and collecting `cropType`.
    #[tracing::instrument(skip_all)]
    pub async fn intake(&self, mut multipart: Multipart) -> Result<PredictionRequest, AppError> {
        let mut image: Option<UploadedFile> = None;
        let mut crop_type = None;

        while let Some(mut field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            if name == CROP_TYPE_FIELD {
                crop_type = Some(field.text().await?);
                continue;
            }

            // Only parts carrying a filename are files.
            let Some(original_name) = field.file_name().map(str::to_string) else {
                tracing::debug!(field = %name, "Ignoring form field");
                continue;
            };

            if name != IMAGE_FIELD || image.is_some() {
                tracing::debug!(field = %name, file = %original_name, "Ignoring extra file");
                continue;
            }

            let mut staged = self.reserve(&name, &original_name);
            let mut file = tokio::fs::File::create(&staged.path).await?;
            while let Some(chunk) = field.chunk().await? {
                file.write_all(&chunk).await?;
                staged.size += chunk.len() as u64;
            }
            file.flush().await?;

            tracing::debug!(path = %staged.path.display(), size = staged.size, "Staged upload");
            image = Some(staged);
        }

        let image = image.ok_or(AppError::NoImage)?;
        Ok(PredictionRequest { crop_type, image })
    }

    /// Stages an in-memory file under a generated name.
    #[cfg(test)]
    pub(crate) async fn stage(
        &self,
        field_name: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> std::io::Result<UploadedFile> {
        let mut staged = self.reserve(field_name, original_name);
        tokio::fs::write(&staged.path, bytes).await?;
        staged.size = bytes.len() as u64;
        Ok(staged)
    }

    // The guard exists before the file does, so a failed write still cleans up.
    fn reserve(&self, field_name: &str, original_name: &str) -> UploadedFile {
        UploadedFile {
            field_name: field_name.to_string(),
            original_name: original_name.to_string(),
            path: self.dir.join(staged_name(field_name, original_name)),
            size: 0,
            retain: self.retain,
        }
    }
}

/// `<field>-<epoch millis>-<random below 1e9><.ext>`, where the extension is
/// taken from the client's filename and omitted when it has none.
pub fn staged_name(field_name: &str, original_name: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = rand::rng().random_range(0..SUFFIX_MAX);

    let extension = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();

    format!("{field_name}-{millis}-{suffix}{extension}")
}

#[derive(Debug)]
pub struct UploadedFile {
    pub field_name: String,
    pub original_name: String,
    pub path: PathBuf,
    pub size: u64,
    retain: bool,
}

impl Drop for UploadedFile {
    fn drop(&mut self) {
        if self.retain {
            return;
        }
        // Blocking, but a single unlink; callers rely on the file being gone once dropped.
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed staged upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Could not remove staged upload")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn staged_name_keeps_field_and_extension() {
        let name = staged_name("image", "tomato.photo.JPG");
        let parts: Vec<&str> = name.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "image");
        assert!(parts[1].parse::<i64>().is_ok());

        let (suffix, extension) = parts[2].split_once('.').unwrap();
        assert!(suffix.parse::<u32>().unwrap() < SUFFIX_MAX);
        assert_eq!(extension, "JPG");
    }

    #[test]
    fn staged_name_without_extension() {
        let name = staged_name("image", "capture");
        assert!(!name.contains('.'));
    }

    #[test]
    fn staged_names_do_not_collide() {
        let names: HashSet<String> = (0..200).map(|_| staged_name("image", "a.jpg")).collect();
        assert_eq!(names.len(), 200);
    }

    #[tokio::test]
    async fn dropping_staged_file_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), false);

        let staged = store.stage("image", "a.jpg", b"jpeg").await.unwrap();
        let path = staged.path.clone();
        assert!(path.exists());
        assert_eq!(staged.size, 4);

        drop(staged);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn retained_files_survive_drop() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), true);

        let path = store.stage("image", "a.png", b"png").await.unwrap().path.clone();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn ensure_dir_creates_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().join("nested/uploads"), false);

        store.ensure_dir().await.unwrap();
        assert!(store.dir().is_dir());
    }
}
