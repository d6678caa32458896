//! Image files uploaded alongside recipes.
//!
//! Uploaded files live in a single directory and are referenced from recipes
//! as `uploads/<file name>`, which is also the public URL path they are served
//! under. Anything else in a recipe's image list (external URLs) is never
//! touched on disk.
//!
//! File operations are not transactional with the database. A crash between
//! writing a file and committing the row leaves an orphaned file behind.

use axum::body::Bytes;
use chrono::Utc;
use image::{ImageFormat, ImageReader};
use std::io::{self, Cursor, ErrorKind};
use std::path::{Component, Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Prefix of stored image paths and the URL path the directory is served under.
pub const PUBLIC_PREFIX: &str = "uploads";

/// Maximum number of files accepted per request.
pub const MAX_UPLOADS: usize = 5;

/// Maximum size of a single uploaded file (10MB).
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Allowed image formats for recipe images.
pub const ALLOWED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

// Retries when a timestamped name is already taken (same millisecond, same name).
const MAX_NAME_ATTEMPTS: usize = 100;

/// A file received in a multipart request, not yet written to disk.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub data: Bytes,
}

/// One entry of a recipe's image list as supplied by the client.
#[derive(Debug, Clone)]
pub enum ImageInput {
    Url(String),
    Upload(UploadedImage),
}

/// Image list after uploads were written.
#[derive(Debug, Default)]
pub struct StoredImages {
    /// Full image list in request order.
    pub paths: Vec<String>,
    /// The subset of `paths` written by this request.
    pub written: Vec<String>,
}

/// Check that `data` is an allowed image format, detected from its magic bytes.
///
/// Returns the content type on success (e.g., "image/png").
pub fn validate_image(data: &[u8]) -> Result<&'static str, String> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| format!("Failed to read image: {}", e))?;

    let format = reader
        .format()
        .ok_or_else(|| "Could not detect image format".to_string())?;

    if !ALLOWED_FORMATS.contains(&format) {
        return Err(format!(
            "Unsupported image format: {:?}. Allowed: JPEG, PNG, GIF, WebP",
            format
        ));
    }

    Ok(format.to_mime_type())
}

/// Reduce a client-supplied file name to a safe single path component.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct UploadDir {
    root: PathBuf,
}

impl UploadDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_exists(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    /// Map a stored image path to its file, if it names one in this directory.
    pub fn resolve(&self, image: &str) -> Option<PathBuf> {
        let name = image
            .trim_start_matches('/')
            .strip_prefix(PUBLIC_PREFIX)?
            .strip_prefix('/')?;

        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(file)), None) => Some(self.root.join(file)),
            _ => None,
        }
    }

    /// Write every upload in `images` and return the resulting image list.
    ///
    /// URLs pass through unchanged. If a write fails, files already written by
    /// this call are removed before the error is returned.
    pub async fn store(&self, images: Vec<ImageInput>) -> io::Result<StoredImages> {
        let mut stored = StoredImages::default();

        for image in images {
            match image {
                ImageInput::Url(url) => stored.paths.push(url),
                ImageInput::Upload(upload) => match self.write_upload(&upload).await {
                    Ok(path) => {
                        stored.written.push(path.clone());
                        stored.paths.push(path);
                    }
                    Err(e) => {
                        self.release_images(&stored.written).await;
                        return Err(e);
                    }
                },
            }
        }

        Ok(stored)
    }

    /// Delete the files behind `images`. Best effort: missing files and paths
    /// outside the upload directory are skipped, other failures are logged.
    ///
    /// Returns the number of files removed.
    pub async fn release_images(&self, images: &[String]) -> usize {
        let mut removed = 0;

        for image in images {
            let Some(path) = self.resolve(image) else {
                tracing::debug!(image = %image, "not an uploaded file, skipping");
                continue;
            };

            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Failed to remove image: {}", e);
                }
            }
        }

        removed
    }

    async fn write_upload(&self, upload: &UploadedImage) -> io::Result<String> {
        let name = sanitize_file_name(&upload.file_name);
        let stamp = Utc::now().timestamp_millis();

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let file_name = if attempt == 0 {
                format!("{stamp}-{name}")
            } else {
                format!("{stamp}-{attempt}-{name}")
            };
            let path = self.root.join(&file_name);

            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            };

            if let Err(e) = write_all(&mut file, &upload.data).await {
                drop(file);
                let _ = fs::remove_file(&path).await;
                return Err(e);
            }

            tracing::debug!(path = %path.display(), bytes = upload.data.len(), "stored upload");
            return Ok(format!("{PUBLIC_PREFIX}/{file_name}"));
        }

        Err(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("No free file name for upload {name}"),
        ))
    }
}

async fn write_all(file: &mut fs::File, data: &[u8]) -> io::Result<()> {
    file.write_all(data).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn upload(name: &str) -> ImageInput {
        ImageInput::Upload(UploadedImage {
            file_name: name.to_string(),
            data: Bytes::from_static(PNG_MAGIC),
        })
    }

    #[test]
    fn test_validate_png() {
        assert_eq!(validate_image(PNG_MAGIC), Ok("image/png"));
    }

    #[test]
    fn test_validate_invalid_format() {
        assert!(validate_image(b"not an image").is_err());
        assert!(validate_image(b"").is_err());
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("paella.jpg"), "paella.jpg");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\photos\\my cake.png"), "my_cake.png");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "image");
    }

    #[test]
    fn test_resolve_only_inside_upload_dir() {
        let dir = UploadDir::new("/srv/uploads");
        assert_eq!(
            dir.resolve("uploads/1-a.png"),
            Some(PathBuf::from("/srv/uploads/1-a.png"))
        );
        assert_eq!(
            dir.resolve("/uploads/1-a.png"),
            Some(PathBuf::from("/srv/uploads/1-a.png"))
        );
        assert_eq!(dir.resolve("uploads/../secret"), None);
        assert_eq!(dir.resolve("uploads/a/b.png"), None);
        assert_eq!(dir.resolve("uploadsx/a.png"), None);
        assert_eq!(dir.resolve("https://cdn.example.com/uploads/a.png"), None);
        assert_eq!(dir.resolve("/etc/passwd"), None);
    }

    #[tokio::test]
    async fn test_store_writes_uploads_and_keeps_order() {
        let tmp = TempDir::new().unwrap();
        let dir = UploadDir::new(tmp.path());

        let stored = dir
            .store(vec![
                ImageInput::Url("https://example.com/a.jpg".to_string()),
                upload("cake.png"),
                upload("cake.png"),
            ])
            .await
            .unwrap();

        assert_eq!(stored.paths.len(), 3);
        assert_eq!(stored.paths[0], "https://example.com/a.jpg");
        assert_eq!(stored.written, stored.paths[1..].to_vec());
        assert_ne!(stored.paths[1], stored.paths[2]);
        for path in &stored.written {
            assert!(path.starts_with("uploads/"));
            assert!(path.ends_with("-cake.png"));
            let file = dir.resolve(path).unwrap();
            assert_eq!(std::fs::read(file).unwrap(), PNG_MAGIC);
        }
    }

    #[tokio::test]
    async fn test_release_skips_missing_and_foreign_files() {
        let tmp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let foreign = outside.path().join("keep.png");
        std::fs::write(&foreign, PNG_MAGIC).unwrap();

        let dir = UploadDir::new(tmp.path());
        let stored = dir.store(vec![upload("a.png")]).await.unwrap();

        let mut images = stored.written.clone();
        images.push("uploads/never-written.png".to_string());
        images.push(foreign.display().to_string());
        images.push("https://example.com/b.png".to_string());

        assert_eq!(dir.release_images(&images).await, 1);
        assert!(dir.resolve(&stored.written[0]).unwrap().metadata().is_err());
        assert!(foreign.exists());

        // Releasing again is a no-op.
        assert_eq!(dir.release_images(&images).await, 0);
    }
}
