use anyhow::Context;
use base64::{engine::general_purpose, Engine as _};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// URL prefix under which stored images are served
pub const UPLOADS_ROUTE: &str = "/uploads";

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Invalid image mime type: {0}")]
    InvalidMimeType(String),
    #[error("Invalid base64 image data")]
    InvalidEncoding(#[from] base64::DecodeError),
    #[error("Failed to store image: {0}")]
    Io(#[from] std::io::Error),
}

/// Decode a base64 payload, accepting an optional `data:...;base64,` prefix
pub fn decode_base64(data: &str) -> Result<Vec<u8>, ImageError> {
    let payload = match data.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, b64)| b64).unwrap_or(rest),
        None => data,
    };
    Ok(general_purpose::STANDARD.decode(payload.trim())?)
}

/// File extension for an `image/<subtype>` mime type; `+suffix` is dropped
pub fn extension_for(mime_type: &str) -> Result<String, ImageError> {
    let invalid = || ImageError::InvalidMimeType(mime_type.to_string());

    let (kind, subtype) = mime_type.trim().split_once('/').ok_or_else(invalid)?;
    if !kind.eq_ignore_ascii_case("image") {
        return Err(invalid());
    }

    let ext = subtype.split('+').next().unwrap_or_default().to_ascii_lowercase();
    let valid = !ext.is_empty()
        && ext
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
    if !valid || ext.starts_with('.') {
        return Err(invalid());
    }
    Ok(ext)
}

/// Content type to serve a stored file with, from its extension
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpeg" | "jpg" | "pjpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        "x-icon" | "vnd.microsoft.icon" | "ico" => "image/x-icon",
        _ => "application/octet-stream",
    }
}

/// Filesystem-backed store for uploaded images
#[derive(Clone, Debug)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    /// Open the store, creating the upload directory if needed
    pub fn new<P: AsRef<Path>>(dir: P) -> anyhow::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create upload directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Decode and write an image under a fresh random name
    ///
    /// Returns the retrieval path, e.g. `/uploads/<uuid>.png`.
    pub async fn save(&self, base64_data: &str, mime_type: &str) -> Result<String, ImageError> {
        let ext = extension_for(mime_type)?;
        let bytes = decode_base64(base64_data)?;

        let file_name = format!("{}.{}", Uuid::new_v4(), ext);
        tokio::fs::write(self.dir.join(&file_name), &bytes).await?;

        tracing::debug!("Stored image {} ({} bytes)", file_name, bytes.len());
        Ok(format!("{}/{}", UPLOADS_ROUTE, file_name))
    }

    /// Read a stored image; `None` when absent or not a plain file name
    pub async fn read(&self, file_name: &str) -> std::io::Result<Option<Vec<u8>>> {
        if !is_plain_file_name(file_name) {
            return Ok(None);
        }

        match tokio::fs::read(self.dir.join(file_name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(|c: char| matches!(c, '/' | '\\' | '\0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("image/jpeg").unwrap(), "jpeg");
        assert_eq!(extension_for("image/PNG").unwrap(), "png");
        assert_eq!(extension_for("image/svg+xml").unwrap(), "svg");
        assert!(extension_for("jpeg").is_err());
        assert!(extension_for("image/").is_err());
        assert!(extension_for("text/plain").is_err());
        assert!(extension_for("image/../../etc").is_err());
    }

    #[test]
    fn test_decode_base64() {
        assert_eq!(decode_base64("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(decode_base64("data:image/png;base64,aGVsbG8=").unwrap(), b"hello");
        assert!(matches!(
            decode_base64("not base64!!"),
            Err(ImageError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("abc.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("abc.svg"), "image/svg+xml");
        assert_eq!(content_type_for("abc"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_save_and_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path().join("uploads")).unwrap();
        assert!(store.dir().is_dir());

        let path = store.save("aGVsbG8=", "image/png").await.unwrap();
        let file_name = path
            .strip_prefix("/uploads/")
            .expect("path should live under /uploads");
        assert!(file_name.ends_with(".png"));

        let bytes = store.read(file_name).await.unwrap();
        assert_eq!(bytes.as_deref(), Some(&b"hello"[..]));
    }

    #[tokio::test]
    async fn test_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path()).unwrap();
        let a = store.save("aGVsbG8=", "image/gif").await.unwrap();
        let b = store.save("aGVsbG8=", "image/gif").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_read_missing_and_unsafe_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path().join("uploads")).unwrap();
        std::fs::write(dir.path().join("secret.txt"), b"nope").unwrap();

        assert!(store.read("missing.png").await.unwrap().is_none());
        assert!(store.read("../secret.txt").await.unwrap().is_none());
        assert!(store.read(".hidden").await.unwrap().is_none());
        assert!(store.read("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_rejects_bad_input_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path()).unwrap();

        assert!(matches!(
            store.save("aGVsbG8=", "nonsense").await,
            Err(ImageError::InvalidMimeType(_))
        ));
        assert!(matches!(
            store.save("%%%", "image/png").await,
            Err(ImageError::InvalidEncoding(_))
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
