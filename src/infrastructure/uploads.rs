use crate::core::errors::GeoLensError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// A validated, decoded upload that has not been written yet.
pub struct PendingImage {
    pub name: String,
    pub image: DynamicImage,
    /// Exact bytes that `store` writes.
    pub encoded: Vec<u8>,
}

/// Writes accepted uploads into one flat directory that is also served at `/uploads`.
#[derive(Clone, Debug)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        UploadStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> Result<(), GeoLensError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| GeoLensError::UploadError(format!("Cannot create {}: {}", self.dir.display(), e)))
    }

    pub fn url_for(name: &str) -> String {
        format!("/uploads/{}", name)
    }

    /// Validates a multipart file upload and picks a sanitised, uniquified name for it.
    pub async fn prepare_file(&self, original_name: &str, bytes: Vec<u8>) -> Result<PendingImage, GeoLensError> {
        if original_name.trim().is_empty() {
            return Err(GeoLensError::EmptyFilename);
        }
        let safe_name = sanitize_filename(original_name).ok_or(GeoLensError::EmptyFilename)?;
        let extension = Path::new(&safe_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(GeoLensError::UnsupportedImageFormat(extension));
        }

        let (image, encoded) = run_blocking(move || {
            let image = image::load_from_memory(&bytes).map_err(|e| GeoLensError::InvalidImage(e.to_string()))?;
            Ok((image, bytes))
        })
        .await?;
        Ok(PendingImage {
            name: format!("{}_{}", short_token(), safe_name),
            image,
            encoded,
        })
    }

    /// Decodes a base64 payload (optionally a `data:` URL) and re-encodes it as PNG.
    pub async fn prepare_base64(&self, payload: &str) -> Result<PendingImage, GeoLensError> {
        let bytes = decode_base64_payload(payload)?;
        let (image, encoded) = run_blocking(move || {
            let image = image::load_from_memory(&bytes).map_err(|e| GeoLensError::InvalidImage(e.to_string()))?;
            let mut png = Vec::new();
            image
                .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
                .map_err(|e| GeoLensError::UploadError(format!("PNG encoding failed: {}", e)))?;
            Ok((image, png))
        })
        .await?;
        Ok(PendingImage {
            name: format!("upload_{}_{}.png", Utc::now().format("%Y%m%d_%H%M%S"), short_token()),
            image,
            encoded,
        })
    }

    pub async fn store(&self, name: &str, bytes: &[u8]) -> Result<(), GeoLensError> {
        let path = self.dir.join(name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| GeoLensError::UploadError(format!("Cannot write {}: {}", path.display(), e)))
    }

    pub async fn remove(&self, name: &str) -> Result<(), GeoLensError> {
        let path = self.dir.join(name);
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| GeoLensError::UploadError(format!("Cannot remove {}: {}", path.display(), e)))
    }
}

/// Image decoding and encoding are CPU bound; keep them off the async workers.
async fn run_blocking<T, F>(job: F) -> Result<T, GeoLensError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, GeoLensError> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| GeoLensError::UploadError(format!("Image task failed: {}", e)))?
}

fn short_token() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Keeps only `[A-Za-z0-9._-]`, turns whitespace into `_`, drops any directory part
/// and leading dots. Returns `None` if nothing usable is left.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').trim_matches('_').to_string();
    if cleaned.is_empty() { None } else { Some(cleaned) }
}

pub fn decode_base64_payload(payload: &str) -> Result<Vec<u8>, GeoLensError> {
    let data = match payload.split_once(',') {
        Some((_, data)) => data,
        None => payload,
    };
    let data = data.trim();
    if data.is_empty() {
        return Err(GeoLensError::MissingImage);
    }
    STANDARD
        .decode(data)
        .map_err(|e| GeoLensError::InvalidImage(format!("Invalid base64 payload: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn png_bytes() -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([0, 128, 255])));
        let mut buf = Vec::new();
        image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    #[test]
    fn sanitize_strips_paths_and_odd_characters() {
        assert_eq!(sanitize_filename("../../etc/passwd"), Some("passwd".to_string()));
        assert_eq!(sanitize_filename("C:\\images\\my field.png"), Some("my_field.png".to_string()));
        assert_eq!(sanitize_filename(".hidden.jpg"), Some("hidden.jpg".to_string()));
        assert_eq!(sanitize_filename("@@@"), None);
    }

    #[test]
    fn base64_payload_accepts_data_urls() {
        let encoded = STANDARD.encode(b"hello");
        assert_eq!(decode_base64_payload(&encoded).unwrap(), b"hello");
        let data_url = format!("data:image/png;base64,{}", encoded);
        assert_eq!(decode_base64_payload(&data_url).unwrap(), b"hello");
        assert!(matches!(decode_base64_payload("data:image/png;base64,"), Err(GeoLensError::MissingImage)));
        assert!(matches!(decode_base64_payload("***"), Err(GeoLensError::InvalidImage(_))));
    }

    #[tokio::test]
    async fn prepare_file_validates_extension_and_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        let pending = store.prepare_file("field.png", png_bytes()).await.unwrap();
        assert!(pending.name.ends_with("_field.png"));
        assert_eq!(pending.image.width(), 4);
        assert_eq!(pending.encoded, png_bytes());
        // Nothing touches the disk until the caller stores it.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        store.store(&pending.name, &pending.encoded).await.unwrap();
        assert!(dir.path().join(&pending.name).exists());
        store.remove(&pending.name).await.unwrap();
        assert!(!dir.path().join(&pending.name).exists());

        assert!(matches!(
            store.prepare_file("notes.txt", b"text".to_vec()).await,
            Err(GeoLensError::UnsupportedImageFormat(_))
        ));
        assert!(matches!(
            store.prepare_file("broken.png", b"not an image".to_vec()).await,
            Err(GeoLensError::InvalidImage(_))
        ));
        assert!(matches!(store.prepare_file("", Vec::new()).await, Err(GeoLensError::EmptyFilename)));
    }

    #[tokio::test]
    async fn prepare_base64_reencodes_as_png() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());
        let pending = store.prepare_base64(&STANDARD.encode(png_bytes())).await.unwrap();
        assert!(pending.name.starts_with("upload_") && pending.name.ends_with(".png"));
        assert_eq!(image::guess_format(&pending.encoded).unwrap(), ImageFormat::Png);
    }
}
