//! Image hosting. Uploads are validated here and handed to whichever
//! provider is configured; the API only ever forwards the resulting URL.

pub mod cloudinary;
pub mod local;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::{ImageProvider, ImagesConfig};

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// The upload itself is unacceptable (format, size).
    #[error("{0}")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image provider error: {0}")]
    Provider(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
}

impl ImageKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Gif => "gif",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Gif => "image/gif",
        }
    }

    fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" | "image/jpg" => Some(ImageKind::Jpeg),
            "image/png" => Some(ImageKind::Png),
            "image/gif" => Some(ImageKind::Gif),
            _ => None,
        }
    }

    fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ImageKind::Jpeg),
            "png" => Some(ImageKind::Png),
            "gif" => Some(ImageKind::Gif),
            _ => None,
        }
    }
}

/// A file received from the `image` multipart field.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl ImageUpload {
    /// Check format and size before anything is sent to a provider.
    pub fn validate(&self, max_bytes: usize) -> Result<ImageKind, ImageError> {
        if self.bytes.is_empty() {
            return Err(ImageError::Rejected("Uploaded file is empty".into()));
        }
        if self.bytes.len() > max_bytes {
            return Err(ImageError::Rejected(format!(
                "Image size should be less than {}",
                human_size(max_bytes)
            )));
        }

        self.content_type
            .as_deref()
            .and_then(ImageKind::from_mime)
            .or_else(|| ImageKind::from_file_name(&self.file_name))
            .ok_or_else(|| {
                ImageError::Rejected(
                    "Please select a valid image file (JPEG, PNG, or GIF)".into(),
                )
            })
    }
}

/// `5MB`, `1.5MB`, `512KB`, `100 bytes`.
fn human_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;
    let scaled = |unit: usize, suffix: &str| {
        if bytes % unit == 0 {
            format!("{}{}", bytes / unit, suffix)
        } else {
            format!("{:.1}{}", bytes as f64 / unit as f64, suffix)
        }
    };
    if bytes >= MB {
        scaled(MB, "MB")
    } else if bytes >= KB {
        scaled(KB, "KB")
    } else {
        format!("{bytes} bytes")
    }
}

#[async_trait]
pub trait ImageHost: Send + Sync {
    fn name(&self) -> &'static str;

    /// Store an already-validated image and return its public URL.
    async fn store(&self, upload: ImageUpload, kind: ImageKind) -> Result<String, ImageError>;
}

pub fn build_host(config: &ImagesConfig, uploads_dir: &Path) -> anyhow::Result<Arc<dyn ImageHost>> {
    match config.provider {
        ImageProvider::Local => Ok(Arc::new(local::LocalDiskHost::new(uploads_dir))),
        ImageProvider::Cloudinary => {
            let host = cloudinary::CloudinaryHost::new(config.cloudinary.clone())?;
            Ok(Arc::new(host))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, mime: Option<&str>, len: usize) -> ImageUpload {
        ImageUpload {
            file_name: name.to_string(),
            content_type: mime.map(str::to_string),
            bytes: Bytes::from(vec![7u8; len]),
        }
    }

    #[test]
    fn accepts_known_formats_by_mime() {
        assert_eq!(
            upload("a", Some("image/png"), 10).validate(100).unwrap(),
            ImageKind::Png
        );
        assert_eq!(
            upload("a", Some("image/jpg"), 10).validate(100).unwrap(),
            ImageKind::Jpeg
        );
    }

    #[test]
    fn falls_back_to_extension() {
        let kind = upload("Cat.JPEG", Some("application/octet-stream"), 10)
            .validate(100)
            .unwrap();
        assert_eq!(kind, ImageKind::Jpeg);
        assert_eq!(kind.extension(), "jpg");
    }

    #[test]
    fn rejects_other_formats() {
        let err = upload("doc.pdf", Some("application/pdf"), 10)
            .validate(100)
            .unwrap_err();
        assert!(matches!(err, ImageError::Rejected(_)));
    }

    #[test]
    fn rejects_oversized_and_empty_files() {
        let limit = 5 * 1024 * 1024;
        let err = upload("big.png", None, limit + 1).validate(limit).unwrap_err();
        assert_eq!(err.to_string(), "Image size should be less than 5MB");
        assert!(upload("empty.png", None, 0).validate(limit).is_err());
    }

    #[test]
    fn size_limit_message_keeps_sub_megabyte_precision() {
        let err = upload("big.png", None, 2048).validate(1024).unwrap_err();
        assert_eq!(err.to_string(), "Image size should be less than 1KB");

        assert_eq!(human_size(1536 * 1024), "1.5MB");
        assert_eq!(human_size(512 * 1024), "512KB");
        assert_eq!(human_size(100), "100 bytes");
    }

    #[test]
    fn build_host_defaults_to_local() {
        let tmp = tempfile::tempdir().unwrap();
        let host = build_host(&ImagesConfig::default(), tmp.path()).unwrap();
        assert_eq!(host.name(), "local");
    }

    #[test]
    fn cloudinary_requires_credentials() {
        let tmp = tempfile::tempdir().unwrap();
        let config = ImagesConfig {
            provider: ImageProvider::Cloudinary,
            ..ImagesConfig::default()
        };
        assert!(build_host(&config, tmp.path()).is_err());
    }
}
