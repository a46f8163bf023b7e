use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{ImageError, ImageHost, ImageKind, ImageUpload};

/// URL prefix the uploads directory is served under.
pub const PUBLIC_PREFIX: &str = "/uploads";

/// Stores images in the data directory's uploads folder.
pub struct LocalDiskHost {
    dir: PathBuf,
}

impl LocalDiskHost {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }
}

#[async_trait]
impl ImageHost for LocalDiskHost {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn store(&self, upload: ImageUpload, kind: ImageKind) -> Result<String, ImageError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let file_name = format!("{}.{}", uuid::Uuid::now_v7(), kind.extension());
        tokio::fs::write(self.dir.join(&file_name), &upload.bytes).await?;
        tracing::info!(
            "Stored upload {} ({} bytes) as {}",
            upload.file_name,
            upload.bytes.len(),
            file_name
        );
        Ok(format!("{PUBLIC_PREFIX}/{file_name}"))
    }
}

/// Only bare generated names are served; anything path-like is refused.
pub fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_')
}
