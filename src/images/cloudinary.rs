use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::{ImageError, ImageHost, ImageKind, ImageUpload};
use crate::config::CloudinaryConfig;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Uploads are resized to fit within 1000x600 on the provider side.
const TRANSFORMATION: &str = "c_limit,w_1000,h_600";

pub struct CloudinaryHost {
    config: CloudinaryConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl CloudinaryHost {
    pub fn new(config: CloudinaryConfig) -> anyhow::Result<Self> {
        if config.cloud_name.is_empty() || config.api_key.is_empty() || config.api_secret.is_empty()
        {
            anyhow::bail!(
                "Cloudinary provider needs cloud_name, api_key and api_secret \
                 (or the CLOUDINARY_* environment variables)"
            );
        }
        Ok(Self {
            config,
            client: reqwest::Client::new(),
        })
    }

    fn upload_url(&self) -> String {
        format!("{}/{}/image/upload", API_BASE, self.config.cloud_name)
    }
}

/// Signature over the signed upload parameters: sorted `key=value` pairs
/// joined by `&`, followed by the API secret, SHA-256 hex encoded.
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl ImageHost for CloudinaryHost {
    fn name(&self) -> &'static str {
        "cloudinary"
    }

    async fn store(&self, upload: ImageUpload, kind: ImageKind) -> Result<String, ImageError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signed = [
            ("folder", self.config.folder.as_str()),
            ("timestamp", timestamp.as_str()),
            ("transformation", TRANSFORMATION),
        ];
        let signature = sign_params(&signed, &self.config.api_secret);

        let file = Part::bytes(upload.bytes.to_vec())
            .file_name(format!("upload.{}", kind.extension()))
            .mime_str(kind.mime())?;

        let mut form = Form::new()
            .part("file", file)
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (key, value) in signed {
            form = form.text(key.to_string(), value.to_string());
        }

        let response = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        let body: UploadResponse = response.json().await?;

        match (body.secure_url, body.error) {
            (Some(url), _) if status.is_success() => {
                tracing::info!("Uploaded {} to Cloudinary: {}", upload.file_name, url);
                Ok(url)
            }
            (_, Some(err)) => Err(ImageError::Provider(err.message)),
            _ => Err(ImageError::Provider(format!(
                "unexpected response (status {status})"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_order_independent() {
        let a = sign_params(&[("timestamp", "1"), ("folder", "blog")], "secret");
        let b = sign_params(&[("folder", "blog"), ("timestamp", "1")], "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn signature_matches_manual_digest() {
        let expected = hex::encode(Sha256::digest(b"folder=blog&timestamp=1secret"));
        assert_eq!(
            sign_params(&[("timestamp", "1"), ("folder", "blog")], "secret"),
            expected
        );
    }

    #[test]
    fn signature_depends_on_secret() {
        let params = [("timestamp", "1")];
        assert_ne!(sign_params(&params, "a"), sign_params(&params, "b"));
    }

    #[test]
    fn upload_url_uses_cloud_name() {
        let host = CloudinaryHost::new(CloudinaryConfig {
            cloud_name: "demo".into(),
            api_key: "k".into(),
            api_secret: "s".into(),
            folder: "quill".into(),
        })
        .unwrap();
        assert_eq!(
            host.upload_url(),
            "https://api.cloudinary.com/v1_1/demo/image/upload"
        );
    }
}
