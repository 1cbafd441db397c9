//! Object storage for avatars, cover images, thumbnails and video files.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{config::Config, utils::upload::StagedFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    fn resource_type(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMedia {
    pub url: String,
    pub public_id: String,
    /// Seconds; only reported for video uploads.
    pub duration: Option<f64>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, file: &StagedFile, kind: MediaKind) -> anyhow::Result<StoredMedia>;

    async fn destroy(&self, public_id: &str, kind: MediaKind) -> anyhow::Result<()>;
}

/// Picks the cloud store when credentials are configured, the disk store otherwise.
pub fn media_store_from_config(config: &Config) -> Arc<dyn MediaStore> {
    match &config.cloudinary {
        Some(cloud) => Arc::new(CloudinaryStore::new(
            cloud.cloud_name.clone(),
            cloud.api_key.clone(),
            cloud.api_secret.clone(),
        )),
        None => Arc::new(DiskMediaStore::new(
            config.media_dir.clone(),
            config.media_public_url.clone(),
        )),
    }
}

pub struct CloudinaryStore {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CloudinaryUpload {
    secure_url: String,
    public_id: String,
    #[serde(default)]
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CloudinaryDestroy {
    result: String,
}

impl CloudinaryStore {
    pub fn new(cloud_name: String, api_key: String, api_secret: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            cloud_name,
            api_key,
            api_secret,
            base_url: "https://api.cloudinary.com/v1_1".to_string(),
        }
    }

    fn endpoint(&self, kind: MediaKind, action: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_url,
            self.cloud_name,
            kind.resource_type(),
            action
        )
    }

    /// Signs the sorted `key=value` pairs joined by `&`, followed by the secret.
    fn sign(&self, params: &[(&str, String)]) -> String {
        let mut sorted: Vec<_> = params.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        let joined = sorted
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("&");
        let mut hasher = Sha256::new();
        hasher.update(joined.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl MediaStore for CloudinaryStore {
    async fn upload(&self, file: &StagedFile, kind: MediaKind) -> anyhow::Result<StoredMedia> {
        let bytes = tokio::fs::read(file.path())
            .await
            .with_context(|| format!("reading staged upload {}", file.path().display()))?;
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&[("timestamp", timestamp.clone())]);

        let mut part = reqwest::multipart::Part::bytes(bytes).file_name(file.file_name.clone());
        if let Some(content_type) = &file.content_type {
            part = part.mime_str(content_type)?;
        }
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let response = self
            .client
            .post(self.endpoint(kind, "upload"))
            .multipart(form)
            .send()
            .await
            .context("media upload request failed")?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("media upload rejected with {}: {}", status, body));
        }
        let uploaded: CloudinaryUpload = response.json().await?;

        tracing::debug!(public_id = %uploaded.public_id, "Uploaded media");
        Ok(StoredMedia {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
            duration: uploaded.duration,
        })
    }

    async fn destroy(&self, public_id: &str, kind: MediaKind) -> anyhow::Result<()> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&[
            ("public_id", public_id.to_string()),
            ("timestamp", timestamp.clone()),
        ]);
        let params = [
            ("public_id", public_id.to_string()),
            ("api_key", self.api_key.clone()),
            ("timestamp", timestamp),
            ("signature", signature),
            ("signature_algorithm", "sha256".to_string()),
        ];

        let response = self
            .client
            .post(self.endpoint(kind, "destroy"))
            .form(&params)
            .send()
            .await
            .context("media destroy request failed")?;
        if !response.status().is_success() {
            return Err(anyhow!("media destroy rejected with {}", response.status()));
        }
        let outcome: CloudinaryDestroy = response.json().await?;
        if outcome.result != "ok" && outcome.result != "not found" {
            return Err(anyhow!("media destroy returned {}", outcome.result));
        }
        Ok(())
    }
}

/// Stores media as plain files served from `MEDIA_DIR`.
pub struct DiskMediaStore {
    root: PathBuf,
    public_url: String,
}

impl DiskMediaStore {
    pub fn new(root: PathBuf, public_url: String) -> Self {
        Self {
            root,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    fn locate(&self, public_id: &str) -> anyhow::Result<PathBuf> {
        if public_id.is_empty() || public_id.contains(['/', '\\']) || public_id.starts_with('.') {
            return Err(anyhow!("invalid media id {:?}", public_id));
        }
        Ok(self.root.join(public_id))
    }
}

#[async_trait]
impl MediaStore for DiskMediaStore {
    async fn upload(&self, file: &StagedFile, kind: MediaKind) -> anyhow::Result<StoredMedia> {
        tokio::fs::create_dir_all(&self.root).await?;
        let extension = std::path::Path::new(&file.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default();
        let public_id = format!("{}-{}{}", kind.resource_type(), Uuid::new_v4(), extension);
        let target = self.locate(&public_id)?;
        tokio::fs::copy(file.path(), &target)
            .await
            .with_context(|| format!("copying upload to {}", target.display()))?;

        Ok(StoredMedia {
            url: format!("{}/{}", self.public_url, public_id),
            public_id,
            duration: match kind {
                MediaKind::Video => Some(0.0),
                MediaKind::Image => None,
            },
        })
    }

    async fn destroy(&self, public_id: &str, _kind: MediaKind) -> anyhow::Result<()> {
        let target = self.locate(public_id)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staged(dir: &std::path::Path, name: &str, bytes: &[u8]) -> StagedFile {
        let path = dir.join(format!("staged-{}", name));
        std::fs::write(&path, bytes).unwrap();
        StagedFile::adopt(path, name.to_string(), None)
    }

    #[tokio::test]
    async fn disk_store_copies_and_destroys() {
        let staging = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let store = DiskMediaStore::new(root.path().to_path_buf(), "http://cdn.test/media/".into());

        let file = staged(staging.path(), "face.PNG", b"png-bytes");
        let stored = store.upload(&file, MediaKind::Image).await.unwrap();
        assert!(stored.url.starts_with("http://cdn.test/media/image-"));
        assert!(stored.public_id.ends_with(".png"));
        assert_eq!(stored.duration, None);
        let on_disk = root.path().join(&stored.public_id);
        assert_eq!(std::fs::read(&on_disk).unwrap(), b"png-bytes");

        store.destroy(&stored.public_id, MediaKind::Image).await.unwrap();
        assert!(!on_disk.exists());
        // Second destroy is a no-op.
        store.destroy(&stored.public_id, MediaKind::Image).await.unwrap();
    }

    #[tokio::test]
    async fn disk_store_rejects_path_like_ids() {
        let root = tempfile::tempdir().unwrap();
        let store = DiskMediaStore::new(root.path().to_path_buf(), "http://x".into());
        assert!(store.destroy("../etc/passwd", MediaKind::Image).await.is_err());
        assert!(store.destroy("", MediaKind::Image).await.is_err());
    }

    #[test]
    fn cloudinary_signature_sorts_parameters() {
        let store = CloudinaryStore::new("demo".into(), "key".into(), "secret".into());
        let a = store.sign(&[("timestamp", "1".into()), ("public_id", "p".into())]);
        let b = store.sign(&[("public_id", "p".into()), ("timestamp", "1".into())]);
        assert_eq!(a, b);

        let mut hasher = Sha256::new();
        hasher.update(b"public_id=p&timestamp=1secret");
        assert_eq!(a, hex::encode(hasher.finalize()));
        assert_eq!(
            store.endpoint(MediaKind::Video, "upload"),
            "https://api.cloudinary.com/v1_1/demo/video/upload"
        );
    }

    #[test]
    fn mock_media_store_is_send_sync() {
        fn check_send_sync<T: Send + Sync>() {}
        check_send_sync::<MockMediaStore>();
    }
}
