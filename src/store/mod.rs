//! Object-store lifecycle and uploads.
//!
//! The input bucket carries the four lifecycle prefixes
//! (`pending/`, `processing/`, `completed/`, `failed/`); processed artifacts
//! go to a separate CDN-served bucket. Both clients use path-style
//! addressing so S3-compatible endpoints work unchanged.

use crate::config::{S3InputSettings, StorageSettings};
use crate::error::{Result, TolkError};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::types::ObjectCannedAcl;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};

/// Video container extensions accepted from the pending prefix.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm"];

/// Concurrent uploads when pushing an HLS tree.
const UPLOAD_CONCURRENCY: usize = 4;

/// One listable pending video.
#[derive(Debug, Clone)]
pub struct PendingVideo {
    pub key: String,
    /// Basename of the key.
    pub name: String,
    pub size: i64,
    pub last_modified: Option<DateTime<Utc>>,
}

async fn build_client(
    endpoint: &str,
    region: &str,
    access_key_id: &str,
    secret_access_key: &str,
) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(access_key_id, secret_access_key, None, None, "tolk-config");

    let shared = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .credentials_provider(credentials)
        .load()
        .await;

    let mut builder = aws_sdk_s3::config::Builder::from(&shared).force_path_style(true);
    if !endpoint.is_empty() {
        builder = builder.endpoint_url(endpoint);
    }
    aws_sdk_s3::Client::from_conf(builder.build())
}

fn storage_error(operation: &str, err: impl std::fmt::Debug + std::fmt::Display) -> TolkError {
    TolkError::Storage(format!("{}: {}", operation, err))
}

/// Guess a content type from the file extension. HLS artifacts get their
/// exact types; everything else is best-effort.
pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("m3u8") => "application/vnd.apple.mpegurl",
        Some("ts") => "video/mp2t",
        Some("m4s") => "video/iso.segment",
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("json") => "application/json",
        Some("vtt") => "text/vtt",
        Some("wav") => "audio/wav",
        _ => "application/octet-stream",
    }
}

/// Join a CDN domain and key into a URL, normalizing slashes.
pub fn cdn_url(domain: &str, key: &str) -> String {
    let domain = domain.trim_end_matches('/');
    let key = key
        .split('/')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    format!("https://{}/{}", domain, key)
}

/// Lifecycle operations on the input bucket.
pub struct IngestStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    pending_prefix: String,
    processing_prefix: String,
    completed_prefix: String,
    failed_prefix: String,
}

impl IngestStore {
    pub async fn new(settings: &S3InputSettings) -> Result<Self> {
        if settings.bucket.is_empty() {
            return Err(TolkError::Config("s3_input.bucket is not set".to_string()));
        }
        let client = build_client(
            &settings.endpoint,
            &settings.region,
            &settings.access_key_id,
            &settings.secret_access_key,
        )
        .await;

        Ok(Self {
            client,
            bucket: settings.bucket.clone(),
            pending_prefix: settings.pending_prefix.clone(),
            processing_prefix: settings.processing_prefix.clone(),
            completed_prefix: settings.completed_prefix.clone(),
            failed_prefix: settings.failed_prefix.clone(),
        })
    }

    /// List videos under the pending prefix, keeping known container
    /// extensions and rejecting zero-byte entries.
    #[instrument(skip(self))]
    pub async fn list_pending(&self) -> Result<Vec<PendingVideo>> {
        let mut pending = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(&self.pending_prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| storage_error("list_objects_v2", DisplayErrorContext(e)))?;
            for object in page.contents() {
                let Some(key) = object.key() else { continue };
                let name = key.rsplit('/').next().unwrap_or(key).to_string();
                if name.is_empty() {
                    continue; // the prefix placeholder itself
                }
                let extension = name.rsplit('.').next().unwrap_or_default().to_lowercase();
                if !VIDEO_EXTENSIONS.contains(&extension.as_str()) {
                    continue;
                }
                let size = object.size().unwrap_or(0);
                if size == 0 {
                    warn!("Skipping zero-byte object {}", key);
                    continue;
                }
                pending.push(PendingVideo {
                    key: key.to_string(),
                    name,
                    size,
                    last_modified: object
                        .last_modified()
                        .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), 0)),
                });
            }
        }

        info!("{} pending video(s)", pending.len());
        Ok(pending)
    }

    async fn move_object(&self, key: &str, dest_prefix: &str) -> Result<String> {
        let basename = key.rsplit('/').next().unwrap_or(key);
        let dest_key = format!("{}{}", dest_prefix, basename);

        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(format!("{}/{}", self.bucket, key))
            .key(&dest_key)
            .send()
            .await
            .map_err(|e| storage_error("copy_object", DisplayErrorContext(e)))?;

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| storage_error("delete_object", DisplayErrorContext(e)))?;

        Ok(dest_key)
    }

    /// Move a key to the processing prefix. Failure is non-fatal: the
    /// original key is returned so the video is still processed.
    pub async fn move_to_processing(&self, key: &str) -> String {
        match self.move_object(key, &self.processing_prefix).await {
            Ok(new_key) => new_key,
            Err(e) => {
                warn!("Could not move {} to processing (continuing): {}", key, e);
                key.to_string()
            }
        }
    }

    /// Move a key to the completed prefix. Failures are logged, never raised.
    pub async fn move_to_completed(&self, key: &str) {
        match self.move_object(key, &self.completed_prefix).await {
            Ok(new_key) => info!("Moved {} -> {}", key, new_key),
            Err(e) => warn!("Could not move {} to completed: {}", key, e),
        }
    }

    /// Move a key to the failed prefix. Failures are logged, never raised.
    pub async fn move_to_failed(&self, key: &str) {
        match self.move_object(key, &self.failed_prefix).await {
            Ok(new_key) => info!("Moved {} -> {}", key, new_key),
            Err(e) => warn!("Could not move {} to failed: {}", key, e),
        }
    }

    /// Stream an object to `local_dir`, returning its local path.
    #[instrument(skip(self, local_dir))]
    pub async fn download(&self, key: &str, local_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(local_dir)?;
        let basename = key.rsplit('/').next().unwrap_or(key);
        let local_path = local_dir.join(basename);

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| storage_error("get_object", DisplayErrorContext(e)))?;

        let mut body = response.body;
        let mut file = tokio::fs::File::create(&local_path).await?;
        let mut downloaded = 0u64;
        while let Some(bytes) = body
            .try_next()
            .await
            .map_err(|e| storage_error("get_object body", e))?
        {
            downloaded += bytes.len() as u64;
            file.write_all(&bytes).await?;
        }
        file.flush().await?;

        info!("Downloaded {} ({} bytes)", key, downloaded);
        Ok(local_path)
    }
}

/// Upload operations on the CDN-served output bucket.
pub struct OutputStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    cdn_domain: String,
}

impl OutputStore {
    pub async fn new(settings: &StorageSettings) -> Result<Self> {
        if settings.bucket.is_empty() {
            return Err(TolkError::Config("storage.bucket is not set".to_string()));
        }
        let client = build_client(
            &settings.endpoint,
            &settings.region,
            &settings.access_key_id,
            &settings.secret_access_key,
        )
        .await;

        Ok(Self {
            client,
            bucket: settings.bucket.clone(),
            cdn_domain: settings.cdn_domain.clone(),
        })
    }

    /// The CDN URL for a key in this bucket.
    pub fn url_for(&self, key: &str) -> String {
        cdn_url(&self.cdn_domain, key)
    }

    async fn put_file(&self, local_path: &Path, key: &str) -> Result<()> {
        let body = aws_sdk_s3::primitives::ByteStream::from_path(local_path)
            .await
            .map_err(|e| storage_error("read upload body", e))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type_for(local_path))
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| storage_error("put_object", DisplayErrorContext(e)))?;

        Ok(())
    }

    /// Upload one file as `prefix/target_name`, returning its CDN URL.
    #[instrument(skip(self, local_path))]
    pub async fn upload_file(
        &self,
        local_path: &Path,
        prefix: &str,
        target_name: &str,
    ) -> Result<String> {
        let key = format!("{}/{}", prefix.trim_matches('/'), target_name);
        self.put_file(local_path, &key).await?;
        info!("Uploaded {}", key);
        Ok(self.url_for(&key))
    }

    /// Recursively upload all regular files under `local_dir` to
    /// `prefix/base_name/`, returning the CDN URL of `entry_file`.
    #[instrument(skip(self, local_dir))]
    pub async fn upload_tree(
        &self,
        local_dir: &Path,
        prefix: &str,
        base_name: &str,
        entry_file: &str,
    ) -> Result<String> {
        let files = collect_files(local_dir)?;
        let root = format!("{}/{}", prefix.trim_matches('/'), base_name);

        info!("Uploading {} file(s) under {}", files.len(), root);

        stream::iter(files.into_iter().map(|path| {
            let root = root.clone();
            async move {
                let relative = path
                    .strip_prefix(local_dir)
                    .map_err(|e| storage_error("relative path", e))?
                    .to_string_lossy()
                    .replace('\\', "/");
                let key = format!("{}/{}", root, relative);
                self.put_file(&path, &key).await
            }
        }))
        .buffer_unordered(UPLOAD_CONCURRENCY)
        .try_collect::<Vec<()>>()
        .await?;

        Ok(self.url_for(&format!("{}/{}", root, entry_file)))
    }
}

fn collect_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in std::fs::read_dir(&current)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.is_file() {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cdn_url_normalizes_slashes() {
        assert_eq!(
            cdn_url("cdn.example.com", "videos//abc/master.m3u8"),
            "https://cdn.example.com/videos/abc/master.m3u8"
        );
        assert_eq!(
            cdn_url("cdn.example.com/", "/videos/abc.mp4"),
            "https://cdn.example.com/videos/abc.mp4"
        );
    }

    #[test]
    fn test_content_types() {
        assert_eq!(
            content_type_for(Path::new("a/master.m3u8")),
            "application/vnd.apple.mpegurl"
        );
        assert_eq!(content_type_for(Path::new("seg.ts")), "video/mp2t");
        assert_eq!(content_type_for(Path::new("seg.m4s")), "video/iso.segment");
        assert_eq!(content_type_for(Path::new("v.MP4")), "video/mp4");
        assert_eq!(
            content_type_for(Path::new("unknown.bin")),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_collect_files_recurses() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.m3u8"), "x").unwrap();
        std::fs::write(dir.path().join("sub/b.m4s"), "y").unwrap();

        let files = collect_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
    }
}
