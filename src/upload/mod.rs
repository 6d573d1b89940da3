//! Product image uploads.
//!
//! Only the multipart field [`IMAGE_FIELD`] carries a file. Files whose MIME
//! type is not an accepted image type are skipped without failing the request.

use axum::extract::multipart::Field;
use chrono::{SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::error::{AppError, Result};

/// Name of the one multipart field that may hold a file
pub const IMAGE_FIELD: &str = "image";

/// MIME types the upload filter lets through
pub const ALLOWED_IMAGE_TYPES: [&str; 3] = ["image/png", "image/jpg", "image/jpeg"];

/// URL prefix the images directory is served under
pub const IMAGES_URL_PREFIX: &str = "/images";

/// An accepted upload, already written to disk
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub stored_name: String,
    pub content_type: String,
    pub path: PathBuf,
    pub size: u64,
}

impl UploadedFile {
    /// Public URL of the stored file
    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            IMAGES_URL_PREFIX,
            urlencoding::encode(&self.stored_name)
        )
    }
}

/// Whether the upload filter accepts `content_type`
pub fn accepts(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ALLOWED_IMAGE_TYPES.contains(&ct.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Image directory on disk
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
    max_size: u64,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>, max_size: u64) -> Self {
        Self {
            dir: dir.into(),
            max_size,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the directory if it does not exist yet
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Run `field` through the filter and stream it to disk.
    ///
    /// Returns `Ok(None)` when the filter rejects the file type.
    pub async fn store_field(&self, mut field: Field<'_>) -> Result<Option<UploadedFile>> {
        let content_type = field.content_type().map(str::to_string);
        let original_name = field.file_name().unwrap_or("image").to_string();

        if !accepts(content_type.as_deref()) {
            info!(
                "Skipping upload '{}' with type {:?}",
                original_name, content_type
            );
            return Ok(None);
        }

        let safe_name = sanitize_filename(&original_name);
        if safe_name.is_empty() {
            return Err(AppError::BadRequest("Invalid filename".to_string()));
        }

        self.ensure_dir().await?;

        let stored_name = format!(
            "{}-{}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            safe_name
        );
        let temp_path = self.dir.join(format!(".upload_{}", uuid::Uuid::new_v4()));
        let final_path = self.dir.join(&stored_name);

        let mut file = tokio::fs::File::create(&temp_path).await?;
        let mut bytes_written: u64 = 0;

        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    drop(file);
                    let _ = tokio::fs::remove_file(&temp_path).await;
                    return Err(AppError::BadRequest(format!(
                        "Failed to read upload chunk: {}",
                        e
                    )));
                }
            };

            bytes_written += chunk.len() as u64;
            if bytes_written > self.max_size {
                drop(file);
                let _ = tokio::fs::remove_file(&temp_path).await;
                return Err(AppError::BadRequest(format!(
                    "Image too large. Maximum size: {} MB",
                    self.max_size / 1024 / 1024
                )));
            }

            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        drop(file);

        if let Err(e) = tokio::fs::rename(&temp_path, &final_path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        info!("Stored image {} ({} bytes)", stored_name, bytes_written);

        Ok(Some(UploadedFile {
            original_name,
            stored_name,
            content_type: content_type.unwrap_or_default(),
            path: final_path,
            size: bytes_written,
        }))
    }

    /// Delete the file behind an image URL, logging instead of failing
    pub async fn remove(&self, image_url: &str) {
        let Some(path) = self.path_for_url(image_url) else {
            warn!("Not an image URL: {}", image_url);
            return;
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => info!("Deleted image {}", path.display()),
            Err(e) => warn!("Failed to delete image {}: {}", path.display(), e),
        }
    }

    fn path_for_url(&self, image_url: &str) -> Option<PathBuf> {
        let encoded = image_url
            .strip_prefix(IMAGES_URL_PREFIX)?
            .strip_prefix('/')?;
        let name = urlencoding::decode(encoded).ok()?;
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.starts_with('.') {
            return None;
        }
        Some(self.dir.join(name.as_ref()))
    }
}

/// Make a client-supplied filename safe to use as a single path component
pub fn sanitize_filename(name: &str) -> String {
    // Browsers on some platforms send the full client path
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    let name = name.replace(['\0', ':', '*', '?', '"', '<', '>', '|'], "_");
    let name = name.trim_start_matches('.');

    name.chars().take(200).collect()
}
