use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::AppError;

/// A multipart file written to the staging directory.
///
/// The file on disk lives exactly as long as this value: dropping it removes
/// the staged copy, whether the upload to the media store succeeded or not.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    pub file_name: String,
    pub content_type: Option<String>,
    pub size: u64,
}

impl StagedFile {
    /// Takes ownership of an existing file; it is removed when the value drops.
    pub fn adopt(path: PathBuf, file_name: String, content_type: Option<String>) -> Self {
        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        Self {
            path,
            file_name,
            content_type,
            size,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %err, "Failed to remove staged upload");
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, StagedFile>,
}

impl MultipartForm {
    /// Text field trimmed; blank values count as absent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub fn take_file(&mut self, name: &str) -> Option<StagedFile> {
        self.files.remove(name)
    }
}

/// Drains a multipart body, staging every part that carries a file name.
pub async fn read_multipart(
    mut multipart: Multipart,
    staging_dir: &Path,
) -> Result<MultipartForm, AppError> {
    tokio::fs::create_dir_all(staging_dir)
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?;

    let mut form = MultipartForm::default();
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match field.file_name().map(str::to_string) {
            Some(file_name) if !file_name.is_empty() => {
                let content_type = field.content_type().map(str::to_string);
                let path = staging_dir.join(format!("{}-{}", Uuid::new_v4(), sanitize(&file_name)));
                // Constructed before writing so a failed write still cleans up.
                let mut staged = StagedFile::adopt(path, file_name, content_type);
                let mut out = tokio::fs::File::create(staged.path())
                    .await
                    .map_err(|e| AppError::InternalServerError(e.into()))?;
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
                {
                    out.write_all(&chunk)
                        .await
                        .map_err(|e| AppError::InternalServerError(e.into()))?;
                    staged.size += chunk.len() as u64;
                }
                out.flush()
                    .await
                    .map_err(|e| AppError::InternalServerError(e.into()))?;

                if staged.size == 0 {
                    continue;
                }
                form.files.insert(name, staged);
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}

fn sanitize(file_name: &str) -> String {
    let cleaned: String = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
