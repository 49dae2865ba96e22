use std::path::{Path, PathBuf};

use tracing::trace;

use super::FileDescriptor;

/// Default upload ceiling: the workspace's single-part upload limit.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read local file ({path}): {error}")]
    ReadLocal { error: std::io::Error, path: PathBuf },
}

/// Bytes of a file staged for upload.
pub struct Object {
    pub body: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("size", &self.body.len())
            .finish()
    }
}

/// Best-effort MIME type from the file extension.
pub fn content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_owned()
}

pub fn exceeds_limit(file: &FileDescriptor, max_bytes: u64) -> bool {
    file.size > max_bytes
}

pub async fn load(file: &FileDescriptor) -> Result<Object, Error> {
    let body = tokio::fs::read(&file.path)
        .await
        .map_err(|error| Error::ReadLocal {
            error,
            path: file.path.clone(),
        })?;
    let object = Object {
        body,
        filename: file.file_name(),
        content_type: content_type(&file.path),
    };
    trace!(?object, "loaded object");
    Ok(object)
}

pub async fn load_text(path: &Path) -> Result<Option<String>, Error> {
    let body = tokio::fs::read(path)
        .await
        .map_err(|error| Error::ReadLocal {
            error,
            path: path.to_owned(),
        })?;
    Ok(String::from_utf8(body).ok())
}
