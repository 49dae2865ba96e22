use std::path::PathBuf;

use crate::process_data::object_loader;

pub mod config;
pub mod deploy;
pub mod job;
pub mod process_data;
pub mod progress;
pub mod vcs;
pub mod warning;

#[cfg(test)]
mod tests;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
#[error("{context}: {detail}")]
pub struct Error {
    pub context: Box<ErrorContext>,
    pub detail: Box<ErrorDetail>,
}

#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub path: PathBuf,
    pub page_id: Option<String>,
}

impl ErrorContext {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            page_id: None,
        }
    }

    fn with_page(&self, page_id: impl Into<String>) -> Self {
        Self {
            path: self.path.clone(),
            page_id: Some(page_id.into()),
        }
    }

    fn error(&self, detail: ErrorDetail) -> Error {
        Error {
            context: Box::new(self.clone()),
            detail: Box::new(detail),
        }
    }
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.page_id {
            Some(id) => write!(f, "{id}({})", self.path.display()),
            None => write!(f, "{}", self.path.display()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorDetail {
    #[error("Failed to load: {0}")]
    Load(object_loader::Error),
    #[error("Failed to write file: {0}")]
    WriteFile(std::io::Error),
    #[error("Failed to upload: {0}")]
    Upload(BoxError),
    #[error("Failed to mirror: {0}")]
    Mirror(BoxError),
    #[error("Workspace error: {0}")]
    Workspace(BoxError),
}
