use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

pub mod classify;
pub mod language;
pub mod markdown;
pub mod object_loader;
pub mod walk;

pub use classify::classify;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Markdown,
    Code,
    Image,
    Video,
    Audio,
    Document,
    UnsupportedArchive,
    Unclassified,
}

impl FileKind {
    /// Kinds whose bytes go through the two-phase upload.
    pub fn is_upload(self) -> bool {
        matches!(
            self,
            FileKind::Image | FileKind::Video | FileKind::Audio | FileKind::Document
        )
    }

    /// Emoji used as the icon of the mirrored page.
    pub fn icon(self) -> &'static str {
        match self {
            FileKind::Markdown => "📝",
            FileKind::Code => "💻",
            FileKind::Image => "🖼️",
            FileKind::Video => "🎬",
            FileKind::Audio => "🎵",
            FileKind::Document => "📄",
            FileKind::UnsupportedArchive => "📦",
            FileKind::Unclassified => "📃",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FileKind::Markdown => "markdown",
            FileKind::Code => "code",
            FileKind::Image => "image",
            FileKind::Video => "video",
            FileKind::Audio => "audio",
            FileKind::Document => "document",
            FileKind::UnsupportedArchive => "archive",
            FileKind::Unclassified => "unclassified",
        })
    }
}

pub const FOLDER_ICON: &str = "📁";

/// A file found by the walker, described for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub path: PathBuf,
    /// Path below the base directory, normal components only.
    pub relative: PathBuf,
    pub extension: String,
    pub size: u64,
    pub kind: FileKind,
}

impl FileDescriptor {
    pub fn new(path: PathBuf, base: &Path, size: u64) -> Self {
        let relative = relative_path(&path, base);
        let extension = extension_key(&path);
        let kind = classify(&path);
        Self {
            path,
            relative,
            extension,
            size,
            kind,
        }
    }

    pub fn file_name(&self) -> String {
        self.relative
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Directory names from the base directory down to the file.
    pub fn folders(&self) -> Vec<String> {
        self.relative
            .parent()
            .map(|parent| {
                parent
                    .components()
                    .map(|component| component.as_os_str().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl std::fmt::Display for FileDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.relative.display())
    }
}

/// Lower-cased extension, or the lower-cased file name for files without one
/// (`Makefile`, `Dockerfile`). Dot files drop their leading dot, so
/// `.gitignore` is keyed as `gitignore`.
pub fn extension_key(path: &Path) -> String {
    match path.extension() {
        Some(extension) => extension.to_string_lossy().to_lowercase(),
        None => path
            .file_name()
            .map(|name| name.to_string_lossy().trim_start_matches('.').to_lowercase())
            .unwrap_or_default(),
    }
}

pub fn relative_path(path: &Path, base: &Path) -> PathBuf {
    let stripped = path.strip_prefix(base).unwrap_or(path);
    stripped
        .components()
        .filter(|component| matches!(component, Component::Normal(_)))
        .collect()
}
