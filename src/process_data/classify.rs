//! Extension based file classification.
//!
//! One ordered table of (extensions, kind) pairs; the first matching row wins,
//! so the order of [`TABLE`] is the classification priority.

use std::path::Path;

use super::{FileKind, extension_key};

const MARKDOWN: &[&str] = &["md", "markdown", "mdx"];

const CODE: &[&str] = &[
    "rs", "py", "pyi", "js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "go", "java", "kt", "kts",
    "scala", "c", "h", "cpp", "cc", "cxx", "hpp", "hh", "cs", "fs", "rb", "php", "swift", "m",
    "dart", "lua", "pl", "pm", "r", "jl", "ex", "exs", "erl", "hs", "ml", "clj", "cljs", "scm",
    "rkt", "elm", "nix", "sh", "bash", "zsh", "ps1", "psm1", "sql", "html", "htm", "css", "scss",
    "sass", "less", "vue", "svelte", "json", "jsonc", "json5", "yaml", "yml", "toml", "xml",
    "xsd", "graphql", "gql", "proto", "tf", "hcl", "sol", "tex", "diff", "patch", "mk",
    "makefile", "dockerfile", "txt", "text", "csv", "ini", "cfg", "conf", "env", "lock",
    "gitignore", "editorconfig",
];

const IMAGE: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "webp", "bmp", "ico", "tif", "tiff", "heic",
];

const VIDEO: &[&str] = &["mp4", "mov", "webm", "avi", "mkv", "m4v", "wmv"];

const AUDIO: &[&str] = &["mp3", "wav", "ogg", "m4a", "flac", "aac", "wma"];

const DOCUMENT: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "odp", "rtf", "epub",
];

const ARCHIVE: &[&str] = &[
    "zip", "tar", "gz", "tgz", "bz2", "xz", "7z", "rar", "jar", "zst",
];

static TABLE: &[(&[&str], FileKind)] = &[
    (MARKDOWN, FileKind::Markdown),
    (CODE, FileKind::Code),
    (IMAGE, FileKind::Image),
    (VIDEO, FileKind::Video),
    (AUDIO, FileKind::Audio),
    (DOCUMENT, FileKind::Document),
    (ARCHIVE, FileKind::UnsupportedArchive),
];

pub fn classify(path: &Path) -> FileKind {
    classify_key(&extension_key(path))
}

pub fn classify_key(key: &str) -> FileKind {
    TABLE
        .iter()
        .find(|(extensions, _)| extensions.contains(&key))
        .map(|(_, kind)| *kind)
        .unwrap_or(FileKind::Unclassified)
}
