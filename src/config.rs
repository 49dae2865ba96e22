use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use url::Url;

use crate::{
    deploy::notion, job::PullSource, process_data::object_loader::DEFAULT_MAX_UPLOAD_BYTES,
};

fn default_base_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_roots() -> Vec<PathBuf> {
    vec![PathBuf::from(".")]
}

fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_base_url() -> Url {
    Url::parse(notion::DEFAULT_BASE_URL).expect("default base url is valid")
}

fn default_version() -> String {
    notion::DEFAULT_VERSION.to_owned()
}

fn default_head() -> String {
    "HEAD".to_owned()
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: Url,
    #[serde(default = "default_version")]
    pub version: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            version: default_version(),
        }
    }
}

/// Restricts a push to files changed between two revisions.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct IncrementalConfig {
    pub base: String,
    #[serde(default = "default_head")]
    pub head: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    /// Page every mirrored path hangs below.
    pub root_page_id: String,
    /// Directory relative paths (and page titles) are computed from.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    /// Directories to walk, relative to `base_dir`.
    #[serde(default = "default_roots")]
    pub roots: Vec<PathBuf>,
    /// Substring patterns matched against paths relative to `base_dir`; a
    /// path containing any of them is skipped.
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    /// Where unsupported archives can be downloaded from; the relative path
    /// is joined onto it, so it should end with `/`.
    #[serde(default)]
    pub repository_url: Option<Url>,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub incremental: Option<IncrementalConfig>,
    /// Local file path (relative to `base_dir`) to a page id, or to
    /// `{ title: .. }` naming a child page of `root_page_id`.
    #[serde(default)]
    pub pull: IndexMap<PathBuf, PullSource>,
}

impl Config {
    pub fn validate(&self) -> Result<(), String> {
        if self.root_page_id.trim().is_empty() {
            return Err("root_page_id must not be empty".into());
        }
        if self.roots.is_empty() {
            return Err("at least one root is required".into());
        }
        if self.max_upload_bytes == 0 {
            return Err("max_upload_bytes must be positive".into());
        }
        if let Some(url) = &self.repository_url {
            if url.cannot_be_a_base() {
                return Err(format!("repository_url {url} cannot be a base url"));
            }
        }
        if let Some((path, _)) = self
            .pull
            .iter()
            .find(|(path, source)| path.as_os_str().is_empty() || source.is_blank())
        {
            return Err(format!(
                "pull mapping {} needs both a path and a page id or title",
                path.display()
            ));
        }
        Ok(())
    }

    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.base_dir.join(relative)
    }
}
