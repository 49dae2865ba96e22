//! Pages back to local markdown files.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::{
    Error, ErrorContext, ErrorDetail,
    process_data::{
        markdown::{RemoteContent, encode},
        object_loader,
    },
    progress::{EntryStatus, NullReporter, ProgressReporter},
};

use super::storage::workspace::{self, Client};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    Unchanged,
    Written { bytes: usize },
}

/// How a pull mapping names its page.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum PullSource {
    Page(String),
    /// A child page of the root page, looked up by title.
    Titled { title: String },
}

impl PullSource {
    pub fn is_blank(&self) -> bool {
        match self {
            PullSource::Page(id) => id.trim().is_empty(),
            PullSource::Titled { title } => title.trim().is_empty(),
        }
    }

    fn title(&self) -> Option<&str> {
        match self {
            PullSource::Page(_) => None,
            PullSource::Titled { title } => Some(title),
        }
    }
}

/// One page mapped onto one local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub page_id: String,
    pub path: PathBuf,
}

#[derive(Debug, Default)]
pub struct PullSummary {
    pub written: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
    pub failed: Vec<Error>,
}

pub struct Puller<C> {
    client: C,
    reporter: Arc<dyn ProgressReporter>,
}

impl<C: Client> Puller<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            reporter: Arc::new(NullReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Turns configured targets into mappings. Titles are matched against the
    /// child pages of `root_page_id`, which is listed only when a title is
    /// used. Child pages no target names are logged and skipped. Returns the
    /// mappings and the titles that matched no page.
    pub async fn resolve(
        &self,
        root_page_id: &str,
        targets: &[(PathBuf, PullSource)],
    ) -> Result<(Vec<Mapping>, Vec<String>), C::Error> {
        let titled = targets.iter().any(|(_, source)| source.title().is_some());
        let pages = if titled {
            workspace::list_all_children(&self.client, root_page_id).await?
        } else {
            Vec::new()
        };
        for page in &pages {
            if let Some(title) = page.page_title() {
                if !targets.iter().any(|(_, source)| source.title() == Some(title)) {
                    info!(title, "skipping page without a mapping");
                }
            }
        }

        let mut mappings = Vec::new();
        let mut missing = Vec::new();
        for (path, source) in targets {
            let page_id = match source {
                PullSource::Page(id) => id.clone(),
                PullSource::Titled { title } => {
                    match pages
                        .iter()
                        .find(|page| page.page_title() == Some(title.as_str()))
                    {
                        Some(page) => page.id.clone(),
                        None => {
                            warn!(title, path = %path.display(), "no page with this title");
                            missing.push(title.clone());
                            continue;
                        }
                    }
                }
            };
            mappings.push(Mapping {
                page_id,
                path: path.clone(),
            });
        }
        Ok((mappings, missing))
    }

    pub async fn run(&self, mappings: &[Mapping]) -> PullSummary {
        let mut summary = PullSummary::default();
        self.reporter.register_entries(
            mappings
                .iter()
                .map(|mapping| mapping.path.display().to_string())
                .collect(),
        );
        for mapping in mappings {
            let entry = mapping.path.display().to_string();
            match self.pull(&mapping.page_id, &mapping.path).await {
                Ok(PullOutcome::Unchanged) => {
                    self.reporter.update_entry(&entry, EntryStatus::Unchanged);
                    summary.unchanged.push(mapping.path.clone());
                }
                Ok(PullOutcome::Written { .. }) => {
                    self.reporter.update_entry(&entry, EntryStatus::Written);
                    summary.written.push(mapping.path.clone());
                }
                Err(error) => {
                    error!(%error, "failed to pull page");
                    self.reporter
                        .update_entry(&entry, EntryStatus::Failed(error.detail.to_string()));
                    summary.failed.push(error);
                }
            }
        }
        summary
    }

    /// Renders `page_id` as markdown and writes it to `path` unless the file
    /// already holds that content, ignoring surrounding whitespace.
    pub async fn pull(&self, page_id: &str, path: &Path) -> Result<PullOutcome, Error> {
        let ctx = ErrorContext::new(path.to_owned()).with_page(page_id);
        let workspace_error = |error: C::Error| ctx.error(ErrorDetail::Workspace(Box::new(error)));

        let title = self.client.page_title(page_id).await.map_err(workspace_error)?;
        debug!(page_id, title, "pulling page");
        let children = workspace::list_all_children(&self.client, page_id)
            .await
            .map_err(workspace_error)?;
        let blocks = children
            .iter()
            .filter_map(|child| match &child.content {
                RemoteContent::Block(block) => Some(block),
                RemoteContent::Container { .. } => None,
            })
            .collect::<Vec<_>>();
        let document = encode(blocks);

        if !differs(path, document.as_bytes())
            .await
            .map_err(|error| ctx.error(ErrorDetail::Load(error)))?
        {
            debug!(path = %path.display(), "unchanged");
            return Ok(PullOutcome::Unchanged);
        }
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|error| ctx.error(ErrorDetail::WriteFile(error)))?;
        }
        tokio::fs::write(path, document.as_bytes())
            .await
            .map_err(|error| ctx.error(ErrorDetail::WriteFile(error)))?;
        info!(path = %path.display(), page_id, bytes = document.len(), "wrote page");
        Ok(PullOutcome::Written {
            bytes: document.len(),
        })
    }
}

/// Whether `path` is missing or its trimmed content hashes differently from
/// the trimmed `content`.
async fn differs(path: &Path, content: &[u8]) -> Result<bool, object_loader::Error> {
    match tokio::fs::read(path).await {
        Ok(existing) => Ok(fingerprint(&existing) != fingerprint(content)),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(error) => Err(object_loader::Error::ReadLocal {
            error,
            path: path.to_owned(),
        }),
    }
}

fn fingerprint(content: &[u8]) -> blake3::Hash {
    blake3::hash(String::from_utf8_lossy(content).trim().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_read_from_yaml() {
        let sources: Vec<PullSource> =
            serde_yaml::from_str("- page-1\n- title: Roadmap\n- title: ''\n").unwrap();
        assert_eq!(sources[0], PullSource::Page("page-1".into()));
        assert_eq!(sources[1].title(), Some("Roadmap"));
        assert!(!sources[1].is_blank());
        assert!(sources[2].is_blank());
    }

    #[tokio::test]
    async fn missing_and_modified_files_differ() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.md");
        assert!(differs(&path, b"x").await.unwrap());
        tokio::fs::write(&path, b"x").await.unwrap();
        assert!(!differs(&path, b"x").await.unwrap());
        assert!(differs(&path, b"y").await.unwrap());
    }

    #[tokio::test]
    async fn surrounding_whitespace_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.md");
        tokio::fs::write(&path, b"\n# x\n\nbody\n\n").await.unwrap();
        assert!(!differs(&path, b"# x\n\nbody\n").await.unwrap());
        assert!(differs(&path, b"# x\nbody\n").await.unwrap());
    }
}
