//! Per-file synchronizer
//!
//! Drives every walked file through `Pending → Classified → Skipped |
//! Uploaded → Mirrored | Decoded → Mirrored`. A failing file is recorded and
//! the run moves on to the next one.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use itertools::Itertools as _;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
    Error, ErrorContext, ErrorDetail,
    process_data::{
        FileDescriptor, FileKind, language,
        markdown::{Asset, Block, UploadHandle, code_blocks, decode},
        object_loader::{self, DEFAULT_MAX_UPLOAD_BYTES},
    },
    progress::{EntryStatus, NullReporter, ProgressReporter},
    warning,
};

use super::{
    mirror::{FolderCache, Mirror, Mirrored},
    storage::workspace::{Client, MAX_APPEND_BLOCKS},
};

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub root_page_id: String,
    pub max_upload_bytes: u64,
    pub repository_url: Option<Url>,
}

impl SyncOptions {
    pub fn new(root_page_id: impl Into<String>) -> Self {
        Self {
            root_page_id: root_page_id.into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            repository_url: None,
        }
    }
}

/// Why a file was left out of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    TooLarge { size: u64, limit: u64 },
    NoExternalUrl,
    Binary,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::TooLarge { size, limit } => {
                write!(f, "{size} bytes exceeds the upload limit of {limit} bytes")
            }
            SkipReason::NoExternalUrl => f.write_str("no repository url to link the file from"),
            SkipReason::Binary => f.write_str("binary content"),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Skipped(SkipReason),
    Mirrored(Mirrored),
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub mirrored: Vec<(PathBuf, String)>,
    pub skipped: Vec<(PathBuf, SkipReason)>,
    pub failed: Vec<Error>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Stats walked paths into descriptors relative to `base`. Paths that can no
/// longer be read are logged and dropped.
pub async fn describe(paths: Vec<PathBuf>, base: &Path) -> Vec<FileDescriptor> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        match tokio::fs::metadata(&path).await {
            Ok(metadata) => files.push(FileDescriptor::new(path, base, metadata.len())),
            Err(error) => warn!(%error, path = %path.display(), "failed to stat file"),
        }
    }
    files
}

/// Keeps only the files whose relative path is in `changed`.
pub fn restrict(files: Vec<FileDescriptor>, changed: &HashSet<PathBuf>) -> Vec<FileDescriptor> {
    files
        .into_iter()
        .filter(|file| changed.contains(&file.relative))
        .collect()
}

enum Prepared {
    Blocks(Vec<Block>),
    Skip(SkipReason),
}

pub struct Synchronizer<C> {
    client: C,
    options: SyncOptions,
    reporter: Arc<dyn ProgressReporter>,
    chunk_size: usize,
}

impl<C: Client> Synchronizer<C> {
    pub fn new(client: C, options: SyncOptions) -> Self {
        Self {
            client,
            options,
            reporter: Arc::new(NullReporter),
            chunk_size: MAX_APPEND_BLOCKS,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Mirrors `files` one at a time with a cache that lives for this run.
    pub async fn run(&self, files: &[FileDescriptor]) -> RunSummary {
        let mut cache = FolderCache::new();
        let mut summary = RunSummary::default();
        self.reporter
            .register_entries(files.iter().map(ToString::to_string).collect());

        for file in files {
            let entry = file.to_string();
            let (result, warnings) =
                warning::collect_warnings(self.sync_file(&mut cache, file)).await;
            for message in warnings {
                warn!(path = %entry, warning = %message, "file warning");
                self.reporter.log_warn(&format!("{entry}: {message}"));
            }
            match result {
                Ok(Outcome::Mirrored(mirrored)) => {
                    self.reporter.update_entry(&entry, EntryStatus::Mirrored);
                    summary
                        .mirrored
                        .push((file.relative.clone(), mirrored.page_id));
                }
                Ok(Outcome::Skipped(reason)) => {
                    info!(path = %entry, %reason, "skipped");
                    self.reporter
                        .update_entry(&entry, EntryStatus::Skipped(reason.to_string()));
                    summary.skipped.push((file.relative.clone(), reason));
                }
                Err(error) => {
                    error!(%error, "failed to mirror file");
                    self.reporter
                        .update_entry(&entry, EntryStatus::Failed(error.detail.to_string()));
                    summary.failed.push(error);
                }
            }
        }
        debug!(folders = cache.len(), "run finished");
        summary
    }

    pub async fn sync_file(
        &self,
        cache: &mut FolderCache,
        file: &FileDescriptor,
    ) -> Result<Outcome, Error> {
        let entry = file.to_string();
        let ctx = ErrorContext::new(file.path.clone());
        self.reporter
            .update_entry(&entry, EntryStatus::Classified(file.kind));
        debug!(path = %entry, kind = %file.kind, size = file.size, "classified");

        let blocks = match self.prepare(file, &ctx).await? {
            Prepared::Blocks(blocks) => blocks,
            Prepared::Skip(reason) => return Ok(Outcome::Skipped(reason)),
        };
        self.reporter.update_entry(
            &entry,
            EntryStatus::Decoded {
                blocks: blocks.len(),
            },
        );

        self.reporter.update_entry(&entry, EntryStatus::Mirroring);
        let mirrored = Mirror::new(&self.client)
            .with_chunk_size(self.chunk_size)
            .mirror(
                cache,
                &file.relative,
                &self.options.root_page_id,
                file.kind,
                &blocks,
            )
            .await
            .map_err(|error| ctx.error(ErrorDetail::Mirror(Box::new(error))))?;
        Ok(Outcome::Mirrored(mirrored))
    }

    async fn prepare(&self, file: &FileDescriptor, ctx: &ErrorContext) -> Result<Prepared, Error> {
        match file.kind {
            FileKind::Markdown => Ok(match read_text(file, ctx).await? {
                Some(text) => Prepared::Blocks(decode(&text)),
                None => Prepared::Skip(SkipReason::Binary),
            }),
            FileKind::Code => Ok(match read_text(file, ctx).await? {
                Some(text) => Prepared::Blocks(code_blocks(
                    &language::normalize(&file.extension),
                    text.trim_end_matches(['\r', '\n']),
                )),
                None => Prepared::Skip(SkipReason::Binary),
            }),
            FileKind::Unclassified => Ok(match read_text(file, ctx).await? {
                Some(text) => Prepared::Blocks(code_blocks(
                    language::PLAIN_TEXT,
                    text.trim_end_matches(['\r', '\n']),
                )),
                None => Prepared::Skip(SkipReason::Binary),
            }),
            FileKind::UnsupportedArchive => Ok(match self.external_url(file) {
                Some(url) => Prepared::Blocks(vec![Block::Bookmark { url }]),
                None => Prepared::Skip(SkipReason::NoExternalUrl),
            }),
            FileKind::Image | FileKind::Video | FileKind::Audio | FileKind::Document => {
                let limit = self.options.max_upload_bytes;
                if object_loader::exceeds_limit(file, limit) {
                    return Ok(Prepared::Skip(SkipReason::TooLarge {
                        size: file.size,
                        limit,
                    }));
                }
                let asset = Asset::Upload(self.upload(file, ctx).await?);
                Ok(Prepared::Blocks(vec![match file.kind {
                    FileKind::Image => Block::Image(asset),
                    FileKind::Video => Block::Video(asset),
                    FileKind::Audio => Block::Audio(asset),
                    _ => Block::File {
                        asset,
                        name: Some(file.file_name()),
                    },
                }]))
            }
        }
    }

    /// Two-phase upload: register the file, then send its bytes to the
    /// one-time endpoint.
    async fn upload(
        &self,
        file: &FileDescriptor,
        ctx: &ErrorContext,
    ) -> Result<UploadHandle, Error> {
        let entry = file.to_string();
        self.reporter.update_entry(&entry, EntryStatus::Uploading);
        let object = object_loader::load(file)
            .await
            .map_err(|error| ctx.error(ErrorDetail::Load(error)))?;
        let intent = self
            .client
            .create_upload(&object.filename, &object.content_type)
            .await
            .map_err(|error| ctx.error(ErrorDetail::Upload(Box::new(error))))?;
        debug!(path = %entry, upload = intent.id, "created upload");
        let handle = self
            .client
            .send_upload(intent, &object.filename, &object.content_type, object.body)
            .await
            .map_err(|error| ctx.error(ErrorDetail::Upload(Box::new(error))))?;
        self.reporter.record_upload();
        Ok(handle)
    }

    fn external_url(&self, file: &FileDescriptor) -> Option<String> {
        let base = self.options.repository_url.as_ref()?;
        let relative = file
            .relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .join("/");
        match base.join(&relative) {
            Ok(url) => Some(url.into()),
            Err(error) => {
                crate::warn_entry!("cannot link {relative} from {base}: {error}");
                None
            }
        }
    }
}

async fn read_text(file: &FileDescriptor, ctx: &ErrorContext) -> Result<Option<String>, Error> {
    object_loader::load_text(&file.path)
        .await
        .map_err(|error| ctx.error(ErrorDetail::Load(error)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_reasons_describe_themselves() {
        assert_eq!(
            SkipReason::TooLarge { size: 30, limit: 20 }.to_string(),
            "30 bytes exceeds the upload limit of 20 bytes"
        );
        assert_eq!(SkipReason::Binary.to_string(), "binary content");
    }

    #[test]
    fn restrict_keeps_changed_paths() {
        let base = Path::new("repo");
        let files = vec![
            FileDescriptor::new(PathBuf::from("repo/a.md"), base, 1),
            FileDescriptor::new(PathBuf::from("repo/docs/b.md"), base, 1),
        ];
        let changed = HashSet::from([PathBuf::from("docs/b.md")]);
        let kept = restrict(files, &changed);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].relative, PathBuf::from("docs/b.md"));
    }
}
