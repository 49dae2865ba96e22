//! Remote page tree mirroring.
//!
//! A local path `a/b/file.md` becomes the page chain `root → a → b → file.md`.
//! Folder pages are resolved (or created) one segment at a time; the leaf
//! page is created, or has its content replaced when it already exists.

use std::{collections::HashMap, path::Path};

use tracing::{debug, info, trace};

use crate::process_data::{FOLDER_ICON, FileKind, markdown::Block};

use super::storage::workspace::{self, Client, MAX_APPEND_BLOCKS, NewPage};

/// Folder pages resolved during one run, keyed by (parent page, folder name).
///
/// Lives for a single run. A miss is always checked against the workspace
/// before a folder page is created.
#[derive(Debug, Default)]
pub struct FolderCache {
    pages: HashMap<(String, String), String>,
}

impl FolderCache {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn get(&self, parent: &str, name: &str) -> Option<&str> {
        self.pages
            .get(&(parent.to_owned(), name.to_owned()))
            .map(String::as_str)
    }

    pub fn insert(&mut self, parent: &str, name: &str, page_id: String) {
        self.pages
            .insert((parent.to_owned(), name.to_owned()), page_id);
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MirrorError<E> {
    #[error("invalid local path: {0}")]
    InvalidPath(String),
    #[error("failed to resolve folder page {name:?}: {error}")]
    Folder { name: String, error: E },
    #[error("failed to resolve page {title:?}: {error}")]
    Leaf { title: String, error: E },
    #[error("failed to clear page {page_id}: {error}")]
    Clear { page_id: String, error: E },
    #[error("failed to append blocks {offset}.. to page {page_id}: {error}")]
    Append {
        page_id: String,
        offset: usize,
        error: E,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mirrored {
    pub page_id: String,
    /// Whether an existing page had its content replaced.
    pub replaced: bool,
    pub appended: usize,
}

pub struct Mirror<'c, C> {
    client: &'c C,
    chunk_size: usize,
}

impl<'c, C: Client> Mirror<'c, C> {
    pub fn new(client: &'c C) -> Self {
        Self {
            client,
            chunk_size: MAX_APPEND_BLOCKS,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.clamp(1, MAX_APPEND_BLOCKS);
        self
    }

    /// Mirrors `blocks` as the page for `relative` below `root_page_id`.
    pub async fn mirror(
        &self,
        cache: &mut FolderCache,
        relative: &Path,
        root_page_id: &str,
        kind: FileKind,
        blocks: &[Block],
    ) -> Result<Mirrored, MirrorError<C::Error>> {
        let title = relative
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| MirrorError::InvalidPath(relative.display().to_string()))?;
        let folders = relative
            .parent()
            .map(|parent| {
                parent
                    .components()
                    .map(|component| component.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let parent = self.resolve_folders(cache, root_page_id, &folders).await?;
        let existing = self
            .find_child_page(&parent, &title)
            .await
            .map_err(|error| MirrorError::Leaf {
                title: title.clone(),
                error,
            })?;
        let (page_id, replaced) = match existing {
            Some(page_id) => {
                let removed = self
                    .clear_content(&page_id)
                    .await
                    .map_err(|error| MirrorError::Clear {
                        page_id: page_id.clone(),
                        error,
                    })?;
                debug!(page_id, removed, "cleared existing page");
                (page_id, true)
            }
            None => {
                let page_id = self
                    .client
                    .create_page(NewPage {
                        parent: &parent,
                        title: &title,
                        icon: Some(kind.icon()),
                    })
                    .await
                    .map_err(|error| MirrorError::Leaf {
                        title: title.clone(),
                        error,
                    })?;
                debug!(page_id, title, "created page");
                (page_id, false)
            }
        };
        self.append_chunked(&page_id, blocks).await?;
        info!(
            path = %relative.display(),
            page_id,
            replaced,
            blocks = blocks.len(),
            "mirrored"
        );
        Ok(Mirrored {
            page_id,
            replaced,
            appended: blocks.len(),
        })
    }

    /// Walks the folder chain from `root_page_id`, returning the id of the
    /// innermost folder page.
    pub async fn resolve_folders(
        &self,
        cache: &mut FolderCache,
        root_page_id: &str,
        folders: &[String],
    ) -> Result<String, MirrorError<C::Error>> {
        let mut cursor = root_page_id.to_owned();
        for name in folders {
            if let Some(page_id) = cache.get(&cursor, name) {
                trace!(name, page_id, "folder cache hit");
                cursor = page_id.to_owned();
                continue;
            }
            let folder_error = |error| MirrorError::Folder {
                name: name.clone(),
                error,
            };
            let page_id = match self
                .find_child_page(&cursor, name)
                .await
                .map_err(folder_error)?
            {
                Some(page_id) => page_id,
                None => {
                    let page_id = self
                        .client
                        .create_page(NewPage {
                            parent: &cursor,
                            title: name,
                            icon: Some(FOLDER_ICON),
                        })
                        .await
                        .map_err(folder_error)?;
                    debug!(name, page_id, "created folder page");
                    page_id
                }
            };
            cache.insert(&cursor, name, page_id.clone());
            cursor = page_id;
        }
        Ok(cursor)
    }

    async fn find_child_page(&self, parent: &str, title: &str) -> Result<Option<String>, C::Error> {
        let children = workspace::list_all_children(self.client, parent).await?;
        Ok(children
            .into_iter()
            .find(|child| child.page_title() == Some(title))
            .map(|child| child.id))
    }

    /// Deletes every child of `page_id` that is not a container. Returns the
    /// number of deleted blocks.
    pub async fn clear_content(&self, page_id: &str) -> Result<usize, C::Error> {
        let children = workspace::list_all_children(self.client, page_id).await?;
        let mut removed = 0;
        for child in children
            .iter()
            .filter(|child| child.container_title().is_none())
        {
            self.client.delete_block(&child.id).await?;
            removed += 1;
        }
        Ok(removed)
    }

    /// Appends `blocks` in order, at most `chunk_size` per call.
    pub async fn append_chunked(
        &self,
        page_id: &str,
        blocks: &[Block],
    ) -> Result<(), MirrorError<C::Error>> {
        for (index, chunk) in blocks.chunks(self.chunk_size).enumerate() {
            let offset = index * self.chunk_size;
            trace!(page_id, offset, len = chunk.len(), "append chunk");
            self.client
                .append_children(page_id, chunk)
                .await
                .map_err(|error| MirrorError::Append {
                    page_id: page_id.to_owned(),
                    offset,
                    error,
                })?;
        }
        Ok(())
    }
}
