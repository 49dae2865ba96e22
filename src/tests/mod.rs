use std::sync::Mutex;

use crate::{
    config::Config,
    deploy::local::LocalWorkspace,
    job::{
        self, SyncOptions,
        storage::workspace::{Children, Client, NewPage, UploadIntent},
    },
    process_data::{
        FileDescriptor,
        markdown::{Block, UploadHandle},
        walk,
    },
};

mod mirror;
mod pull;

async fn workspace() -> (LocalWorkspace, String) {
    let workspace = LocalWorkspace::open("sqlite::memory:").await.unwrap();
    let root = workspace.create_root_page("root").await.unwrap();
    (workspace, root)
}

async fn scenario1() -> (Config, Vec<FileDescriptor>) {
    let config = tokio::fs::read_to_string("src/tests/scenario1/config.yaml")
        .await
        .unwrap();
    let config: Config = serde_yaml::from_str(&config).unwrap();
    config.validate().unwrap();
    let paths = walk::walk(&config.base_dir, &config.roots[..], &config.exclude[..]);
    let mut files = job::describe(paths, &config.base_dir).await;
    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    (config, files)
}

fn options(root: &str, config: &Config) -> SyncOptions {
    SyncOptions {
        root_page_id: root.to_owned(),
        max_upload_bytes: config.max_upload_bytes,
        repository_url: config.repository_url.clone(),
    }
}

#[derive(Debug, thiserror::Error)]
enum WrapperError<E> {
    #[error(transparent)]
    Inner(E),
    #[error("injected upload failure")]
    Injected,
}

/// Passes calls through, remembering the size of every append.
struct Recording<C> {
    inner: C,
    appends: Mutex<Vec<usize>>,
}

impl<C> Recording<C> {
    fn new(inner: C) -> Self {
        Self {
            inner,
            appends: Mutex::new(Vec::new()),
        }
    }

    fn appends(&self) -> Vec<usize> {
        self.appends.lock().unwrap().clone()
    }
}

/// Fails the first phase of every upload.
struct FailingUploads<C> {
    inner: C,
}

impl<C: Client> Client for Recording<C> {
    type Error = WrapperError<C::Error>;

    async fn create_page(&self, page: NewPage<'_>) -> Result<String, Self::Error> {
        self.inner.create_page(page).await.map_err(WrapperError::Inner)
    }

    async fn page_title(&self, page_id: &str) -> Result<String, Self::Error> {
        self.inner.page_title(page_id).await.map_err(WrapperError::Inner)
    }

    async fn list_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<Children, Self::Error> {
        self.inner
            .list_children(block_id, cursor)
            .await
            .map_err(WrapperError::Inner)
    }

    async fn append_children(&self, block_id: &str, children: &[Block]) -> Result<(), Self::Error> {
        self.appends.lock().unwrap().push(children.len());
        self.inner
            .append_children(block_id, children)
            .await
            .map_err(WrapperError::Inner)
    }

    async fn delete_block(&self, block_id: &str) -> Result<(), Self::Error> {
        self.inner.delete_block(block_id).await.map_err(WrapperError::Inner)
    }

    async fn create_upload(
        &self,
        filename: &str,
        content_type: &str,
    ) -> Result<UploadIntent, Self::Error> {
        self.inner
            .create_upload(filename, content_type)
            .await
            .map_err(WrapperError::Inner)
    }

    async fn send_upload(
        &self,
        intent: UploadIntent,
        filename: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<UploadHandle, Self::Error> {
        self.inner
            .send_upload(intent, filename, content_type, body)
            .await
            .map_err(WrapperError::Inner)
    }
}

impl<C: Client> Client for FailingUploads<C> {
    type Error = WrapperError<C::Error>;

    async fn create_page(&self, page: NewPage<'_>) -> Result<String, Self::Error> {
        self.inner.create_page(page).await.map_err(WrapperError::Inner)
    }

    async fn page_title(&self, page_id: &str) -> Result<String, Self::Error> {
        self.inner.page_title(page_id).await.map_err(WrapperError::Inner)
    }

    async fn list_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<Children, Self::Error> {
        self.inner
            .list_children(block_id, cursor)
            .await
            .map_err(WrapperError::Inner)
    }

    async fn append_children(&self, block_id: &str, children: &[Block]) -> Result<(), Self::Error> {
        self.inner
            .append_children(block_id, children)
            .await
            .map_err(WrapperError::Inner)
    }

    async fn delete_block(&self, block_id: &str) -> Result<(), Self::Error> {
        self.inner.delete_block(block_id).await.map_err(WrapperError::Inner)
    }

    async fn create_upload(&self, _: &str, _: &str) -> Result<UploadIntent, Self::Error> {
        Err(WrapperError::Injected)
    }

    async fn send_upload(
        &self,
        _: UploadIntent,
        _: &str,
        _: &str,
        _: Vec<u8>,
    ) -> Result<UploadHandle, Self::Error> {
        Err(WrapperError::Injected)
    }
}
