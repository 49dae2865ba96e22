use crate::process_data::markdown::{Block, RemoteBlock, UploadHandle};

/// Largest number of children accepted by one append call.
pub const MAX_APPEND_BLOCKS: usize = 100;

/// One page of a block's children.
#[derive(Debug)]
pub struct Children {
    pub results: Vec<RemoteBlock>,
    pub next_cursor: Option<String>,
}

/// First phase of an upload: where the bytes go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadIntent {
    pub id: String,
    pub upload_url: String,
}

pub struct NewPage<'a> {
    pub parent: &'a str,
    pub title: &'a str,
    pub icon: Option<&'a str>,
}

pub trait Client {
    type Error: std::error::Error + Send + Sync + 'static;

    fn create_page(&self, page: NewPage<'_>) -> impl Future<Output = Result<String, Self::Error>>;

    fn page_title(&self, page_id: &str) -> impl Future<Output = Result<String, Self::Error>>;

    fn list_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> impl Future<Output = Result<Children, Self::Error>>;

    /// Appends at most [`MAX_APPEND_BLOCKS`] blocks after the existing
    /// children of `block_id`.
    fn append_children(
        &self,
        block_id: &str,
        children: &[Block],
    ) -> impl Future<Output = Result<(), Self::Error>>;

    fn delete_block(&self, block_id: &str) -> impl Future<Output = Result<(), Self::Error>>;

    fn create_upload(
        &self,
        filename: &str,
        content_type: &str,
    ) -> impl Future<Output = Result<UploadIntent, Self::Error>>;

    fn send_upload(
        &self,
        intent: UploadIntent,
        filename: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> impl Future<Output = Result<UploadHandle, Self::Error>>;
}

/// Collects every child of `block_id`, following cursors.
pub async fn list_all_children<C: Client>(
    client: &C,
    block_id: &str,
) -> Result<Vec<RemoteBlock>, C::Error> {
    let mut children = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = client.list_children(block_id, cursor.as_deref()).await?;
        children.extend(page.results);
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => return Ok(children),
        }
    }
}
