use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::trace;
use url::Url;

use crate::{
    job::storage::workspace::{self, Children, MAX_APPEND_BLOCKS, NewPage, UploadIntent},
    process_data::markdown::{
        Block, UploadHandle,
        wire::{from_wire, to_wire},
    },
};

pub const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1/";
pub const DEFAULT_VERSION: &str = "2022-06-28";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    #[error("invalid endpoint {path}: {error}")]
    Endpoint {
        path: String,
        error: url::ParseError,
    },
    #[error("workspace rejected the request. status: {status}, code: {code}, message: {message}")]
    Api {
        status: reqwest::StatusCode,
        code: String,
        message: String,
    },
    #[error("unexpected response. status: {status}, body: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("failed to decode block: {0}")]
    Decode(serde_json::Error),
    #[error("page {0} has no title property")]
    MissingTitle(String),
    #[error("file upload {id} ended in status {status}")]
    UploadIncomplete { id: String, status: String },
}

/// Error object returned with every non-2xx response.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: u16,
    pub code: String,
    pub message: String,
}

pub struct Client {
    base_url: Url,
    token: String,
    version: String,
    client: reqwest::Client,
}

impl Client {
    pub fn new(base_url: Url, token: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            base_url,
            token: token.into(),
            version: version.into(),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        self.base_url.join(path).map_err(|error| Error::Endpoint {
            path: path.to_owned(),
            error,
        })
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.version)
    }
}

async fn read<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, Error> {
    let status = response.status();
    if status.is_success() {
        return response.json::<R>().await.map_err(Error::Transport);
    }
    let body = response.text().await.map_err(Error::Transport)?;
    Err(match serde_json::from_str::<ApiError>(&body) {
        Ok(ApiError { code, message, .. }) => Error::Api {
            status,
            code,
            message,
        },
        Err(_) => Error::Status { status, body },
    })
}

#[derive(Deserialize)]
struct Created {
    id: String,
}

#[derive(Deserialize)]
struct Page {
    #[serde(default)]
    properties: indexmap::IndexMap<String, Property>,
}

#[derive(Deserialize)]
struct Property {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    title: Vec<PlainText>,
}

#[derive(Deserialize)]
struct PlainText {
    #[serde(default)]
    plain_text: String,
}

#[derive(Deserialize)]
struct Listing {
    results: Vec<Value>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct FileUpload {
    id: String,
    status: String,
    upload_url: Option<String>,
}

fn page_request(page: &NewPage<'_>) -> Value {
    let mut body = json!({
        "parent": { "page_id": page.parent },
        "properties": {
            "title": {
                "title": [{ "type": "text", "text": { "content": page.title } }]
            }
        },
    });
    if let (Some(icon), Some(object)) = (page.icon, body.as_object_mut()) {
        object.insert("icon".into(), json!({ "type": "emoji", "emoji": icon }));
    }
    body
}

impl workspace::Client for Client {
    type Error = Error;

    async fn create_page(&self, page: NewPage<'_>) -> Result<String, Self::Error> {
        let response = self
            .request(reqwest::Method::POST, self.endpoint("pages")?)
            .json(&page_request(&page))
            .send()
            .await
            .map_err(Error::Transport)?;
        let Created { id } = read(response).await?;
        trace!(id, parent = page.parent, title = page.title, "created page");
        Ok(id)
    }

    async fn page_title(&self, page_id: &str) -> Result<String, Self::Error> {
        let response = self
            .request(
                reqwest::Method::GET,
                self.endpoint(&format!("pages/{page_id}"))?,
            )
            .send()
            .await
            .map_err(Error::Transport)?;
        let page: Page = read(response).await?;
        page.properties
            .into_values()
            .find(|property| property.kind == "title")
            .map(|property| {
                property
                    .title
                    .into_iter()
                    .map(|text| text.plain_text)
                    .collect::<String>()
            })
            .ok_or_else(|| Error::MissingTitle(page_id.to_owned()))
    }

    async fn list_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<Children, Self::Error> {
        let mut url = self.endpoint(&format!("blocks/{block_id}/children"))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("page_size", "100");
            if let Some(cursor) = cursor {
                query.append_pair("start_cursor", cursor);
            }
        }
        let response = self
            .request(reqwest::Method::GET, url)
            .send()
            .await
            .map_err(Error::Transport)?;
        let listing: Listing = read(response).await?;
        let results = listing
            .results
            .into_iter()
            .map(from_wire)
            .collect::<Result<Vec<_>, _>>()
            .map_err(Error::Decode)?;
        Ok(Children {
            results,
            next_cursor: listing.next_cursor.filter(|_| listing.has_more),
        })
    }

    async fn append_children(&self, block_id: &str, children: &[Block]) -> Result<(), Self::Error> {
        debug_assert!(children.len() <= MAX_APPEND_BLOCKS);
        let children = children.iter().map(to_wire).collect::<Vec<_>>();
        let response = self
            .request(
                reqwest::Method::PATCH,
                self.endpoint(&format!("blocks/{block_id}/children"))?,
            )
            .json(&json!({ "children": children }))
            .send()
            .await
            .map_err(Error::Transport)?;
        read::<Value>(response).await?;
        Ok(())
    }

    async fn delete_block(&self, block_id: &str) -> Result<(), Self::Error> {
        let response = self
            .request(
                reqwest::Method::DELETE,
                self.endpoint(&format!("blocks/{block_id}"))?,
            )
            .send()
            .await
            .map_err(Error::Transport)?;
        read::<Value>(response).await?;
        Ok(())
    }

    async fn create_upload(
        &self,
        filename: &str,
        content_type: &str,
    ) -> Result<UploadIntent, Self::Error> {
        let response = self
            .request(reqwest::Method::POST, self.endpoint("file_uploads")?)
            .json(&json!({
                "mode": "single_part",
                "filename": filename,
                "content_type": content_type,
            }))
            .send()
            .await
            .map_err(Error::Transport)?;
        let upload: FileUpload = read(response).await?;
        let upload_url = match upload.upload_url {
            Some(url) => url,
            None => self
                .endpoint(&format!("file_uploads/{}/send", upload.id))?
                .to_string(),
        };
        Ok(UploadIntent {
            id: upload.id,
            upload_url,
        })
    }

    async fn send_upload(
        &self,
        intent: UploadIntent,
        filename: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<UploadHandle, Self::Error> {
        let url = Url::parse(&intent.upload_url).map_err(|error| Error::Endpoint {
            path: intent.upload_url.clone(),
            error,
        })?;
        let part = reqwest::multipart::Part::bytes(body)
            .file_name(filename.to_owned())
            .mime_str(content_type)
            .map_err(Error::Transport)?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let response = self
            .request(reqwest::Method::POST, url)
            .multipart(form)
            .send()
            .await
            .map_err(Error::Transport)?;
        let upload: FileUpload = read(response).await?;
        if upload.status != "uploaded" {
            return Err(Error::UploadIncomplete {
                id: upload.id,
                status: upload.status,
            });
        }
        Ok(UploadHandle::new(upload.id))
    }
}
