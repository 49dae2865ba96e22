//! SQLite-backed workspace for dry runs and tests.
//!
//! Pages and blocks share one `blocks` table; each row stores its wire JSON.
//! Identifiers are derived from the autoincrement sequence and never reused.

use std::str::FromStr as _;

use serde_json::{Value, json};
use tracing::{error, trace};

use crate::{
    job::storage::workspace::{self, Children, MAX_APPEND_BLOCKS, NewPage, UploadIntent},
    process_data::markdown::{
        Asset, Block, RemoteBlock, UploadHandle,
        wire::{from_wire, to_wire},
    },
};

/// Children returned per listing call.
pub const PAGE_SIZE: i64 = 100;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("sqlite error: {0}")]
    Sqlite(sqlx::Error),
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("{0} children exceed the per-call append limit")]
    TooManyChildren(usize),
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
    #[error("file upload {0} is not ready to attach")]
    UploadNotReady(String),
    #[error("file upload {0} is not awaiting content")]
    UploadNotPending(String),
    #[error("malformed block {id}: {error}")]
    Malformed { id: String, error: serde_json::Error },
}

pub struct LocalWorkspace {
    pool: sqlx::SqlitePool,
}

pub struct Client {
    pool: sqlx::SqlitePool,
}

#[derive(sqlx::FromRow)]
struct BlockRow {
    seq: i64,
    id: String,
    kind: String,
    title: Option<String>,
    body: String,
}

impl LocalWorkspace {
    pub async fn open(url: &str) -> Result<Self, sqlx::Error> {
        let options = sqlx::sqlite::SqliteConnectOptions::from_str(url)
            .inspect_err(|error| error!(%error, %url, "Failed to open local workspace db"))?
            .create_if_missing(true);
        let pool = sqlx::pool::PoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .inspect_err(|error| error!(%error, %url, "Failed to open local workspace db"))?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS blocks(
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                parent TEXT,
                kind TEXT NOT NULL,
                title TEXT,
                icon TEXT,
                body TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS blocks_parent ON blocks(parent, seq);

            CREATE TABLE IF NOT EXISTS uploads(
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                filename TEXT NOT NULL,
                content_type TEXT NOT NULL,
                status TEXT NOT NULL,
                body BLOB
            );
        "#,
        )
        .execute(&pool)
        .await
        .inspect_err(|error| error!(%error, %url, "Failed to execute DDL to workspace db"))?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &sqlx::SqlitePool {
        &self.pool
    }

    pub fn client(&self) -> Client {
        Client {
            pool: self.pool.clone(),
        }
    }

    /// Creates a parentless page to mirror into.
    pub async fn create_root_page(&self, title: &str) -> Result<String, Error> {
        insert_page(&self.pool, None, title, None).await
    }

    /// Returns the id of the root page titled `title`, creating it when absent.
    pub async fn root_page(&self, title: &str) -> Result<String, Error> {
        let existing = sqlx::query_scalar::<_, String>(
            "SELECT id FROM blocks WHERE parent IS NULL AND title = ? ORDER BY seq LIMIT 1",
        )
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Sqlite)?;
        match existing {
            Some(id) => Ok(id),
            None => self.create_root_page(title).await,
        }
    }
}

async fn insert_page(
    pool: &sqlx::SqlitePool,
    parent: Option<&str>,
    title: &str,
    icon: Option<&str>,
) -> Result<String, Error> {
    sqlx::query_scalar::<_, String>(
        r#"
        INSERT INTO blocks(id, parent, kind, title, icon, body)
        VALUES (
            'page_' || (COALESCE((SELECT seq FROM sqlite_sequence WHERE name = 'blocks'), 0) + 1),
            ?, 'child_page', ?, ?, '{}'
        )
        RETURNING id
        "#,
    )
    .bind(parent)
    .bind(title)
    .bind(icon)
    .fetch_one(pool)
    .await
    .map_err(Error::Sqlite)
}

/// Upload ids referenced by a block, which must be attached exactly once.
fn upload_id(block: &Block) -> Option<&str> {
    match block {
        Block::Image(Asset::Upload(handle))
        | Block::Video(Asset::Upload(handle))
        | Block::Audio(Asset::Upload(handle))
        | Block::File {
            asset: Asset::Upload(handle),
            ..
        } => Some(handle.id()),
        _ => None,
    }
}

/// Attached uploads are served back as hosted files, the way the workspace
/// reports them after attachment.
fn stored_body(block: &Block) -> Value {
    let mut value = to_wire(block);
    if let Some(id) = upload_id(block) {
        let kind = block.kind().to_owned();
        if let Some(payload) = value.get_mut(&kind).and_then(Value::as_object_mut) {
            payload.remove("file_upload");
            payload.insert("type".into(), "file".into());
            payload.insert(
                "file".into(),
                json!({ "url": format!("local://file_uploads/{id}") }),
            );
        }
    }
    value
}

impl Client {
    async fn ensure_exists(&self, id: &str) -> Result<(), Error> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM blocks WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Sqlite)?;
        if count == 0 {
            return Err(Error::NotFound(id.to_owned()));
        }
        Ok(())
    }

    fn remote_block(row: BlockRow) -> Result<RemoteBlock, Error> {
        let value = if row.kind == "child_page" {
            json!({
                "id": row.id,
                "type": "child_page",
                "child_page": { "title": row.title.unwrap_or_default() },
            })
        } else {
            let mut value: Value =
                serde_json::from_str(&row.body).map_err(|error| Error::Malformed {
                    id: row.id.clone(),
                    error,
                })?;
            if let Some(object) = value.as_object_mut() {
                object.insert("id".into(), Value::String(row.id.clone()));
            }
            value
        };
        from_wire(value).map_err(|error| Error::Malformed { id: row.id, error })
    }
}

impl workspace::Client for Client {
    type Error = Error;

    async fn create_page(&self, page: NewPage<'_>) -> Result<String, Self::Error> {
        self.ensure_exists(page.parent).await?;
        let id = insert_page(&self.pool, Some(page.parent), page.title, page.icon).await?;
        trace!(id, parent = page.parent, title = page.title, "created local page");
        Ok(id)
    }

    async fn page_title(&self, page_id: &str) -> Result<String, Self::Error> {
        sqlx::query_scalar::<_, Option<String>>(
            "SELECT title FROM blocks WHERE id = ? AND kind = 'child_page'",
        )
        .bind(page_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Sqlite)?
        .map(Option::unwrap_or_default)
        .ok_or_else(|| Error::NotFound(page_id.to_owned()))
    }

    async fn list_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<Children, Self::Error> {
        self.ensure_exists(block_id).await?;
        let start = cursor
            .map(|cursor| {
                cursor
                    .parse::<i64>()
                    .map_err(|_| Error::InvalidCursor(cursor.to_owned()))
            })
            .transpose()?
            .unwrap_or(0);
        let mut rows = sqlx::query_as::<_, BlockRow>(
            "SELECT seq, id, kind, title, body FROM blocks WHERE parent = ? AND seq >= ? ORDER BY seq LIMIT ?",
        )
        .bind(block_id)
        .bind(start)
        .bind(PAGE_SIZE + 1)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Sqlite)?;
        let next_cursor = if rows.len() as i64 > PAGE_SIZE {
            rows.pop().map(|row| row.seq.to_string())
        } else {
            None
        };
        let results = rows
            .into_iter()
            .map(Self::remote_block)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Children {
            results,
            next_cursor,
        })
    }

    async fn append_children(&self, block_id: &str, children: &[Block]) -> Result<(), Self::Error> {
        if children.len() > MAX_APPEND_BLOCKS {
            return Err(Error::TooManyChildren(children.len()));
        }
        self.ensure_exists(block_id).await?;
        let mut tx = self.pool.begin().await.map_err(Error::Sqlite)?;
        for child in children {
            if let Some(upload) = upload_id(child) {
                let attached = sqlx::query(
                    "UPDATE uploads SET status = 'attached' WHERE id = ? AND status = 'uploaded'",
                )
                .bind(upload)
                .execute(&mut *tx)
                .await
                .map_err(Error::Sqlite)?;
                if attached.rows_affected() == 0 {
                    return Err(Error::UploadNotReady(upload.to_owned()));
                }
            }
            sqlx::query(
                r#"
                INSERT INTO blocks(id, parent, kind, body)
                VALUES (
                    'block_' || (COALESCE((SELECT seq FROM sqlite_sequence WHERE name = 'blocks'), 0) + 1),
                    ?, ?, ?
                )
                "#,
            )
            .bind(block_id)
            .bind(child.kind())
            .bind(stored_body(child).to_string())
            .execute(&mut *tx)
            .await
            .map_err(Error::Sqlite)?;
        }
        tx.commit().await.map_err(Error::Sqlite)?;
        trace!(block_id, count = children.len(), "appended local blocks");
        Ok(())
    }

    async fn delete_block(&self, block_id: &str) -> Result<(), Self::Error> {
        let deleted = sqlx::query(
            r#"
            WITH RECURSIVE doomed(id) AS (
                SELECT id FROM blocks WHERE id = ?
                UNION ALL
                SELECT blocks.id FROM blocks JOIN doomed ON blocks.parent = doomed.id
            )
            DELETE FROM blocks WHERE id IN (SELECT id FROM doomed)
            "#,
        )
        .bind(block_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Sqlite)?;
        if deleted.rows_affected() == 0 {
            return Err(Error::NotFound(block_id.to_owned()));
        }
        Ok(())
    }

    async fn create_upload(
        &self,
        filename: &str,
        content_type: &str,
    ) -> Result<UploadIntent, Self::Error> {
        let id = sqlx::query_scalar::<_, String>(
            r#"
            INSERT INTO uploads(id, filename, content_type, status)
            VALUES (
                'upload_' || (COALESCE((SELECT seq FROM sqlite_sequence WHERE name = 'uploads'), 0) + 1),
                ?, ?, 'pending'
            )
            RETURNING id
            "#,
        )
        .bind(filename)
        .bind(content_type)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Sqlite)?;
        let upload_url = format!("local://file_uploads/{id}/send");
        Ok(UploadIntent { id, upload_url })
    }

    async fn send_upload(
        &self,
        intent: UploadIntent,
        filename: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<UploadHandle, Self::Error> {
        let sent = sqlx::query(
            r#"
            UPDATE uploads SET status = 'uploaded', filename = ?, content_type = ?, body = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(filename)
        .bind(content_type)
        .bind(body)
        .bind(&intent.id)
        .execute(&self.pool)
        .await
        .map_err(Error::Sqlite)?;
        if sent.rows_affected() == 0 {
            return Err(Error::UploadNotPending(intent.id));
        }
        Ok(UploadHandle::new(intent.id))
    }
}
