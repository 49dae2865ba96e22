//! Workspace JSON representation of blocks.

use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{
    Asset, Block, ContainerKind, HeadingLevel, MAX_TEXT_LENGTH, RemoteBlock, RemoteContent, Span,
    Style, UploadHandle,
};

pub fn to_wire(block: &Block) -> Value {
    let kind = block.kind().to_owned();
    let payload = match block {
        Block::Heading { text, .. }
        | Block::Paragraph(text)
        | Block::BulletedItem(text)
        | Block::NumberedItem(text)
        | Block::Quote(text) => json!({ "rich_text": rich_text(text) }),
        Block::Callout(text) => json!({
            "rich_text": rich_text(text),
            "icon": { "type": "emoji", "emoji": "💡" },
        }),
        Block::Todo { checked, text } => json!({
            "rich_text": rich_text(text),
            "checked": checked,
        }),
        Block::Code { language, text } => json!({
            "rich_text": rich_text(&[Span::plain(text.as_str())]),
            "language": language,
        }),
        Block::Divider => json!({}),
        Block::Image(asset) | Block::Video(asset) | Block::Audio(asset) => asset_payload(asset),
        Block::File { asset, name } => {
            let mut payload = asset_payload(asset);
            if let (Some(name), Some(object)) = (name, payload.as_object_mut()) {
                object.insert("name".into(), Value::String(name.clone()));
            }
            payload
        }
        Block::Bookmark { url } => json!({ "url": url }),
        Block::Unsupported { .. } => json!({}),
    };
    let mut object = Map::new();
    object.insert("object".into(), "block".into());
    object.insert("type".into(), Value::String(kind.clone()));
    object.insert(kind, payload);
    Value::Object(object)
}

fn asset_payload(asset: &Asset) -> Value {
    match asset {
        Asset::Upload(handle) => json!({
            "type": "file_upload",
            "file_upload": { "id": handle.id() },
        }),
        Asset::Hosted { url } | Asset::External { url } => json!({
            "type": "external",
            "external": { "url": url },
        }),
    }
}

/// Converts spans to rich text objects, splitting text longer than
/// [`MAX_TEXT_LENGTH`] characters into consecutive objects with the same style.
fn rich_text(spans: &[Span]) -> Vec<Value> {
    let mut objects = Vec::new();
    for span in spans {
        for piece in split_text(&span.text, MAX_TEXT_LENGTH) {
            let link = span.href.as_ref().map(|url| json!({ "url": url }));
            objects.push(json!({
                "type": "text",
                "text": { "content": piece, "link": link },
                "annotations": span.style,
            }));
        }
    }
    objects
}

fn split_text(text: &str, limit: usize) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut pieces = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let end = rest
            .char_indices()
            .nth(limit)
            .map(|(index, _)| index)
            .unwrap_or(rest.len());
        let (piece, tail) = rest.split_at(end);
        pieces.push(piece);
        rest = tail;
    }
    pieces
}

#[derive(Deserialize)]
struct WireBlock {
    #[serde(default)]
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

#[derive(Deserialize, Default)]
struct TextPayload {
    #[serde(default)]
    rich_text: Vec<WireRichText>,
    #[serde(default)]
    checked: bool,
    language: Option<String>,
}

#[derive(Deserialize)]
struct WireRichText {
    plain_text: Option<String>,
    text: Option<WireText>,
    #[serde(default)]
    annotations: Style,
    href: Option<String>,
}

#[derive(Deserialize)]
struct WireText {
    content: String,
    link: Option<WireLink>,
}

#[derive(Deserialize)]
struct WireLink {
    url: String,
}

#[derive(Deserialize)]
struct WireFile {
    #[serde(rename = "type")]
    kind: String,
    file: Option<WireLink>,
    external: Option<WireLink>,
    file_upload: Option<WireUpload>,
    name: Option<String>,
}

#[derive(Deserialize)]
struct WireUpload {
    id: String,
}

#[derive(Deserialize)]
struct WireTitle {
    #[serde(default)]
    title: String,
}

#[derive(Deserialize)]
struct WireBookmark {
    url: String,
}

impl From<WireRichText> for Span {
    fn from(value: WireRichText) -> Self {
        let (content, link) = match value.text {
            Some(WireText { content, link }) => (content, link.map(|link| link.url)),
            None => (value.plain_text.unwrap_or_default(), None),
        };
        Span {
            text: content,
            style: value.annotations,
            href: value.href.or(link),
        }
    }
}

impl WireFile {
    fn into_asset(self) -> Option<Asset> {
        match self.kind.as_str() {
            "file" => self.file.map(|file| Asset::Hosted { url: file.url }),
            "external" => self.external.map(|file| Asset::External { url: file.url }),
            "file_upload" => self
                .file_upload
                .map(|upload| Asset::Upload(UploadHandle::new(upload.id))),
            _ => None,
        }
    }
}

pub fn from_wire(value: Value) -> Result<RemoteBlock, serde_json::Error> {
    let WireBlock {
        id,
        kind,
        mut payload,
    } = serde_json::from_value(value)?;
    let body = payload.remove(&kind).unwrap_or(Value::Null);
    let text = |body: Value| -> Result<TextPayload, serde_json::Error> {
        if body.is_null() {
            Ok(TextPayload::default())
        } else {
            serde_json::from_value(body)
        }
    };
    let spans = |payload: TextPayload| -> Vec<Span> {
        payload.rich_text.into_iter().map(Span::from).collect()
    };
    let heading = |level: HeadingLevel, body: Value| -> Result<Block, serde_json::Error> {
        Ok(Block::Heading {
            level,
            text: spans(text(body)?),
        })
    };
    let block = match kind.as_str() {
        "child_page" | "child_database" => {
            let WireTitle { title } = serde_json::from_value(body)?;
            let kind = if kind == "child_page" {
                ContainerKind::Page
            } else {
                ContainerKind::Database
            };
            return Ok(RemoteBlock {
                id,
                content: RemoteContent::Container { kind, title },
            });
        }
        "heading_1" => heading(HeadingLevel::H1, body)?,
        "heading_2" => heading(HeadingLevel::H2, body)?,
        "heading_3" => heading(HeadingLevel::H3, body)?,
        "paragraph" => Block::Paragraph(spans(text(body)?)),
        "bulleted_list_item" => Block::BulletedItem(spans(text(body)?)),
        "numbered_list_item" => Block::NumberedItem(spans(text(body)?)),
        "quote" => Block::Quote(spans(text(body)?)),
        "callout" => Block::Callout(spans(text(body)?)),
        "to_do" => {
            let payload = text(body)?;
            Block::Todo {
                checked: payload.checked,
                text: spans(payload),
            }
        }
        "code" => {
            let mut payload = text(body)?;
            let language = payload
                .language
                .take()
                .unwrap_or_else(|| crate::process_data::language::PLAIN_TEXT.to_owned());
            let text = spans(payload)
                .into_iter()
                .map(|span| span.text)
                .collect::<String>();
            Block::Code { language, text }
        }
        "divider" => Block::Divider,
        "bookmark" => {
            let WireBookmark { url } = serde_json::from_value(body)?;
            Block::Bookmark { url }
        }
        "image" | "video" | "audio" | "file" => {
            let file: WireFile = serde_json::from_value(body)?;
            let name = file.name.clone();
            match file.into_asset() {
                Some(asset) => match kind.as_str() {
                    "image" => Block::Image(asset),
                    "video" => Block::Video(asset),
                    "audio" => Block::Audio(asset),
                    _ => Block::File { asset, name },
                },
                None => Block::Unsupported {
                    kind,
                    text: Vec::new(),
                },
            }
        }
        // Unknown payloads may not look like text at all.
        _ => Block::Unsupported {
            text: text(body).map(spans).unwrap_or_default(),
            kind,
        },
    };
    Ok(RemoteBlock {
        id,
        content: RemoteContent::Block(block),
    })
}
