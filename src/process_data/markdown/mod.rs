//! Content block model shared by the decoder, the encoder and the workspace
//! clients.

use serde::{Deserialize, Serialize};

pub mod decode;
pub mod encode;
pub mod wire;

pub use decode::decode;
pub use encode::encode;

/// Style flags of an inline span.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Style {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub code: bool,
    #[serde(default)]
    pub strikethrough: bool,
}

impl Style {
    pub fn is_plain(&self) -> bool {
        !(self.bold || self.italic || self.code || self.strikethrough)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: Style,
    pub href: Option<String>,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: Style::default(),
            href: None,
        }
    }

    pub fn styled(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
            href: None,
        }
    }
}

/// Opaque identifier of an asset staged through the two-phase upload.
///
/// Not `Clone`: a handle is attached to exactly one block.
#[derive(Debug, PartialEq, Eq)]
pub struct UploadHandle(String);

impl UploadHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }

    pub fn into_id(self) -> String {
        self.0
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Asset {
    Upload(UploadHandle),
    /// File hosted by the workspace, as returned when listing blocks.
    Hosted { url: String },
    External { url: String },
}

impl Asset {
    pub fn url(&self) -> Option<&str> {
        match self {
            Asset::Upload(_) => None,
            Asset::Hosted { url } | Asset::External { url } => Some(url),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
}

impl HeadingLevel {
    pub fn from_depth(depth: usize) -> Option<Self> {
        match depth {
            1 => Some(Self::H1),
            2 => Some(Self::H2),
            3 => Some(Self::H3),
            _ => None,
        }
    }

    pub fn depth(self) -> usize {
        match self {
            Self::H1 => 1,
            Self::H2 => 2,
            Self::H3 => 3,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Block {
    Heading {
        level: HeadingLevel,
        text: Vec<Span>,
    },
    Paragraph(Vec<Span>),
    BulletedItem(Vec<Span>),
    NumberedItem(Vec<Span>),
    Code {
        language: String,
        text: String,
    },
    Quote(Vec<Span>),
    Callout(Vec<Span>),
    Todo {
        checked: bool,
        text: Vec<Span>,
    },
    Divider,
    Image(Asset),
    Video(Asset),
    Audio(Asset),
    File {
        asset: Asset,
        name: Option<String>,
    },
    Bookmark {
        url: String,
    },
    /// A remote block kind this model does not represent. Any rich text it
    /// carried is kept so the encoder can still render it.
    Unsupported {
        kind: String,
        text: Vec<Span>,
    },
}

impl Block {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::Paragraph(vec![Span::plain(text)])
    }

    pub fn code(language: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Code {
            language: language.into(),
            text: text.into(),
        }
    }

    /// Wire name of the block kind.
    pub fn kind(&self) -> &str {
        match self {
            Self::Heading {
                level: HeadingLevel::H1,
                ..
            } => "heading_1",
            Self::Heading {
                level: HeadingLevel::H2,
                ..
            } => "heading_2",
            Self::Heading {
                level: HeadingLevel::H3,
                ..
            } => "heading_3",
            Self::Paragraph(_) => "paragraph",
            Self::BulletedItem(_) => "bulleted_list_item",
            Self::NumberedItem(_) => "numbered_list_item",
            Self::Code { .. } => "code",
            Self::Quote(_) => "quote",
            Self::Callout(_) => "callout",
            Self::Todo { .. } => "to_do",
            Self::Divider => "divider",
            Self::Image(_) => "image",
            Self::Video(_) => "video",
            Self::Audio(_) => "audio",
            Self::File { .. } => "file",
            Self::Bookmark { .. } => "bookmark",
            Self::Unsupported { kind, .. } => kind,
        }
    }

    pub fn is_list_item(&self) -> bool {
        matches!(
            self,
            Self::BulletedItem(_) | Self::NumberedItem(_) | Self::Todo { .. }
        )
    }
}

/// A child listed under a remote page or block.
#[derive(Debug, PartialEq, Eq)]
pub struct RemoteBlock {
    pub id: String,
    pub content: RemoteContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Page,
    Database,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RemoteContent {
    /// Child page or child database. Never removed by content replacement.
    Container { kind: ContainerKind, title: String },
    Block(Block),
}

impl RemoteBlock {
    pub fn container_title(&self) -> Option<&str> {
        match &self.content {
            RemoteContent::Container { title, .. } => Some(title),
            RemoteContent::Block(_) => None,
        }
    }

    /// Title of a child page. Databases are containers but cannot hold pages
    /// created by the mirror, so they never match.
    pub fn page_title(&self) -> Option<&str> {
        match &self.content {
            RemoteContent::Container {
                kind: ContainerKind::Page,
                title,
            } => Some(title),
            _ => None,
        }
    }
}

/// Maximum characters of a single rich text object.
pub const MAX_TEXT_LENGTH: usize = 2000;
/// Maximum rich text objects in a single block.
pub const MAX_RICH_TEXT_SPANS: usize = 100;

/// Builds code blocks for `text`, splitting on line boundaries so that every
/// block stays within the rich text limits.
pub fn code_blocks(language: &str, text: &str) -> Vec<Block> {
    const BUDGET: usize = MAX_TEXT_LENGTH * MAX_RICH_TEXT_SPANS;
    let mut blocks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > BUDGET && !current.is_empty() {
            blocks.push(Block::code(language, std::mem::take(&mut current)));
            current_len = 0;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if !current.is_empty() || blocks.is_empty() {
        blocks.push(Block::code(language, current));
    }
    blocks
}
