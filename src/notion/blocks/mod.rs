
use serde::{Deserialize, Serialize};

/// One node in the Notion block tree, as returned by the block children
/// endpoint. Children are never embedded inline; `has_children` signals
/// that a separate paginated fetch is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(default)]
    pub has_children: bool,
    #[serde(flatten)]
    pub kind: BlockKind,
}

/// Typed block payload, tagged by the wire `type` field. The payload for
/// each type lives under a field named after the type, which is how the
/// Notion API lays out its JSON. Provider types this crate does not
/// recognize deserialize as `Unsupported` and render as empty text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    #[serde(rename = "heading_1")]
    Heading1 {
        #[serde(default, rename = "heading_1")]
        payload: TextPayload,
    },
    #[serde(rename = "heading_2")]
    Heading2 {
        #[serde(default, rename = "heading_2")]
        payload: TextPayload,
    },
    #[serde(rename = "heading_3")]
    Heading3 {
        #[serde(default, rename = "heading_3")]
        payload: TextPayload,
    },
    Paragraph {
        #[serde(default, rename = "paragraph")]
        payload: TextPayload,
    },
    BulletedListItem {
        #[serde(default, rename = "bulleted_list_item")]
        payload: TextPayload,
    },
    NumberedListItem {
        #[serde(default, rename = "numbered_list_item")]
        payload: TextPayload,
    },
    Quote {
        #[serde(default, rename = "quote")]
        payload: TextPayload,
    },
    Toggle {
        #[serde(default, rename = "toggle")]
        payload: TextPayload,
    },
    ToDo {
        #[serde(default, rename = "to_do")]
        payload: TextPayload,
    },
    Callout {
        #[serde(default, rename = "callout")]
        payload: CalloutPayload,
    },
    Code {
        #[serde(default, rename = "code")]
        payload: CodePayload,
    },
    ChildPage {
        #[serde(default, rename = "child_page")]
        payload: ChildPagePayload,
    },
    ChildDatabase {
        #[serde(default, rename = "child_database")]
        payload: ChildPagePayload,
    },
    #[serde(other)]
    Unsupported,
}

/// Payload for block types whose content is a plain rich-text sequence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextPayload {
    #[serde(default)]
    pub rich_text: Vec<RichTextRun>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalloutPayload {
    #[serde(default)]
    pub rich_text: Vec<RichTextRun>,
    #[serde(default)]
    pub icon: Option<CalloutIcon>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalloutIcon {
    #[serde(default)]
    pub emoji: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodePayload {
    #[serde(default)]
    pub rich_text: Vec<RichTextRun>,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChildPagePayload {
    #[serde(default)]
    pub title: String,
}

/// An inline styled text span. Concatenating a block's runs in order
/// reconstructs its full display text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RichTextRun {
    #[serde(default)]
    pub plain_text: String,
    #[serde(default)]
    pub annotations: Annotations,
}

/// Independent style flags. Annotations beyond bold/italic/code exist on
/// the wire but are ignored here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub code: bool,
}

impl Block {
    /// Whether descending into this block's children crosses a page or
    /// database boundary rather than plain nested content
    #[inline]
    pub fn is_page_boundary(&self) -> bool {
        matches!(
            self.kind,
            BlockKind::ChildPage { .. } | BlockKind::ChildDatabase { .. }
        )
    }
}

impl RichTextRun {
    /// Unstyled run, mostly useful in tests and fixtures
    #[inline]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            plain_text: text.into(),
            annotations: Annotations::default(),
        }
    }
}
