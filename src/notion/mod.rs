// Notion source tree module
// Fetches, formats, and flattens a workspace page tree into indexable text

pub mod blocks;
pub mod client;
pub mod format;
pub mod walker;

pub use blocks::{Annotations, Block, BlockKind, RichTextRun};
pub use client::{BlockSource, FetchOutcome, NotionClient};
pub use format::{format_block, render_rich_text};
pub use walker::{FlattenedPage, PageWalker};
