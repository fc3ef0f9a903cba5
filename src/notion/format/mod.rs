
use super::blocks::{Block, BlockKind, RichTextRun};

/// Render one block as a markdown fragment. Pure and idempotent: the same
/// block always yields the same string, and blocks with no renderable
/// content yield an empty string so the walker can drop them without
/// leaving blank lines behind.
#[inline]
pub fn format_block(block: &Block) -> String {
    match &block.kind {
        BlockKind::Heading1 { payload } => heading(1, &payload.rich_text),
        BlockKind::Heading2 { payload } => heading(2, &payload.rich_text),
        BlockKind::Heading3 { payload } => heading(3, &payload.rich_text),
        BlockKind::BulletedListItem { payload } => prefixed("- ", &payload.rich_text),
        // The source carries no item ordinals, so every numbered item
        // renders as "1." and markdown renumbers on display
        BlockKind::NumberedListItem { payload } => prefixed("1. ", &payload.rich_text),
        BlockKind::Quote { payload } => prefixed("> ", &payload.rich_text),
        BlockKind::Callout { payload } => {
            let text = render_rich_text(&payload.rich_text);
            if text.is_empty() {
                return String::new();
            }
            match payload.icon.as_ref().and_then(|icon| icon.emoji.as_deref()) {
                Some(emoji) => format!("{emoji} {text}"),
                None => text,
            }
        }
        BlockKind::Code { payload } => {
            let text = render_rich_text(&payload.rich_text);
            if text.is_empty() {
                return String::new();
            }
            format!("```{}\n{}\n```", payload.language, text)
        }
        BlockKind::Paragraph { payload }
        | BlockKind::Toggle { payload }
        | BlockKind::ToDo { payload } => render_rich_text(&payload.rich_text),
        BlockKind::ChildPage { .. } | BlockKind::ChildDatabase { .. } | BlockKind::Unsupported => {
            String::new()
        }
    }
}

/// Concatenate rich-text runs in source order, wrapping each run in its
/// markdown style markers. Bold, italic, and code are independent and can
/// combine on a single run.
#[inline]
pub fn render_rich_text(runs: &[RichTextRun]) -> String {
    let mut out = String::new();
    for run in runs {
        let mut text = run.plain_text.clone();
        if run.annotations.bold {
            text = format!("**{text}**");
        }
        if run.annotations.italic {
            text = format!("*{text}*");
        }
        if run.annotations.code {
            text = format!("`{text}`");
        }
        out.push_str(&text);
    }
    out
}

fn heading(level: usize, runs: &[RichTextRun]) -> String {
    let text = render_rich_text(runs);
    if text.is_empty() {
        return String::new();
    }
    format!("{} {}", "#".repeat(level), text)
}

fn prefixed(prefix: &str, runs: &[RichTextRun]) -> String {
    let text = render_rich_text(runs);
    if text.is_empty() {
        return String::new();
    }
    format!("{prefix}{text}")
}
