#[cfg(test)]
mod tests;

use anyhow::Result;
use tracing::{debug, info};

use super::blocks::{Block, BlockKind};
use super::client::BlockSource;
use super::format::format_block;

/// Separator between adjacent fragments in the flattened output
const FRAGMENT_SEPARATOR: &str = "\n\n";
/// Heading used for a child page whose title is empty
const UNTITLED_SUBPAGE: &str = "Subpage";

/// The flattened rendering of one root's subtree. `complete` is the AND of
/// every fetch outcome along the walk: false means at least one subtree is
/// truncated and the content is a prefix of the real page.
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedPage {
    pub content: String,
    pub complete: bool,
    pub blocks_visited: usize,
    pub fetches: usize,
}

impl FlattenedPage {
    fn empty() -> Self {
        Self {
            content: String::new(),
            complete: true,
            blocks_visited: 0,
            fetches: 0,
        }
    }
}

/// Depth-first flattener over a [`BlockSource`]. Traversal uses an explicit
/// frame stack rather than call-stack recursion, so depth is bounded by the
/// configured limit and not by stack size.
#[derive(Debug)]
pub struct PageWalker<S> {
    source: S,
}

/// One in-flight level of the traversal. Fragments accumulate here until
/// the level's blocks are exhausted, then collapse into the parent frame.
struct Frame {
    blocks: std::vec::IntoIter<Block>,
    depth: u32,
    heading: Option<String>,
    fragments: Vec<String>,
}

impl<S: BlockSource> PageWalker<S> {
    #[inline]
    pub fn new(source: S) -> Self {
        Self { source }
    }

    #[inline]
    pub fn into_source(self) -> S {
        self.source
    }

    /// Flatten the subtree rooted at `root_id` into one markdown document.
    ///
    /// Blocks render in server order, never re-sorted. A block's children
    /// appear immediately after its own fragment; descending into a child
    /// page inserts a `##` subsection heading built from the page title.
    /// `max_depth == 0` returns an empty page without issuing any request.
    #[inline]
    pub fn flatten(&mut self, root_id: &str, max_depth: u32) -> Result<FlattenedPage> {
        if max_depth == 0 {
            return Ok(FlattenedPage::empty());
        }

        let mut complete = true;
        let mut blocks_visited = 0;
        let mut fetches = 0;

        let outcome = self.source.list_children(root_id)?;
        fetches += 1;
        complete &= outcome.complete;

        let mut stack = vec![Frame {
            blocks: outcome.blocks.into_iter(),
            depth: max_depth,
            heading: None,
            fragments: Vec::new(),
        }];
        let mut content = String::new();

        loop {
            let next_block = match stack.last_mut() {
                Some(frame) => frame.blocks.next(),
                None => break,
            };

            match next_block {
                Some(block) => {
                    blocks_visited += 1;

                    let fragment = format_block(&block);
                    let mut child_frame = None;

                    if let Some(frame) = stack.last_mut() {
                        if !fragment.is_empty() {
                            frame.fragments.push(fragment);
                        }

                        if should_descend(&block, frame.depth) {
                            let outcome = self.source.list_children(&block.id)?;
                            fetches += 1;
                            complete &= outcome.complete;

                            child_frame = Some(Frame {
                                blocks: outcome.blocks.into_iter(),
                                depth: frame.depth - 1,
                                heading: subsection_heading(&block.kind),
                                fragments: Vec::new(),
                            });
                        }
                    }

                    if let Some(frame) = child_frame {
                        stack.push(frame);
                    }
                }
                None => {
                    if let Some(frame) = stack.pop() {
                        let rendered = collapse_frame(frame);
                        match stack.last_mut() {
                            Some(parent) => {
                                if !rendered.is_empty() {
                                    parent.fragments.push(rendered);
                                }
                            }
                            None => content = rendered,
                        }
                    }
                }
            }
        }

        if !complete {
            info!(
                "Walk of {} returned partial content ({} blocks across {} fetches)",
                root_id, blocks_visited, fetches
            );
        } else {
            debug!(
                "Walk of {} visited {} blocks across {} fetches",
                root_id, blocks_visited, fetches
            );
        }

        Ok(FlattenedPage {
            content: content.trim().to_string(),
            complete,
            blocks_visited,
            fetches,
        })
    }
}

/// Child databases hold rows behind a different API surface, so the walker
/// stops at that boundary; everything else with children is descended while
/// depth remains.
fn should_descend(block: &Block, depth_remaining: u32) -> bool {
    if !block.has_children || depth_remaining <= 1 {
        return false;
    }
    !matches!(block.kind, BlockKind::ChildDatabase { .. })
}

/// A descent into a child page contributes a subsection heading; inline
/// children (toggles, nested lists) contribute none. Empty subtrees drop
/// the heading along with the content, leaving no phantom sections.
fn subsection_heading(kind: &BlockKind) -> Option<String> {
    match kind {
        BlockKind::ChildPage { payload } => {
            let title = payload.title.trim();
            let title = if title.is_empty() {
                UNTITLED_SUBPAGE
            } else {
                title
            };
            Some(format!("## {title}"))
        }
        _ => None,
    }
}

fn collapse_frame(frame: Frame) -> String {
    let content = frame.fragments.join(FRAGMENT_SEPARATOR);
    if content.trim().is_empty() {
        return String::new();
    }
    match frame.heading {
        Some(heading) => format!("{heading}{FRAGMENT_SEPARATOR}{content}"),
        None => content,
    }
}
