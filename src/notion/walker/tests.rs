use super::*;
use crate::notion::blocks::{
    Annotations, ChildPagePayload, RichTextRun, TextPayload,
};
use crate::notion::client::FetchOutcome;
use std::collections::{HashMap, HashSet};

/// In-memory block tree standing in for the Notion API
#[derive(Default)]
struct StubSource {
    children: HashMap<String, Vec<Block>>,
    incomplete: HashSet<String>,
    calls: Vec<String>,
}

impl StubSource {
    fn with_children(mut self, id: &str, blocks: Vec<Block>) -> Self {
        self.children.insert(id.to_string(), blocks);
        self
    }

    fn with_incomplete(mut self, id: &str) -> Self {
        self.incomplete.insert(id.to_string());
        self
    }
}

impl BlockSource for StubSource {
    fn list_children(&mut self, block_id: &str) -> anyhow::Result<FetchOutcome> {
        self.calls.push(block_id.to_string());
        Ok(FetchOutcome {
            blocks: self.children.get(block_id).cloned().unwrap_or_default(),
            complete: !self.incomplete.contains(block_id),
        })
    }
}

fn paragraph(id: &str, text: &str) -> Block {
    Block {
        id: id.to_string(),
        has_children: false,
        kind: BlockKind::Paragraph {
            payload: TextPayload {
                rich_text: vec![RichTextRun::plain(text)],
            },
        },
    }
}

fn heading1(id: &str, text: &str) -> Block {
    Block {
        id: id.to_string(),
        has_children: false,
        kind: BlockKind::Heading1 {
            payload: TextPayload {
                rich_text: vec![RichTextRun::plain(text)],
            },
        },
    }
}

fn bold_bullet(id: &str, text: &str) -> Block {
    Block {
        id: id.to_string(),
        has_children: false,
        kind: BlockKind::BulletedListItem {
            payload: TextPayload {
                rich_text: vec![RichTextRun {
                    plain_text: text.to_string(),
                    annotations: Annotations {
                        bold: true,
                        ..Annotations::default()
                    },
                }],
            },
        },
    }
}

fn toggle(id: &str, text: &str) -> Block {
    Block {
        id: id.to_string(),
        has_children: true,
        kind: BlockKind::Toggle {
            payload: TextPayload {
                rich_text: vec![RichTextRun::plain(text)],
            },
        },
    }
}

fn child_page(id: &str, title: &str) -> Block {
    Block {
        id: id.to_string(),
        has_children: true,
        kind: BlockKind::ChildPage {
            payload: ChildPagePayload {
                title: title.to_string(),
            },
        },
    }
}

fn child_database(id: &str, title: &str) -> Block {
    Block {
        id: id.to_string(),
        has_children: true,
        kind: BlockKind::ChildDatabase {
            payload: ChildPagePayload {
                title: title.to_string(),
            },
        },
    }
}

#[test]
fn zero_depth_makes_no_requests() {
    let source = StubSource::default().with_children("root", vec![paragraph("p1", "text")]);
    let mut walker = PageWalker::new(source);

    let page = walker.flatten("root", 0).expect("walk should succeed");

    assert_eq!(page.content, "");
    assert_eq!(page.fetches, 0);
    assert!(walker.into_source().calls.is_empty());
}

#[test]
fn leaf_blocks_trigger_no_child_fetch() {
    let source = StubSource::default()
        .with_children("root", vec![paragraph("p1", "one"), paragraph("p2", "two")]);
    let mut walker = PageWalker::new(source);

    walker.flatten("root", 3).expect("walk should succeed");

    assert_eq!(walker.into_source().calls, vec!["root"]);
}

#[test]
fn heading_and_bullet_scenario() {
    let source = StubSource::default().with_children(
        "root",
        vec![heading1("h", "Intro"), bold_bullet("b", "Step one")],
    );
    let mut walker = PageWalker::new(source);

    let page = walker.flatten("root", 2).expect("walk should succeed");

    assert_eq!(page.content, "# Intro\n\n- **Step one**");
    assert!(page.complete);
    assert_eq!(page.blocks_visited, 2);
}

#[test]
fn child_page_gets_subsection_heading() {
    let source = StubSource::default()
        .with_children("root", vec![child_page("sub", "Details")])
        .with_children("sub", vec![paragraph("p", "More info.")]);
    let mut walker = PageWalker::new(source);

    let page = walker.flatten("root", 2).expect("walk should succeed");

    assert_eq!(page.content, "## Details\n\nMore info.");
}

#[test]
fn untitled_child_page_falls_back_to_generic_label() {
    let source = StubSource::default()
        .with_children("root", vec![child_page("sub", "  ")])
        .with_children("sub", vec![paragraph("p", "body")]);
    let mut walker = PageWalker::new(source);

    let page = walker.flatten("root", 2).expect("walk should succeed");

    assert_eq!(page.content, "## Subpage\n\nbody");
}

#[test]
fn empty_child_page_leaves_no_phantom_heading() {
    let source = StubSource::default()
        .with_children("root", vec![paragraph("p", "kept"), child_page("sub", "Empty")])
        .with_children("sub", vec![]);
    let mut walker = PageWalker::new(source);

    let page = walker.flatten("root", 3).expect("walk should succeed");

    assert_eq!(page.content, "kept");
}

#[test]
fn sibling_order_is_preserved() {
    let source = StubSource::default().with_children(
        "root",
        vec![
            paragraph("p1", "alpha"),
            paragraph("p2", "beta"),
            paragraph("p3", "alpha"),
            paragraph("p4", "gamma"),
        ],
    );
    let mut walker = PageWalker::new(source);

    let page = walker.flatten("root", 1).expect("walk should succeed");

    // Same relative order as the source, duplicates included
    assert_eq!(page.content, "alpha\n\nbeta\n\nalpha\n\ngamma");
}

#[test]
fn child_content_follows_parent_fragment() {
    let source = StubSource::default()
        .with_children(
            "root",
            vec![toggle("t", "parent"), paragraph("after", "sibling")],
        )
        .with_children("t", vec![paragraph("n", "nested")]);
    let mut walker = PageWalker::new(source);

    let page = walker.flatten("root", 2).expect("walk should succeed");

    // Nested content lands between its parent block and the next sibling
    assert_eq!(page.content, "parent\n\nnested\n\nsibling");
}

#[test]
fn depth_limit_excludes_grandchildren() {
    let source = StubSource::default()
        .with_children("root", vec![paragraph("r", "root text"), toggle("c", "child text")])
        .with_children("c", vec![toggle("g", "grandchild text")])
        .with_children("g", vec![paragraph("deep", "too deep")]);

    let mut walker = PageWalker::new(source);
    let page = walker.flatten("root", 1).expect("walk should succeed");
    assert_eq!(page.content, "root text\n\nchild text");

    let source = StubSource::default()
        .with_children("root", vec![paragraph("r", "root text"), toggle("c", "child text")])
        .with_children("c", vec![toggle("g", "grandchild text")])
        .with_children("g", vec![paragraph("deep", "too deep")]);

    let mut walker = PageWalker::new(source);
    let page = walker.flatten("root", 2).expect("walk should succeed");
    assert_eq!(page.content, "root text\n\nchild text\n\ngrandchild text");
    assert!(!page.content.contains("too deep"));
}

#[test]
fn child_database_is_not_descended() {
    let source = StubSource::default()
        .with_children("root", vec![child_database("db", "Inventory")])
        .with_children("db", vec![paragraph("row", "should not appear")]);
    let mut walker = PageWalker::new(source);

    let page = walker.flatten("root", 5).expect("walk should succeed");

    assert_eq!(page.content, "");
    assert_eq!(walker.into_source().calls, vec!["root"]);
}

#[test]
fn empty_root_is_not_an_error() {
    let source = StubSource::default();
    let mut walker = PageWalker::new(source);

    let page = walker.flatten("missing", 3).expect("walk should succeed");

    assert_eq!(page.content, "");
    assert!(page.complete);
}

#[test]
fn partial_fetch_marks_page_incomplete() {
    let source = StubSource::default()
        .with_children("root", vec![paragraph("p", "kept"), toggle("t", "branch")])
        .with_children("t", vec![paragraph("n", "nested")])
        .with_incomplete("t");
    let mut walker = PageWalker::new(source);

    let page = walker.flatten("root", 3).expect("walk should succeed");

    // Partial data is still returned, but the flag survives to the top
    assert_eq!(page.content, "kept\n\nbranch\n\nnested");
    assert!(!page.complete);
}

#[test]
fn unsupported_blocks_descend_but_render_nothing() {
    let mystery = Block {
        id: "m".to_string(),
        has_children: true,
        kind: BlockKind::Unsupported,
    };
    let source = StubSource::default()
        .with_children("root", vec![mystery])
        .with_children("m", vec![paragraph("p", "inner")]);
    let mut walker = PageWalker::new(source);

    let page = walker.flatten("root", 2).expect("walk should succeed");

    assert_eq!(page.content, "inner");
}
