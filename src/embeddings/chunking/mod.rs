
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Represents a chunk of content ready for embedding
#[derive(Debug, Clone, PartialEq)]
pub struct ContentChunk {
    /// The content text
    pub content: String,
    /// The heading path for this chunk, e.g. "Handbook > Onboarding"
    pub heading_path: String,
    /// The index of this chunk within the page
    pub chunk_index: usize,
    /// Estimated token count
    pub token_count: usize,
    /// Whether this chunk contains code blocks
    pub has_code_blocks: bool,
}

/// A heading-delimited slice of a flattened page
#[derive(Debug, Clone, PartialEq)]
pub struct MarkdownSection {
    pub heading_path: String,
    pub content: String,
    pub has_code_blocks: bool,
}

/// Configuration for content chunking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in tokens
    pub target_chunk_size: usize,
    /// Maximum chunk size in tokens before forced splitting
    pub max_chunk_size: usize,
    /// Minimum chunk size in tokens (smaller chunks will be merged)
    pub min_chunk_size: usize,
    /// Overlap size in tokens between adjacent chunks
    pub overlap_size: usize,
    /// Whether to preserve code blocks as single units
    pub preserve_code_blocks: bool,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            target_chunk_size: 650,
            max_chunk_size: 1000,
            min_chunk_size: 100,
            overlap_size: 50,
            preserve_code_blocks: true,
        }
    }
}

/// Chunk one flattened page into embedding-ready pieces. The page is first
/// sliced along its markdown headings so every chunk keeps a heading path
/// for retrieval context, then each section is cut down to the configured
/// token budget.
#[inline]
pub fn chunk_page(
    title: &str,
    markdown: &str,
    config: &ChunkingConfig,
) -> Result<Vec<ContentChunk>> {
    let mut chunks = Vec::new();
    let mut chunk_index = 0;

    for section in split_sections(title, markdown) {
        let section_chunks = chunk_section(&section, config, &mut chunk_index)?;
        chunks.extend(section_chunks);
    }

    let processed = post_process_chunks(chunks, config)?;

    debug!(
        "Chunked page '{}' into {} chunks (avg {} tokens)",
        title,
        processed.len(),
        processed.iter().map(|c| c.token_count).sum::<usize>() / processed.len().max(1)
    );

    Ok(processed)
}

/// Slice markdown into sections along heading lines. Headings inside fenced
/// code blocks are content, not structure. The page title anchors every
/// heading path.
#[inline]
pub fn split_sections(title: &str, markdown: &str) -> Vec<MarkdownSection> {
    let mut sections = Vec::new();
    let mut heading_stack: Vec<(usize, String)> = Vec::new();
    let mut current = String::new();
    let mut in_code_block = false;

    let flush = |sections: &mut Vec<MarkdownSection>,
                 heading_stack: &[(usize, String)],
                 current: &mut String| {
        if !current.trim().is_empty() {
            let content = current.trim().to_string();
            sections.push(MarkdownSection {
                heading_path: heading_path(title, heading_stack),
                has_code_blocks: content.contains("```"),
                content,
            });
        }
        current.clear();
    };

    for line in markdown.lines() {
        if line.trim_start().starts_with("```") {
            in_code_block = !in_code_block;
        }

        if !in_code_block {
            if let Some((level, text)) = parse_heading(line) {
                flush(&mut sections, &heading_stack, &mut current);
                while heading_stack
                    .last()
                    .is_some_and(|(existing, _)| *existing >= level)
                {
                    heading_stack.pop();
                }
                heading_stack.push((level, text));
                continue;
            }
        }

        current.push_str(line);
        current.push('\n');
    }

    flush(&mut sections, &heading_stack, &mut current);
    sections
}

fn parse_heading(line: &str) -> Option<(usize, String)> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|&c| c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = trimmed.trim_start_matches('#');
    rest.strip_prefix(' ')
        .map(|text| (level, text.trim().to_string()))
}

fn heading_path(title: &str, heading_stack: &[(usize, String)]) -> String {
    let mut parts = vec![title.to_string()];
    parts.extend(heading_stack.iter().map(|(_, text)| text.clone()));
    parts.join(" > ")
}

/// Chunk a single section
fn chunk_section(
    section: &MarkdownSection,
    config: &ChunkingConfig,
    chunk_index: &mut usize,
) -> Result<Vec<ContentChunk>> {
    let mut chunks = Vec::new();
    let content = &section.content;

    if content.trim().is_empty() {
        return Ok(chunks);
    }

    let token_count = estimate_token_count(content);

    // Small enough to stand alone
    if token_count <= config.target_chunk_size {
        chunks.push(ContentChunk {
            content: content.clone(),
            heading_path: section.heading_path.clone(),
            chunk_index: *chunk_index,
            token_count,
            has_code_blocks: section.has_code_blocks,
        });
        *chunk_index += 1;
        return Ok(chunks);
    }

    let splits = if section.has_code_blocks && config.preserve_code_blocks {
        split_with_code_preservation(content, config)?
    } else {
        split_by_paragraphs(content, config)?
    };

    for split in splits {
        if split.trim().is_empty() {
            continue;
        }

        let chunk_token_count = estimate_token_count(&split);
        let has_code_blocks = section.has_code_blocks && contains_code_block(&split);
        chunks.push(ContentChunk {
            content: split,
            heading_path: section.heading_path.clone(),
            chunk_index: *chunk_index,
            token_count: chunk_token_count,
            has_code_blocks,
        });
        *chunk_index += 1;
    }

    Ok(chunks)
}

/// Split content while keeping fenced code blocks whole
fn split_with_code_preservation(content: &str, config: &ChunkingConfig) -> Result<Vec<String>> {
    let mut splits = Vec::new();
    let mut current_split = String::new();
    let mut in_code_block = false;
    let mut current_token_count = 0;

    for line in content.lines() {
        let line_with_newline = format!("{}\n", line);
        let line_tokens = estimate_token_count(&line_with_newline);

        if line.trim().starts_with("```") {
            in_code_block = !in_code_block;
        }

        if !in_code_block
            && current_token_count + line_tokens > config.max_chunk_size
            && !current_split.trim().is_empty()
        {
            splits.push(current_split.trim().to_string());
            current_split.clear();
            current_token_count = 0;
        }

        current_split.push_str(&line_with_newline);
        current_token_count += line_tokens;
    }

    if !current_split.trim().is_empty() {
        splits.push(current_split.trim().to_string());
    }

    Ok(splits)
}

/// Split content along paragraph boundaries, falling back to sentence
/// boundaries for paragraphs that alone exceed the budget
fn split_by_paragraphs(content: &str, config: &ChunkingConfig) -> Result<Vec<String>> {
    let mut splits = Vec::new();
    let mut current_split = String::new();
    let mut current_token_count = 0;

    let mut push_piece =
        |piece: &str, splits: &mut Vec<String>, split: &mut String, count: &mut usize| {
            let piece_tokens = estimate_token_count(piece);
            if *count + piece_tokens > config.target_chunk_size && !split.trim().is_empty() {
                splits.push(split.trim().to_string());
                split.clear();
                *count = 0;
            }
            split.push_str(piece);
            split.push_str("\n\n");
            *count += piece_tokens;
        };

    for paragraph in content.split("\n\n") {
        if paragraph.trim().is_empty() {
            continue;
        }

        if estimate_token_count(paragraph) > config.max_chunk_size {
            for sentence in split_by_sentences(paragraph, config)? {
                push_piece(
                    &sentence,
                    &mut splits,
                    &mut current_split,
                    &mut current_token_count,
                );
            }
        } else {
            push_piece(
                paragraph,
                &mut splits,
                &mut current_split,
                &mut current_token_count,
            );
        }
    }

    if !current_split.trim().is_empty() {
        splits.push(current_split.trim().to_string());
    }

    Ok(splits)
}

/// Split text by sentences
fn split_by_sentences(text: &str, config: &ChunkingConfig) -> Result<Vec<String>> {
    let mut splits = Vec::new();
    let mut current_split = String::new();
    let mut current_token_count = 0;

    let sentences = text
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    for (i, sentence) in sentences.iter().enumerate() {
        let sentence_with_punct = if i < sentences.len() - 1 {
            format!("{}. ", sentence)
        } else {
            (*sentence).to_string()
        };

        let sentence_tokens = estimate_token_count(&sentence_with_punct);

        if current_token_count + sentence_tokens > config.target_chunk_size
            && !current_split.trim().is_empty()
        {
            splits.push(current_split.trim().to_string());
            current_split.clear();
            current_token_count = 0;
        }

        current_split.push_str(&sentence_with_punct);
        current_token_count += sentence_tokens;
    }

    if !current_split.trim().is_empty() {
        splits.push(current_split.trim().to_string());
    }

    Ok(splits)
}

/// Post-process chunks to merge small ones and add overlap
fn post_process_chunks(
    chunks: Vec<ContentChunk>,
    config: &ChunkingConfig,
) -> Result<Vec<ContentChunk>> {
    if chunks.is_empty() {
        return Ok(chunks);
    }

    let mut processed = Vec::new();
    let mut pending_merge: Option<ContentChunk> = None;

    for chunk in chunks {
        if let Some(mut pending) = pending_merge.take() {
            if chunk.token_count < config.min_chunk_size
                && pending.token_count + chunk.token_count <= config.max_chunk_size
                && pending.heading_path == chunk.heading_path
            {
                pending.content.push_str("\n\n");
                pending.content.push_str(&chunk.content);
                pending.token_count += chunk.token_count;
                pending.has_code_blocks = pending.has_code_blocks || chunk.has_code_blocks;
                pending_merge = Some(pending);
                continue;
            }
            processed.push(pending);
        }

        if chunk.token_count < config.min_chunk_size {
            pending_merge = Some(chunk);
        } else {
            processed.push(chunk);
        }
    }

    if let Some(pending) = pending_merge {
        processed.push(pending);
    }

    if config.overlap_size > 0 {
        processed = add_overlap(processed, config)?;
    }

    for (i, chunk) in processed.iter_mut().enumerate() {
        chunk.chunk_index = i;
    }

    Ok(processed)
}

/// Add overlap between adjacent chunks of the same section
fn add_overlap(
    mut chunks: Vec<ContentChunk>,
    config: &ChunkingConfig,
) -> Result<Vec<ContentChunk>> {
    let mut i = 1;
    while i < chunks.len() {
        let (left, right) = chunks.split_at_mut(i);
        let prev_chunk = &left[i - 1];
        let curr_chunk = &mut right[0];

        if prev_chunk.heading_path == curr_chunk.heading_path {
            let overlap_text = extract_overlap_text(&prev_chunk.content, config.overlap_size);
            if !overlap_text.is_empty() {
                curr_chunk.content = format!("{}\n\n{}", overlap_text, curr_chunk.content);
                curr_chunk.token_count += estimate_token_count(&overlap_text);
            }
        }
        i += 1;
    }

    Ok(chunks)
}

/// Extract overlap text from the end of a chunk
fn extract_overlap_text(content: &str, overlap_tokens: usize) -> String {
    let words: Vec<&str> = content.split_whitespace().collect();
    let word_count = (overlap_tokens as f64 * 0.75) as usize; // Rough word-to-token ratio

    if words.len() <= word_count {
        return String::new();
    }

    words[words.len() - word_count.min(words.len())..].join(" ")
}

/// Estimate token count using a simple heuristic
/// This is a rough approximation - actual tokenization would be more accurate
#[inline]
pub fn estimate_token_count(text: &str) -> usize {
    // Rough heuristic: 1 token ≈ 0.75 words for English text
    // Add extra tokens for punctuation and special characters
    let word_count = text.split_whitespace().count();
    let punct_count = text.chars().filter(|c| c.is_ascii_punctuation()).count();

    (punct_count as f64).mul_add(0.1, word_count as f64 / 0.75) as usize
}

/// Check if text contains code blocks
fn contains_code_block(text: &str) -> bool {
    text.contains("```") || text.lines().any(|line| line.starts_with("    "))
}
