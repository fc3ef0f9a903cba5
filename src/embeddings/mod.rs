// Embeddings module
// Handles Ollama integration and content chunking

pub mod chunking;
pub mod ollama;

pub use chunking::{ChunkingConfig, ContentChunk, chunk_page, estimate_token_count};
pub use ollama::{ChatMessage, EmbeddingResult, OllamaClient};
