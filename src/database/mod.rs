pub mod lancedb;
pub mod sqlite;

pub use lancedb::vector_store::{SearchResult, VectorStore};
pub use lancedb::{ChunkMetadata, EmbeddingRecord};
pub use sqlite::Database;
pub use sqlite::models::{NewPage, Page, PageStatus, PageUpdate};
