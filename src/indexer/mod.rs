// Indexer module
// Runs the walk -> chunk -> embed -> store pipeline for one page tree


use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::database::lancedb::{ChunkMetadata, EmbeddingRecord, VectorStore};
use crate::database::sqlite::Database;
use crate::database::sqlite::models::{NewPage, Page, PageStatus, PageUpdate};
use crate::embeddings::chunking::{ContentChunk, chunk_page};
use crate::embeddings::ollama::OllamaClient;
use crate::notion::{NotionClient, PageWalker};

/// Indexes Notion page trees into the catalog and vector store
pub struct Indexer {
    config: Config,
    database: Database,
    vector_store: VectorStore,
    ollama_client: OllamaClient,
}

/// Summary of one indexing run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexingReport {
    pub page_id: String,
    pub title: String,
    pub blocks_visited: usize,
    pub fetches: usize,
    pub chunks_created: usize,
    pub embeddings_stored: usize,
    pub content_complete: bool,
}

impl Indexer {
    #[inline]
    pub async fn new(config: Config) -> Result<Self> {
        let database = Database::new(&config.database_path())
            .await
            .context("Failed to initialize SQLite database")?;

        let vector_store = VectorStore::new(&config)
            .await
            .context("Failed to initialize LanceDB vector store")?;

        let ollama_client =
            OllamaClient::new(&config).context("Failed to initialize Ollama client")?;

        Ok(Self {
            config,
            database,
            vector_store,
            ollama_client,
        })
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Walk one page tree and index its content. Re-running for an already
    /// indexed page replaces its chunks.
    #[inline]
    pub async fn index_page(&mut self, page_id: &str, title: Option<&str>) -> Result<IndexingReport> {
        let catalog_entry = self.upsert_catalog_entry(page_id, title).await?;
        let title = catalog_entry.title.clone();

        info!("Indexing page '{}' ({})", title, page_id);

        self.database
            .update_page(
                catalog_entry.id,
                PageUpdate {
                    status: Some(PageStatus::Indexing),
                    ..PageUpdate::default()
                },
            )
            .await?;

        match self.run_pipeline(page_id, &title).await {
            Ok(report) => {
                self.database
                    .update_page(
                        catalog_entry.id,
                        PageUpdate {
                            status: Some(PageStatus::Completed),
                            chunk_count: Some(report.chunks_created as i64),
                            content_complete: Some(report.content_complete),
                            indexed_date: Some(Utc::now().naive_utc()),
                            ..PageUpdate::default()
                        },
                    )
                    .await?;

                info!(
                    "Indexed page '{}': {} chunks from {} blocks",
                    title, report.chunks_created, report.blocks_visited
                );
                Ok(report)
            }
            Err(e) => {
                self.database
                    .update_page(
                        catalog_entry.id,
                        PageUpdate {
                            status: Some(PageStatus::Failed),
                            error_message: Some(e.to_string()),
                            ..PageUpdate::default()
                        },
                    )
                    .await?;
                Err(e)
            }
        }
    }

    async fn run_pipeline(&mut self, page_id: &str, title: &str) -> Result<IndexingReport> {
        let client = NotionClient::new(&self.config.notion)
            .context("Failed to create Notion client")?;
        let mut walker = PageWalker::new(client);

        let flattened = walker
            .flatten(page_id, self.config.notion.max_depth)
            .context("Failed to walk page tree")?;

        if !flattened.complete {
            warn!(
                "Walk of page {} returned partial content ({} blocks)",
                page_id, flattened.blocks_visited
            );
        }

        if flattened.content.is_empty() {
            debug!("Page {} has no renderable content", page_id);
            self.vector_store.delete_page_embeddings(page_id).await?;
            return Ok(IndexingReport {
                page_id: page_id.to_string(),
                title: title.to_string(),
                blocks_visited: flattened.blocks_visited,
                fetches: flattened.fetches,
                chunks_created: 0,
                embeddings_stored: 0,
                content_complete: flattened.complete,
            });
        }

        let chunks = chunk_page(title, &flattened.content, &self.config.chunking)
            .context("Failed to chunk page content")?;

        debug!("Generated {} chunks for page {}", chunks.len(), page_id);

        let records = self.embed_chunks(page_id, title, &chunks)?;
        let embeddings_stored = records.len();

        // Replace any previous version of this page in one pass
        self.vector_store.delete_page_embeddings(page_id).await?;
        self.vector_store
            .store_embeddings_batch(records)
            .await
            .context("Failed to store embeddings")?;

        // Compaction is best effort, search still works without it
        if let Err(e) = self.vector_store.optimize().await {
            warn!("Failed to optimize vector store: {}", e);
        }

        Ok(IndexingReport {
            page_id: page_id.to_string(),
            title: title.to_string(),
            blocks_visited: flattened.blocks_visited,
            fetches: flattened.fetches,
            chunks_created: chunks.len(),
            embeddings_stored,
            content_complete: flattened.complete,
        })
    }

    /// Generate embeddings for all chunks, batched by the Ollama client
    fn embed_chunks(
        &self,
        page_id: &str,
        title: &str,
        chunks: &[ContentChunk],
    ) -> Result<Vec<EmbeddingRecord>> {
        let progress = ProgressBar::new(chunks.len() as u64);
        progress.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} chunks embedded",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut records = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(self.config.ollama.batch_size as usize) {
            let results = self
                .ollama_client
                .generate_chunk_embeddings(batch)
                .context("Failed to generate embeddings")?;

            for (chunk, result) in batch.iter().zip(results.iter()) {
                records.push(EmbeddingRecord {
                    id: Uuid::new_v4().to_string(),
                    vector: result.embedding.clone(),
                    metadata: ChunkMetadata {
                        page_id: page_id.to_string(),
                        page_title: title.to_string(),
                        heading_path: chunk.heading_path.clone(),
                        content: chunk.content.clone(),
                        token_count: chunk.token_count as u32,
                        chunk_index: chunk.chunk_index as u32,
                        created_at: Utc::now().to_rfc3339(),
                    },
                });
            }

            progress.inc(batch.len() as u64);
        }

        progress.finish_and_clear();
        Ok(records)
    }

    /// Remove a page's catalog entry and its embeddings
    #[inline]
    pub async fn remove_page(&mut self, page_id: &str) -> Result<bool> {
        let Some(page) = self.database.get_page_by_page_id(page_id).await? else {
            return Ok(false);
        };

        self.vector_store.delete_page_embeddings(page_id).await?;
        self.database.delete_page(page.id).await?;

        info!("Removed page '{}' ({})", page.title, page_id);
        Ok(true)
    }

    async fn upsert_catalog_entry(&self, page_id: &str, title: Option<&str>) -> Result<Page> {
        if let Some(existing) = self.database.get_page_by_page_id(page_id).await? {
            if let Some(title) = title {
                if title != existing.title {
                    return self
                        .database
                        .update_page(
                            existing.id,
                            PageUpdate {
                                title: Some(title.to_string()),
                                ..PageUpdate::default()
                            },
                        )
                        .await?
                        .context("Catalog entry disappeared during update");
                }
            }
            return Ok(existing);
        }

        self.database
            .create_page(NewPage {
                page_id: page_id.to_string(),
                title: title.unwrap_or("Untitled").to_string(),
            })
            .await
    }
}
