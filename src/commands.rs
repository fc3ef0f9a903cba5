use anyhow::{Context, Result, bail};
use std::io::Write;
use tracing::info;

use crate::chat::ChatSession;
use crate::config::Config;
use crate::database::lancedb::VectorStore;
use crate::database::sqlite::Database;
use crate::embeddings::ollama::OllamaClient;
use crate::indexer::Indexer;

/// Walk a page tree and index its content
#[inline]
pub async fn index_page(page_id: Option<String>, title: Option<String>) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    let Some(page_id) = page_id.or_else(|| config.notion.default_page_id.clone()) else {
        bail!(
            "No page id given and no default page configured. \
             Pass a page id or run 'notion-rag config' to set one."
        );
    };

    info!("Indexing page tree rooted at {}", page_id);

    let mut indexer = Indexer::new(config)
        .await
        .context("Failed to create indexer")?;

    let report = indexer.index_page(&page_id, title.as_deref()).await?;

    println!("Indexed page: {} ({})", report.title, report.page_id);
    println!("  Blocks visited: {}", report.blocks_visited);
    println!("  API requests: {}", report.fetches);
    println!("  Chunks created: {}", report.chunks_created);
    println!("  Embeddings stored: {}", report.embeddings_stored);
    if !report.content_complete {
        println!("  ⚠️  Some blocks could not be fetched; content is partial.");
        println!("     Re-run 'notion-rag index {}' to retry.", report.page_id);
    }

    Ok(())
}

/// List all indexed pages
#[inline]
pub async fn list_pages() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let database = Database::new(&config.database_path())
        .await
        .context("Failed to initialize database")?;

    let pages = database.list_pages().await.context("Failed to list pages")?;

    if pages.is_empty() {
        println!("No pages have been indexed yet.");
        println!("Use 'notion-rag index <page-id>' to index a page tree.");
        return Ok(());
    }

    println!("Indexed Pages ({} total):", pages.len());
    println!();

    for page in &pages {
        println!("📄 {} ({})", page.title, page.page_id);
        println!("   Status: {}", page.status);
        println!("   Chunks: {}", page.chunk_count);

        if !page.content_complete {
            println!("   ⚠️  Content is partial (some blocks failed to fetch)");
        }

        if let Some(error) = &page.error_message {
            println!("   ⚠️  Error: {}", error);
        }

        if let Some(indexed_date) = page.indexed_date {
            println!(
                "   Last Indexed: {}",
                indexed_date.format("%Y-%m-%d %H:%M:%S")
            );
        }

        println!(
            "   Created: {}",
            page.created_date.format("%Y-%m-%d %H:%M:%S")
        );
        println!();
    }

    let completed = pages.iter().filter(|p| p.is_completed()).count();
    let failed = pages.iter().filter(|p| p.is_failed()).count();
    let total_chunks = database.total_chunk_count().await?;

    println!("Summary:");
    println!("  Total Pages: {}", pages.len());
    println!("  Completed: {}", completed);
    println!("  Failed: {}", failed);
    println!("  Total Chunks: {}", total_chunks);

    Ok(())
}

/// Delete an indexed page and its embeddings
#[inline]
pub async fn delete_page(page_id: String) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    let mut indexer = Indexer::new(config)
        .await
        .context("Failed to create indexer")?;

    if indexer.remove_page(&page_id).await? {
        println!("Deleted page: {}", page_id);
        println!("✓ Catalog entry deleted");
        println!("✓ Vector embeddings deleted");
    } else {
        println!("Page not found in the catalog: {}", page_id);
    }

    Ok(())
}

/// Answer a single question against the index
#[inline]
pub async fn ask(question: String) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    let mut session = ChatSession::new(config)
        .await
        .context("Failed to start chat session")?;

    let answer = session.respond(&question).await;
    println!("{}", answer);

    Ok(())
}

/// Interactive chat loop over the index
#[inline]
pub async fn chat() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    let mut session = ChatSession::new(config)
        .await
        .context("Failed to start chat session")?;

    println!("Chatting over the indexed workspace. Type 'exit' or press Ctrl+D to quit.");
    println!();

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        let bytes_read = stdin
            .read_line(&mut line)
            .context("Failed to read from stdin")?;

        if bytes_read == 0 {
            // EOF
            break;
        }

        let question = line.trim();
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }

        let answer = session.respond(question).await;
        println!("{}", answer);
        println!();
    }

    println!("Goodbye.");
    Ok(())
}

/// Show connectivity and index status
#[inline]
pub async fn show_status() -> Result<()> {
    let config = Config::load().unwrap_or_default();

    println!("📊 Notion RAG Status");
    println!("{}", "=".repeat(50));
    println!();

    println!("🗄️  Catalog Status:");
    let database = match Database::new(&config.database_path()).await {
        Ok(db) => {
            println!("   ✅ SQLite: Connected");
            Some(db)
        }
        Err(e) => {
            println!("   ❌ SQLite: Failed to connect - {}", e);
            None
        }
    };

    println!("🤖 Ollama Status:");
    match OllamaClient::new(&config) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!(
                    "   ✅ Ollama: Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!("   📋 Embedding Model: {}", config.ollama.embedding_model);
                println!("   💬 Chat Model: {}", config.ollama.chat_model);
            }
            Err(e) => {
                println!("   ⚠️  Ollama: Connected but unhealthy - {}", e);
            }
        },
        Err(e) => {
            println!("   ❌ Ollama: Failed to connect - {}", e);
        }
    }

    println!("🔍 Vector Database Status:");
    match VectorStore::new(&config).await {
        Ok(store) => match store.count_embeddings().await {
            Ok(count) => {
                println!("   ✅ LanceDB: Connected ({} embeddings)", count);
            }
            Err(e) => {
                println!("   ⚠️  LanceDB: Connected but unreadable - {}", e);
            }
        },
        Err(e) => {
            println!("   ❌ LanceDB: Failed to connect - {}", e);
        }
    }

    println!("📝 Notion Status:");
    if config.notion.token.is_empty() {
        println!("   ❌ No integration token configured");
        println!("      Run 'notion-rag config' to set one.");
    } else {
        println!("   ✅ Integration token configured");
        match &config.notion.default_page_id {
            Some(page_id) => println!("   📄 Default page: {}", page_id),
            None => println!("   📄 No default page set"),
        }
    }

    if let Some(database) = database {
        println!();
        println!("📚 Page Overview:");
        match database.list_pages().await {
            Ok(pages) => {
                if pages.is_empty() {
                    println!("   📭 No pages indexed yet");
                } else {
                    let completed = pages.iter().filter(|p| p.is_completed()).count();
                    let failed = pages.iter().filter(|p| p.is_failed()).count();
                    let partial = pages.iter().filter(|p| !p.content_complete).count();

                    println!("   📊 Total Pages: {}", pages.len());
                    println!("   ✅ Completed: {}", completed);
                    println!("   ❌ Failed: {}", failed);
                    if partial > 0 {
                        println!("   ⚠️  Partial Content: {}", partial);
                    }
                    println!(
                        "   📄 Total Chunks: {}",
                        database.total_chunk_count().await.unwrap_or(0)
                    );
                }
            }
            Err(e) => {
                println!("   ❌ Failed to load page statistics: {}", e);
            }
        }
    }

    println!();
    println!("💡 Next Steps:");
    println!("   • Use 'notion-rag index <page-id>' to index a page tree");
    println!("   • Use 'notion-rag ask \"<question>\"' for a one-off answer");
    println!("   • Use 'notion-rag chat' for an interactive session");

    Ok(())
}
