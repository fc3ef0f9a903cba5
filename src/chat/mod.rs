// Chat module
// Retrieval-augmented question answering over the indexed workspace


use anyhow::{Context, Result};
use itertools::Itertools;
use tracing::{debug, warn};

use crate::config::Config;
use crate::database::lancedb::{SearchResult, VectorStore};
use crate::embeddings::ollama::{ChatMessage, OllamaClient};

pub const EMPTY_QUESTION_REPLY: &str = "Please ask a valid question.";

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant answering questions about an \
    indexed Notion workspace. Ground every answer in the provided context passages. If the \
    context does not contain the answer, say that you don't know rather than guessing.";

/// One answered question in a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
}

/// A conversational session over the vector index. Failed turns are recorded
/// with the error text as the answer so the conversation can continue.
pub struct ChatSession {
    config: Config,
    vector_store: VectorStore,
    ollama_client: OllamaClient,
    history: Vec<ChatTurn>,
}

impl ChatSession {
    #[inline]
    pub async fn new(config: Config) -> Result<Self> {
        let vector_store = VectorStore::new(&config)
            .await
            .context("Failed to open vector store")?;

        let ollama_client =
            OllamaClient::new(&config).context("Failed to create Ollama client")?;

        Ok(Self {
            config,
            vector_store,
            ollama_client,
            history: Vec::new(),
        })
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Answer one question. Blank input gets a fixed reply and is not
    /// recorded; any pipeline error becomes the turn's answer text.
    #[inline]
    pub async fn respond(&mut self, question: &str) -> String {
        let question = question.trim();
        if question.is_empty() {
            return EMPTY_QUESTION_REPLY.to_string();
        }

        let answer = match self.answer(question).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Failed to answer question: {}", e);
                format!("Error processing your question: {}", e)
            }
        };

        self.history.push(ChatTurn {
            question: question.to_string(),
            answer: answer.clone(),
        });

        answer
    }

    async fn answer(&self, question: &str) -> Result<String> {
        let passages = self.retrieve(question).await?;
        debug!("Retrieved {} passages for question", passages.len());

        let messages = self.build_messages(question, &passages);
        let answer = self
            .ollama_client
            .generate_chat(&messages)
            .context("Failed to generate answer")?;

        Ok(answer)
    }

    async fn retrieve(&self, question: &str) -> Result<Vec<SearchResult>> {
        let query = self
            .ollama_client
            .generate_embedding(question)
            .context("Failed to embed question")?;

        self.vector_store
            .search_similar(&query.embedding, self.config.chat.retrieval_k, None)
            .await
            .context("Failed to search vector store")
    }

    fn build_messages(&self, question: &str, passages: &[SearchResult]) -> Vec<ChatMessage> {
        let system_prompt = self
            .config
            .chat
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);

        let system_content = if passages.is_empty() {
            format!("{}\n\nNo context passages were found for this question.", system_prompt)
        } else {
            let context = passages
                .iter()
                .map(|p| {
                    format!(
                        "[{}]\n{}",
                        p.chunk_metadata.heading_path, p.chunk_metadata.content
                    )
                })
                .join("\n\n---\n\n");
            format!("{}\n\nContext passages:\n\n{}", system_prompt, context)
        };

        let mut messages = Vec::with_capacity(self.history.len() * 2 + 2);
        messages.push(ChatMessage::system(system_content));

        for turn in &self.history {
            messages.push(ChatMessage::user(turn.question.clone()));
            messages.push(ChatMessage::assistant(turn.answer.clone()));
        }

        messages.push(ChatMessage::user(question.to_string()));
        messages
    }
}
