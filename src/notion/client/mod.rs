
use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

use super::blocks::Block;
use crate::RagError;
use crate::config::NotionConfig;

const NOTION_API_URL: &str = "https://api.notion.com";
/// Provider maximum; fixed to minimize round-trips
const PAGE_SIZE: u32 = 100;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// Anything that can list the children of a block. The walker depends on
/// this seam rather than on the HTTP client directly, which keeps traversal
/// testable against an in-memory tree.
pub trait BlockSource {
    fn list_children(&mut self, block_id: &str) -> Result<FetchOutcome>;
}

/// Result of listing one block's children. `complete` is false when a
/// request failed mid-pagination and the blocks are only a prefix of what
/// the server holds, so callers can tell partial data from an exhausted tree.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub blocks: Vec<Block>,
    pub complete: bool,
}

/// Authenticated, paginated accessor for the Notion block children
/// endpoint. Carries no state between calls beyond the pacing timestamp,
/// so it must not be shared across concurrent walks.
#[derive(Debug)]
pub struct NotionClient {
    agent: ureq::Agent,
    base_url: Url,
    token: String,
    version: String,
    request_delay: Duration,
    retry_attempts: u32,
    last_request_time: Option<Instant>,
}

#[derive(Debug, Deserialize)]
struct ChildListResponse {
    #[serde(default)]
    results: Vec<Block>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

impl NotionClient {
    #[inline]
    pub fn new(config: &NotionConfig) -> Result<Self> {
        if config.token.trim().is_empty() {
            return Err(RagError::Config(
                "Notion token is not configured; run `notion-rag config` first".to_string(),
            )
            .into());
        }

        let base_url = Url::parse(NOTION_API_URL).context("Failed to parse Notion API URL")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            agent,
            base_url,
            token: config.token.clone(),
            version: config.version.clone(),
            request_delay: Duration::from_millis(config.request_delay_ms),
            retry_attempts: config.retry_attempts.max(1),
            last_request_time: None,
        })
    }

    /// Point the client at a different host, used by tests against a mock
    /// server
    #[inline]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    fn children_url(&self, block_id: &str, cursor: Option<&str>) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&format!("/v1/blocks/{}/children", block_id))
            .with_context(|| format!("Failed to build children URL for block {}", block_id))?;

        url.query_pairs_mut()
            .append_pair("page_size", &PAGE_SIZE.to_string());
        if let Some(cursor) = cursor {
            url.query_pairs_mut().append_pair("start_cursor", cursor);
        }

        Ok(url)
    }

    /// Enforce the fixed inter-request delay. Conservative stand-in for the
    /// provider's rate limiter; swapping in something adaptive only touches
    /// this method.
    fn apply_rate_limit(&mut self) {
        if let Some(last_time) = self.last_request_time {
            let elapsed = last_time.elapsed();
            if elapsed < self.request_delay {
                let sleep_duration = self.request_delay - elapsed;
                debug!("Rate limiting: sleeping for {:?}", sleep_duration);
                std::thread::sleep(sleep_duration);
            }
        }

        self.last_request_time = Some(Instant::now());
    }

    fn make_request_with_retry(&mut self, url: &Url) -> Result<String> {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            self.apply_rate_limit();
            debug!("Notion request attempt {}/{}: {}", attempt, self.retry_attempts, url);

            let result = self
                .agent
                .get(url.as_str())
                .header("Authorization", &format!("Bearer {}", self.token))
                .header("Notion-Version", &self.version)
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string());

            match result {
                Ok(body) => {
                    debug!("Request succeeded on attempt {}", attempt);
                    return Ok(body);
                }
                Err(error) => {
                    let should_retry = match &error {
                        ureq::Error::StatusCode(status) => {
                            if *status >= 500 || *status == 429 {
                                warn!(
                                    "Retryable status {} from Notion, attempt {}/{}",
                                    status, attempt, self.retry_attempts
                                );
                                true
                            } else {
                                warn!("Client error (status {}), not retrying", status);
                                return Err(anyhow!("Notion API error: HTTP {}", status));
                            }
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Transport error: {}, attempt {}/{}",
                                error, attempt, self.retry_attempts
                            );
                            true
                        }
                        _ => {
                            warn!("Non-retryable error: {}", error);
                            false
                        }
                    };

                    if !should_retry {
                        return Err(anyhow!("Notion request failed: {}", error));
                    }

                    last_error = Some(anyhow!("Notion request error: {}", error));

                    if attempt < self.retry_attempts {
                        let delay_ms = EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000;
                        debug!("Waiting {}ms before retry", delay_ms);
                        std::thread::sleep(Duration::from_millis(delay_ms));
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("Request failed after retries")))
    }
}

impl BlockSource for NotionClient {
    /// Fetch every child of `block_id`, following the continuation cursor
    /// until the server reports no more pages. Expected failures never
    /// propagate: a request that fails after retries truncates the result
    /// to the pages already fetched and marks the outcome incomplete.
    #[inline]
    fn list_children(&mut self, block_id: &str) -> Result<FetchOutcome> {
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let url = self.children_url(block_id, cursor.as_deref())?;

            let body = match self.make_request_with_retry(&url) {
                Ok(body) => body,
                Err(error) => {
                    warn!(
                        "Fetch for block {} failed after {} blocks: {}",
                        block_id,
                        blocks.len(),
                        error
                    );
                    return Ok(FetchOutcome {
                        blocks,
                        complete: false,
                    });
                }
            };

            let page: ChildListResponse = match serde_json::from_str(&body) {
                Ok(page) => page,
                Err(error) => {
                    warn!("Malformed children response for block {}: {}", block_id, error);
                    return Ok(FetchOutcome {
                        blocks,
                        complete: false,
                    });
                }
            };

            blocks.extend(page.results);

            if !page.has_more {
                break;
            }

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => {
                    warn!(
                        "Server reported more pages for block {} but sent no cursor",
                        block_id
                    );
                    return Ok(FetchOutcome {
                        blocks,
                        complete: false,
                    });
                }
            }
        }

        debug!("Fetched {} children for block {}", blocks.len(), block_id);
        Ok(FetchOutcome {
            blocks,
            complete: true,
        })
    }
}
