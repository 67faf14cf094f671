//! Proofreading Orchestrator
//!
//! Decides whether a paragraph needs chunking, drives per-chunk rewrite
//! calls in document order, and rejoins the results. Every chunk carries an
//! explicit outcome so a failed call is visible instead of silently
//! swallowed; the failed chunk's original text is kept in position.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::client::{RewriteClient, RewriteSuggestions};
use crate::chunking::{count_tokens, split_by_tokens, TokenBudget};

/// How a single chunk fared against the rewrite capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ChunkStatus {
    /// The rewrite call succeeded (the result may still equal the input)
    Rewritten,
    /// The call failed; the chunk's original text was kept
    KeptOriginal { reason: String },
}

/// Outcome of one chunk's rewrite call, in chunk order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkOutcome {
    pub index: usize,
    #[serde(flatten)]
    pub status: ChunkStatus,
}

/// Result of proofreading one paragraph
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofreadResult {
    pub text: String,
    pub chunk_count: usize,
    pub outcomes: Vec<ChunkOutcome>,
}

impl ProofreadResult {
    /// Chunks whose original text was kept after a failed call
    pub fn kept_original_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, ChunkStatus::KeptOriginal { .. }))
            .count()
    }
}

/// Per-paragraph record of how the rewrite went, for the review boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphOutcome {
    pub index: usize,
    pub chunk_count: usize,
    pub kept_original_chunks: usize,
}

/// Drives rewrite calls for paragraphs, chunking where necessary
pub struct Proofreader {
    client: RewriteClient,
    budget: TokenBudget,
}

impl Proofreader {
    pub fn new(client: RewriteClient) -> Self {
        Self {
            client,
            budget: TokenBudget::default(),
        }
    }

    pub fn with_budget(client: RewriteClient, budget: TokenBudget) -> Self {
        Self { client, budget }
    }

    pub fn budget(&self) -> &TokenBudget {
        &self.budget
    }

    /// Proofread one paragraph, chunking when it exceeds the input budget.
    ///
    /// Blank input is returned unchanged without an API call. Chunks are
    /// processed strictly in order, and a failure on one chunk never blocks
    /// the rest.
    pub async fn proofread(&self, text: &str) -> ProofreadResult {
        if text.trim().is_empty() {
            return ProofreadResult {
                text: text.to_string(),
                chunk_count: 0,
                outcomes: Vec::new(),
            };
        }

        let max_input = self.budget.max_input_tokens();
        if count_tokens(text) <= max_input {
            let (corrected, status) = self.rewrite_chunk(text).await;
            return ProofreadResult {
                text: corrected,
                chunk_count: 1,
                outcomes: vec![ChunkOutcome { index: 0, status }],
            };
        }

        let chunks = split_by_tokens(text, max_input);
        debug!(chunks = chunks.len(), "Splitting over-budget paragraph");

        let mut corrected_chunks = Vec::with_capacity(chunks.len());
        let mut outcomes = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.iter().enumerate() {
            let (corrected, status) = self.rewrite_chunk(chunk).await;
            corrected_chunks.push(corrected);
            outcomes.push(ChunkOutcome { index, status });
        }

        ProofreadResult {
            text: rejoin_chunks(&corrected_chunks),
            chunk_count: corrected_chunks.len(),
            outcomes,
        }
    }

    /// Proofread every paragraph in document order.
    ///
    /// Empty paragraphs pass through untouched, preserving their position.
    /// Returns the corrected paragraphs plus an outcome per processed
    /// paragraph.
    pub async fn proofread_document(
        &self,
        paragraphs: &[String],
    ) -> (Vec<String>, Vec<ParagraphOutcome>) {
        let mut corrected = Vec::with_capacity(paragraphs.len());
        let mut outcomes = Vec::new();

        for (index, paragraph) in paragraphs.iter().enumerate() {
            if paragraph.trim().is_empty() {
                corrected.push(paragraph.clone());
                continue;
            }

            info!(
                paragraph = index + 1,
                total = paragraphs.len(),
                words = paragraph.split_whitespace().count(),
                "Processing paragraph"
            );
            let result = self.proofread(paragraph).await;
            outcomes.push(ParagraphOutcome {
                index,
                chunk_count: result.chunk_count,
                kept_original_chunks: result.kept_original_count(),
            });
            corrected.push(result.text);
        }

        (corrected, outcomes)
    }

    /// Structured rewrite for a single within-budget text. Any failure
    /// degrades to the original text with no suggestions.
    pub async fn proofread_with_suggestions(&self, text: &str) -> RewriteSuggestions {
        if text.trim().is_empty() {
            return RewriteSuggestions {
                corrected: text.to_string(),
                suggestions: Vec::new(),
            };
        }
        match self.client.rewrite_with_suggestions(text).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Structured rewrite failed, keeping original text");
                RewriteSuggestions {
                    corrected: text.to_string(),
                    suggestions: Vec::new(),
                }
            }
        }
    }

    /// One soft-fail rewrite call: a failed call keeps the chunk's original
    /// text and records the reason.
    async fn rewrite_chunk(&self, text: &str) -> (String, ChunkStatus) {
        match self.client.rewrite(text).await {
            Ok(corrected) => (corrected, ChunkStatus::Rewritten),
            Err(e) => {
                warn!(error = %e, "Rewrite call failed, keeping original text");
                (
                    text.to_string(),
                    ChunkStatus::KeptOriginal {
                        reason: e.to_string(),
                    },
                )
            }
        }
    }
}

/// Rejoin corrected chunks in order.
///
/// A chunk starting with a list marker gets a paragraph break so list items
/// are not merged into a running sentence; everything else joins with a
/// single space. Best-effort: paragraph breaks inside a chunked unit are
/// not recovered, and a chunk boundary falling mid-sentence stays as the
/// splitter produced it.
fn rejoin_chunks(chunks: &[String]) -> String {
    let mut result = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            result.push_str(chunk);
        } else if starts_with_list_marker(chunk) {
            result.push_str("\n\n");
            result.push_str(chunk);
        } else {
            result.push(' ');
            result.push_str(chunk);
        }
    }
    result
}

/// Bullet (`•`, `-`) or enumerated (`12.`) list prefix
fn starts_with_list_marker(text: &str) -> bool {
    if text.starts_with('•') || text.starts_with('-') {
        return true;
    }
    let digits = text.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && text[digits..].starts_with('.')
}
