//! Token-budgeted text splitting.
//!
//! Paragraphs that exceed the per-call input budget are split on sentence
//! boundaries, greedily packed, and fall back to word boundaries for a
//! sentence that alone exceeds the budget. No text is ever dropped,
//! duplicated, or reordered: rejoining the chunks reproduces every
//! non-whitespace token of the input in order.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::tokens::count_tokens;

/// Hard ceiling of the rewrite model's context per call
pub const MAX_TOKENS: u32 = 8192;
/// Reserved headroom for the system instruction and the model's response
pub const RESERVED_TOKENS: u32 = 1000;
/// Budget available for user text in a single call
pub const MAX_INPUT_TOKENS: u32 = MAX_TOKENS - RESERVED_TOKENS; // 7,192

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BudgetError {
    #[error("reserved tokens ({reserved}) leave no input headroom under max tokens ({max})")]
    NoInputHeadroom { max: u32, reserved: u32 },
}

/// Per-call token budget for the rewrite capability.
///
/// Invariant: `max_input_tokens() > 0`, enforced at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBudget {
    max_tokens: u32,
    reserved_tokens: u32,
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self {
            max_tokens: MAX_TOKENS,
            reserved_tokens: RESERVED_TOKENS,
        }
    }
}

impl TokenBudget {
    pub fn new(max_tokens: u32, reserved_tokens: u32) -> Result<Self, BudgetError> {
        if reserved_tokens >= max_tokens {
            return Err(BudgetError::NoInputHeadroom {
                max: max_tokens,
                reserved: reserved_tokens,
            });
        }
        Ok(Self {
            max_tokens,
            reserved_tokens,
        })
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn reserved_tokens(&self) -> u32 {
        self.reserved_tokens
    }

    pub fn max_input_tokens(&self) -> u32 {
        self.max_tokens - self.reserved_tokens
    }
}

/// Split text into chunks that each fit within `max_tokens`.
///
/// Text already within budget comes back as a single trimmed chunk; the
/// budget boundary is inclusive, so text at exactly `max_tokens` is not
/// split. Blank input yields no chunks (callers guard on blank before
/// issuing rewrite calls).
pub fn split_by_tokens(text: &str, max_tokens: u32) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    if count_tokens(text) <= max_tokens {
        return vec![text.trim().to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in split_into_sentences(text) {
        let sentence_tokens = count_tokens(&sentence);

        if sentence_tokens > max_tokens {
            // A single sentence over budget: flush and fall back to words
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            chunks.extend(split_long_sentence(&sentence, max_tokens));
        } else if count_tokens(&current) + sentence_tokens > max_tokens {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            current = sentence;
        } else if current.is_empty() {
            current = sentence;
        } else {
            current.push(' ');
            current.push_str(&sentence);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks.retain(|chunk| !chunk.trim().is_empty());
    chunks
}

/// Split text into trimmed sentences.
///
/// A boundary is `.`, `!`, or `?` followed by whitespace. A plain scan, not
/// an NLP parser: abbreviations like "Dr. Smith" split, which is acceptable
/// because chunks are rejoined after rewriting.
fn split_into_sentences(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut sentences = Vec::new();
    let mut start = 0;

    for i in 0..bytes.len() {
        if matches!(bytes[i], b'.' | b'!' | b'?')
            && bytes.get(i + 1).is_some_and(|b| b.is_ascii_whitespace())
        {
            let sentence = text[start..=i].trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            start = i + 1;
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }

    sentences
}

/// Split an over-budget sentence on whitespace words.
///
/// A single word that alone exceeds the budget is emitted as its own
/// oversized chunk rather than dropped.
fn split_long_sentence(sentence: &str, max_tokens: u32) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in sentence.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };

        if count_tokens(&candidate) > max_tokens {
            if current.is_empty() {
                chunks.push(word.to_string());
            } else {
                chunks.push(std::mem::take(&mut current));
                current = word.to_string();
            }
        } else {
            current = candidate;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
