//! Rewrite Capability Module
//!
//! Wraps the external text-rewriting API behind a soft-fail client and
//! drives per-paragraph proofreading with token-budgeted chunking.

pub mod client;
pub mod proofreader;

// Re-export public types for external use
pub use client::{RewriteClient, RewriteConfig, RewriteError, RewriteSuggestions, Suggestion};
pub use proofreader::{
    ChunkOutcome, ChunkStatus, ParagraphOutcome, ProofreadResult, Proofreader,
};
