// Redline Library
// Exports core modules for the proofreading pipeline and the CLI binary

pub mod chunking;
pub mod diff;
pub mod document;
pub mod review;
pub mod rewrite;
pub mod session;

// Re-export commonly used types for CLI
pub use chunking::{
    count_tokens, estimate_tokens_quick, exceeds_token_limit, split_by_tokens, BudgetError,
    TokenBudget, MAX_INPUT_TOKENS, MAX_TOKENS, RESERVED_TOKENS,
};
pub use diff::{word_diff, DiffSegment};
pub use document::{
    document_stats, BuildResult, DocumentAdapter, DocumentError, DocumentStats, ParagraphStyle,
    SourceParagraph, StyleWarning, TextDocument,
};
pub use review::{ReviewError, ReviewState, ReviewSummary};
pub use rewrite::{
    ChunkOutcome, ChunkStatus, ParagraphOutcome, ProofreadResult, Proofreader, RewriteClient,
    RewriteConfig, RewriteError, RewriteSuggestions, Suggestion,
};
pub use session::{
    delete_session, list_sessions, load_session, save_session, validate_session_id, ProofSession,
    SessionError, SessionStep,
};
