//! Redline CLI
//!
//! Command-line interface for the proofreading pipeline: process a
//! document, review and approve suggested changes, and export the final
//! corrected document. Output is JSON on stdout; logs go to stderr.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use redline_lib::{
    count_tokens, document_stats, load_session, save_session, split_by_tokens, word_diff,
    DiffSegment, DocumentAdapter, DocumentStats, ProofSession, Proofreader, RewriteClient,
    SessionStep, StyleWarning, TextDocument, MAX_INPUT_TOKENS,
};

#[derive(Parser)]
#[command(name = "redline")]
#[command(about = "Redline CLI - AI proofreading with human review", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a document and run the proofreading pass
    Process {
        /// Path to the document (UTF-8 text, one paragraph per line)
        file: PathBuf,
    },
    /// Session management commands
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Build the final corrected document from a reviewed session
    Export {
        /// Session ID (without sess_ prefix)
        session_id: String,
        /// Where to write the corrected document
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Token accounting commands
    Tokens {
        #[command(subcommand)]
        action: TokensAction,
    },
    /// Document statistics without processing
    Stats {
        /// Path to the document
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// List all sessions
    List,
    /// Show one session's state
    Show {
        /// Session ID (without sess_ prefix)
        session_id: String,
    },
    /// Reviewed paragraphs with word-level diffs
    Review {
        session_id: String,
    },
    /// Approve one suggested change (default) or revoke the approval
    Approve {
        session_id: String,
        /// Paragraph index
        index: usize,
        /// Revoke instead of approve
        #[arg(long)]
        revoke: bool,
    },
    /// Manually edit the corrected text for one paragraph
    Edit {
        session_id: String,
        /// Paragraph index
        index: usize,
        /// Replacement text (or - to read from stdin)
        text: String,
    },
    /// Drop a manual edit, reverting to the AI-corrected text
    ResetEdit {
        session_id: String,
        /// Paragraph index
        index: usize,
    },
    /// Rerun proofreading, discarding prior corrections and review state
    Reprocess {
        session_id: String,
    },
    /// Full reset back to the upload step
    Reset {
        session_id: String,
    },
    /// Delete a session
    Delete {
        session_id: String,
    },
}

#[derive(Subcommand)]
enum TokensAction {
    /// Count tokens in text (or - to read from stdin)
    Count {
        text: String,
    },
    /// Split text into budget-sized chunks
    Split {
        /// Text to split (or - to read from stdin)
        text: String,
        /// Per-chunk token budget
        #[arg(short, long, default_value_t = MAX_INPUT_TOKENS)]
        max_tokens: u32,
    },
}

// ============ Output Types ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessOutput {
    session_id: String,
    step: String,
    stats: DocumentStats,
    total_changes: usize,
    paragraphs_with_failures: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionListItem {
    id: String,
    source_path: String,
    step: String,
    changes: usize,
    updated: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionShowOutput {
    id: String,
    source_path: String,
    step: String,
    created: String,
    updated: String,
    stats: DocumentStats,
    total_changes: usize,
    approved_changes: usize,
    manual_edits: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReviewEntryOutput {
    index: usize,
    original: String,
    corrected: String,
    approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    edited: Option<String>,
    diff: Vec<DiffSegment>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReviewOutput {
    session_id: String,
    entries: Vec<ReviewEntryOutput>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EntryUpdateOutput {
    session_id: String,
    index: usize,
    approved: bool,
    edited: bool,
}

#[derive(Serialize)]
struct StatusOutput {
    status: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportOutput {
    session_id: String,
    output: String,
    summary: String,
    style_warnings: Vec<StyleWarning>,
}

#[derive(Serialize)]
struct TokenCountOutput {
    tokens: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenSplitOutput {
    chunk_count: usize,
    chunks: Vec<String>,
}

#[derive(Serialize)]
struct ErrorOutput {
    error: String,
}

// ============ Main ============

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Process { file } => handle_process(file).await,
        Commands::Session { action } => handle_session(action).await,
        Commands::Export { session_id, output } => handle_export(&session_id, output),
        Commands::Tokens { action } => handle_tokens(action),
        Commands::Stats { file } => handle_stats(file),
    };

    match result {
        Ok(json) => println!("{}", json),
        Err(e) => {
            let error = ErrorOutput {
                error: e.to_string(),
            };
            println!("{}", serde_json::to_string(&error).unwrap());
            std::process::exit(1);
        }
    }
}

// ============ Handlers ============

async fn handle_process(file: PathBuf) -> Result<String, Box<dyn Error>> {
    // Credential check first: processing must not start without a key
    let client = RewriteClient::from_env()?;

    let bytes = fs::read(&file)?;
    let extracted = TextDocument.extract(&bytes)?;
    let (originals, styles): (Vec<_>, Vec<_>) =
        extracted.into_iter().map(|p| (p.text, p.style)).unzip();
    let stats = document_stats(&originals);

    let mut session = ProofSession::new(&file.to_string_lossy(), originals, styles, stats);
    session.begin_processing()?;

    let proofreader = Proofreader::new(client);
    let (corrected, outcomes) = proofreader
        .proofread_document(&session.original_paragraphs)
        .await;
    session.complete_processing(corrected, outcomes)?;
    save_session(&session)?;

    let output = ProcessOutput {
        session_id: session.id.clone(),
        step: step_name(session.step),
        stats: session.stats.clone(),
        total_changes: session.review.change_count(),
        paragraphs_with_failures: session
            .outcomes
            .iter()
            .filter(|o| o.kept_original_chunks > 0)
            .count(),
    };
    Ok(serde_json::to_string(&output)?)
}

async fn handle_session(action: SessionAction) -> Result<String, Box<dyn Error>> {
    match action {
        SessionAction::List => {
            let sessions = redline_lib::list_sessions()?;
            let items: Vec<SessionListItem> = sessions
                .iter()
                .map(|s| SessionListItem {
                    id: s.id.clone(),
                    source_path: s.source_path.clone(),
                    step: step_name(s.step),
                    changes: s.review.change_count(),
                    updated: s.updated.to_rfc3339(),
                })
                .collect();
            Ok(serde_json::to_string(&items)?)
        }

        SessionAction::Show { session_id } => {
            let session = load_session(&session_id)?;
            let summary = session.review.summary();
            let output = SessionShowOutput {
                id: session.id.clone(),
                source_path: session.source_path.clone(),
                step: step_name(session.step),
                created: session.created.to_rfc3339(),
                updated: session.updated.to_rfc3339(),
                stats: session.stats.clone(),
                total_changes: summary.total_changes,
                approved_changes: summary.approved_changes,
                manual_edits: summary.manual_edits,
            };
            Ok(serde_json::to_string(&output)?)
        }

        SessionAction::Review { session_id } => {
            let session = load_session(&session_id)?;
            let entries: Vec<ReviewEntryOutput> = session
                .review
                .entry_indices()
                .into_iter()
                .map(|index| {
                    let original = &session.original_paragraphs[index];
                    let corrected = &session.corrected_paragraphs[index];
                    let edited = session.review.edited_text(index).map(str::to_string);
                    // The diff shows the current text: a manual edit when
                    // present, otherwise the AI correction
                    let current = edited.as_deref().unwrap_or(corrected);
                    ReviewEntryOutput {
                        index,
                        original: original.clone(),
                        corrected: corrected.clone(),
                        approved: session.review.is_approved(index),
                        diff: word_diff(original, current),
                        edited,
                    }
                })
                .collect();
            let output = ReviewOutput {
                session_id: session.id.clone(),
                entries,
            };
            Ok(serde_json::to_string(&output)?)
        }

        SessionAction::Approve {
            session_id,
            index,
            revoke,
        } => {
            let mut session = load_session(&session_id)?;
            session.review.set_approved(index, !revoke)?;
            save_session(&session)?;
            Ok(serde_json::to_string(&entry_update(&session, index))?)
        }

        SessionAction::Edit {
            session_id,
            index,
            text,
        } => {
            let text = read_text_arg(text)?;
            let mut session = load_session(&session_id)?;
            session.review.set_edit(index, text)?;
            save_session(&session)?;
            Ok(serde_json::to_string(&entry_update(&session, index))?)
        }

        SessionAction::ResetEdit { session_id, index } => {
            let mut session = load_session(&session_id)?;
            session.review.clear_edit(index)?;
            save_session(&session)?;
            Ok(serde_json::to_string(&entry_update(&session, index))?)
        }

        SessionAction::Reprocess { session_id } => {
            let client = RewriteClient::from_env()?;
            let mut session = load_session(&session_id)?;
            session.begin_processing()?;

            let proofreader = Proofreader::new(client);
            let (corrected, outcomes) = proofreader
                .proofread_document(&session.original_paragraphs)
                .await;
            session.complete_processing(corrected, outcomes)?;
            save_session(&session)?;

            let output = ProcessOutput {
                session_id: session.id.clone(),
                step: step_name(session.step),
                stats: session.stats.clone(),
                total_changes: session.review.change_count(),
                paragraphs_with_failures: session
                    .outcomes
                    .iter()
                    .filter(|o| o.kept_original_chunks > 0)
                    .count(),
            };
            Ok(serde_json::to_string(&output)?)
        }

        SessionAction::Reset { session_id } => {
            let mut session = load_session(&session_id)?;
            session.reset()?;
            save_session(&session)?;
            Ok(serde_json::to_string(&StatusOutput {
                status: step_name(session.step),
            })?)
        }

        SessionAction::Delete { session_id } => {
            redline_lib::delete_session(&session_id)?;
            Ok(r#"{"status": "deleted"}"#.to_string())
        }
    }
}

fn handle_export(session_id: &str, output_path: PathBuf) -> Result<String, Box<dyn Error>> {
    let mut session = load_session(session_id)?;
    // Validates the step before anything is written
    session.mark_downloaded()?;

    let finals = session.resolve_final_paragraphs();
    let built = TextDocument.build(&finals, &session.styles)?;
    fs::write(&output_path, &built.bytes)?;

    // Only persisted once the document is on disk; an export failure above
    // leaves the stored session at the review step
    save_session(&session)?;

    let output = ExportOutput {
        session_id: session.id.clone(),
        output: output_path.to_string_lossy().to_string(),
        summary: session.review.summary().to_string(),
        style_warnings: built.style_warnings,
    };
    Ok(serde_json::to_string(&output)?)
}

fn handle_tokens(action: TokensAction) -> Result<String, Box<dyn Error>> {
    match action {
        TokensAction::Count { text } => {
            let input = read_text_arg(text)?;
            let output = TokenCountOutput {
                tokens: count_tokens(&input),
            };
            Ok(serde_json::to_string(&output)?)
        }

        TokensAction::Split { text, max_tokens } => {
            let input = read_text_arg(text)?;
            let chunks = split_by_tokens(&input, max_tokens);
            let output = TokenSplitOutput {
                chunk_count: chunks.len(),
                chunks,
            };
            Ok(serde_json::to_string(&output)?)
        }
    }
}

fn handle_stats(file: PathBuf) -> Result<String, Box<dyn Error>> {
    let bytes = fs::read(&file)?;
    let extracted = TextDocument.extract(&bytes)?;
    let paragraphs: Vec<String> = extracted.into_iter().map(|p| p.text).collect();
    Ok(serde_json::to_string(&document_stats(&paragraphs))?)
}

// ============ Helpers ============

fn step_name(step: SessionStep) -> String {
    format!("{:?}", step).to_lowercase()
}

fn entry_update(session: &ProofSession, index: usize) -> EntryUpdateOutput {
    EntryUpdateOutput {
        session_id: session.id.clone(),
        index,
        approved: session.review.is_approved(index),
        edited: session.review.edited_text(index).is_some(),
    }
}

fn read_text_arg(text: String) -> Result<String, Box<dyn Error>> {
    if text == "-" {
        use std::io::Read;
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(text)
    }
}
