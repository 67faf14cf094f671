//! Proofreading Session
//!
//! A session tracks one document through upload, processing, review, and
//! download, persisted as session.json under the user data directory so the
//! review flow can span CLI invocations. Reprocessing discards prior
//! corrections and review state; a full reset discards everything and
//! returns to upload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use ulid::Ulid;

use crate::document::{DocumentStats, ParagraphStyle};
use crate::review::ReviewState;
use crate::rewrite::ParagraphOutcome;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("invalid session ID")]
    InvalidSessionId,
    #[error("invalid step transition: {from:?} -> {to:?}")]
    InvalidTransition { from: SessionStep, to: SessionStep },
    #[error("paragraph count mismatch: {originals} originals, {corrected} corrected")]
    ParagraphMismatch { originals: usize, corrected: usize },
    #[error("user data directory not found")]
    NoDataDir,
}

impl Serialize for SessionError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Where a session sits in the proofreading flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStep {
    Upload,
    Processing,
    Review,
    Download,
}

impl Default for SessionStep {
    fn default() -> Self {
        SessionStep::Upload
    }
}

/// Main session structure persisted to session.json
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofSession {
    pub id: String,
    pub source_path: String,
    pub step: SessionStep,

    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,

    #[serde(default)]
    pub original_paragraphs: Vec<String>,
    #[serde(default)]
    pub styles: Vec<Option<ParagraphStyle>>,
    #[serde(default)]
    pub corrected_paragraphs: Vec<String>,
    #[serde(default)]
    pub outcomes: Vec<ParagraphOutcome>,
    #[serde(default)]
    pub review: ReviewState,

    pub stats: DocumentStats,
}

impl ProofSession {
    /// Create a session for a freshly extracted document, at the upload step
    pub fn new(
        source_path: &str,
        original_paragraphs: Vec<String>,
        styles: Vec<Option<ParagraphStyle>>,
        stats: DocumentStats,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Ulid::new().to_string(),
            source_path: source_path.to_string(),
            step: SessionStep::Upload,
            created: now,
            updated: now,
            original_paragraphs,
            styles,
            corrected_paragraphs: Vec::new(),
            outcomes: Vec::new(),
            review: ReviewState::default(),
            stats,
        }
    }

    /// Enter processing, from upload or from review (reprocess).
    ///
    /// Reprocessing discards the corrected paragraphs, outcomes, and all
    /// approval/edit state; originals and styles are untouched.
    pub fn begin_processing(&mut self) -> Result<(), SessionError> {
        match self.step {
            SessionStep::Upload | SessionStep::Review => {
                self.corrected_paragraphs.clear();
                self.outcomes.clear();
                self.review = ReviewState::default();
                self.step = SessionStep::Processing;
                self.touch();
                Ok(())
            }
            from => Err(SessionError::InvalidTransition {
                from,
                to: SessionStep::Processing,
            }),
        }
    }

    /// Finish processing with the corrected paragraph set and move to review
    pub fn complete_processing(
        &mut self,
        corrected: Vec<String>,
        outcomes: Vec<ParagraphOutcome>,
    ) -> Result<(), SessionError> {
        if self.step != SessionStep::Processing {
            return Err(SessionError::InvalidTransition {
                from: self.step,
                to: SessionStep::Review,
            });
        }
        if corrected.len() != self.original_paragraphs.len() {
            return Err(SessionError::ParagraphMismatch {
                originals: self.original_paragraphs.len(),
                corrected: corrected.len(),
            });
        }

        self.review = ReviewState::from_paragraphs(&self.original_paragraphs, &corrected);
        self.corrected_paragraphs = corrected;
        self.outcomes = outcomes;
        self.step = SessionStep::Review;
        self.touch();
        Ok(())
    }

    /// Mark a successful export; review state is kept for re-export
    pub fn mark_downloaded(&mut self) -> Result<(), SessionError> {
        match self.step {
            SessionStep::Review | SessionStep::Download => {
                self.step = SessionStep::Download;
                self.touch();
                Ok(())
            }
            from => Err(SessionError::InvalidTransition {
                from,
                to: SessionStep::Download,
            }),
        }
    }

    /// Full reset back to upload: no paragraph review state survives
    pub fn reset(&mut self) -> Result<(), SessionError> {
        match self.step {
            SessionStep::Review | SessionStep::Download => {
                self.corrected_paragraphs.clear();
                self.outcomes.clear();
                self.review = ReviewState::default();
                self.step = SessionStep::Upload;
                self.touch();
                Ok(())
            }
            from => Err(SessionError::InvalidTransition {
                from,
                to: SessionStep::Upload,
            }),
        }
    }

    /// Resolve the final paragraph set, computed fresh on every call
    pub fn resolve_final_paragraphs(&self) -> Vec<String> {
        self.review
            .resolve_all(&self.original_paragraphs, &self.corrected_paragraphs)
    }

    fn touch(&mut self) {
        self.updated = Utc::now();
    }
}

/// Validate that a session ID contains only safe characters (alphanumeric,
/// dash, underscore). Rejects any path traversal attempt.
pub fn validate_session_id(session_id: &str) -> Result<(), SessionError> {
    if session_id.is_empty() {
        return Err(SessionError::InvalidSessionId);
    }
    if session_id
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        Ok(())
    } else {
        Err(SessionError::InvalidSessionId)
    }
}

/// Atomic write: write to a .tmp sibling then rename into place.
/// Prevents corruption if the process crashes mid-write.
fn atomic_write(path: &Path, contents: &str) -> Result<(), SessionError> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Application directory name under the platform data dir
const APP_DIR_NAME: &str = "redline";

/// Root directory holding all session directories
pub fn sessions_root() -> Result<PathBuf, SessionError> {
    let base = dirs::data_dir().ok_or(SessionError::NoDataDir)?;
    Ok(base.join(APP_DIR_NAME).join("sessions"))
}

/// Session directory under a given root.
/// Accepts session_id with or without the "sess_" prefix.
pub fn session_dir_in(root: &Path, session_id: &str) -> Result<PathBuf, SessionError> {
    let normalized_id = session_id.trim_start_matches("sess_");
    validate_session_id(normalized_id)?;
    Ok(root.join(format!("sess_{}", normalized_id)))
}

/// Save a session under a given root
pub fn save_session_in(root: &Path, session: &ProofSession) -> Result<(), SessionError> {
    let session_dir = session_dir_in(root, &session.id)?;
    fs::create_dir_all(&session_dir)?;
    let content = serde_json::to_string_pretty(session)?;
    atomic_write(&session_dir.join("session.json"), &content)?;
    Ok(())
}

/// Load a session from a given root
pub fn load_session_in(root: &Path, session_id: &str) -> Result<ProofSession, SessionError> {
    let session_path = session_dir_in(root, session_id)?.join("session.json");
    if !session_path.exists() {
        return Err(SessionError::NotFound(session_id.to_string()));
    }
    let content = fs::read_to_string(&session_path)?;
    let session: ProofSession = serde_json::from_str(&content)?;
    Ok(session)
}

/// List all sessions under a given root, most recently updated first
pub fn list_sessions_in(root: &Path) -> Result<Vec<ProofSession>, SessionError> {
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut sessions = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let session_json = path.join("session.json");
        if !session_json.exists() {
            continue;
        }
        match fs::read_to_string(&session_json) {
            Ok(content) => match serde_json::from_str::<ProofSession>(&content) {
                Ok(session) => sessions.push(session),
                Err(e) => {
                    tracing::warn!(path = ?session_json, error = %e, "Failed to parse session");
                }
            },
            Err(e) => {
                tracing::warn!(path = ?session_json, error = %e, "Failed to read session");
            }
        }
    }

    sessions.sort_by(|a, b| b.updated.cmp(&a.updated));
    Ok(sessions)
}

/// Delete a session directory under a given root
pub fn delete_session_in(root: &Path, session_id: &str) -> Result<(), SessionError> {
    let session_dir = session_dir_in(root, session_id)?;
    if !session_dir.exists() {
        return Err(SessionError::NotFound(session_id.to_string()));
    }
    fs::remove_dir_all(&session_dir)?;
    Ok(())
}

/// Save a session under the default data directory
pub fn save_session(session: &ProofSession) -> Result<(), SessionError> {
    save_session_in(&sessions_root()?, session)
}

/// Load a session from the default data directory
pub fn load_session(session_id: &str) -> Result<ProofSession, SessionError> {
    load_session_in(&sessions_root()?, session_id)
}

/// List all sessions in the default data directory
pub fn list_sessions() -> Result<Vec<ProofSession>, SessionError> {
    list_sessions_in(&sessions_root()?)
}

/// Delete a session from the default data directory
pub fn delete_session(session_id: &str) -> Result<(), SessionError> {
    delete_session_in(&sessions_root()?, session_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::document_stats;

    fn sample_session() -> ProofSession {
        let originals = vec!["Teh cat.".to_string(), String::new(), "Fine.".to_string()];
        let stats = document_stats(&originals);
        let styles = vec![None; originals.len()];
        ProofSession::new("letter.txt", originals, styles, stats)
    }

    fn processed_session() -> ProofSession {
        let mut session = sample_session();
        session.begin_processing().unwrap();
        let corrected = vec!["The cat.".to_string(), String::new(), "Fine.".to_string()];
        let outcomes = vec![
            ParagraphOutcome {
                index: 0,
                chunk_count: 1,
                kept_original_chunks: 0,
            },
            ParagraphOutcome {
                index: 2,
                chunk_count: 1,
                kept_original_chunks: 0,
            },
        ];
        session.complete_processing(corrected, outcomes).unwrap();
        session
    }

    #[test]
    fn test_validate_session_id() {
        assert!(validate_session_id("01ARZ3NDEKTSV4RRFFQ69G5FAV").is_ok());
        assert!(validate_session_id("with-dash_ok").is_ok());
        assert!(validate_session_id("").is_err());
        assert!(validate_session_id("../escape").is_err());
        assert!(validate_session_id("a/b").is_err());
    }

    #[test]
    fn test_forward_flow() {
        let mut session = sample_session();
        assert_eq!(session.step, SessionStep::Upload);

        session.begin_processing().unwrap();
        assert_eq!(session.step, SessionStep::Processing);

        let corrected = session.original_paragraphs.clone();
        session.complete_processing(corrected, Vec::new()).unwrap();
        assert_eq!(session.step, SessionStep::Review);

        session.mark_downloaded().unwrap();
        assert_eq!(session.step, SessionStep::Download);
    }

    #[test]
    fn test_illegal_transitions() {
        let mut session = sample_session();
        // upload -> review / download / upload are not edges
        assert!(session
            .complete_processing(session.original_paragraphs.clone(), Vec::new())
            .is_err());
        assert!(session.mark_downloaded().is_err());
        assert!(session.reset().is_err());

        session.begin_processing().unwrap();
        // processing -> processing is not an edge
        assert!(matches!(
            session.begin_processing(),
            Err(SessionError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_complete_processing_checks_paragraph_count() {
        let mut session = sample_session();
        session.begin_processing().unwrap();
        assert!(matches!(
            session.complete_processing(vec!["only one".to_string()], Vec::new()),
            Err(SessionError::ParagraphMismatch { .. })
        ));
    }

    #[test]
    fn test_reprocess_discards_review_state() {
        let mut session = processed_session();
        assert_eq!(session.review.change_count(), 1);
        session
            .review
            .set_edit(0, "The tabby cat.".to_string())
            .unwrap();

        session.begin_processing().unwrap();
        assert_eq!(session.step, SessionStep::Processing);
        assert!(session.corrected_paragraphs.is_empty());
        assert!(session.outcomes.is_empty());
        assert_eq!(session.review.change_count(), 0);
        // Originals survive for the rerun
        assert_eq!(session.original_paragraphs.len(), 3);
    }

    #[test]
    fn test_reset_discards_everything() {
        let mut session = processed_session();
        session.reset().unwrap();
        assert_eq!(session.step, SessionStep::Upload);
        assert!(session.corrected_paragraphs.is_empty());
        assert_eq!(session.review.change_count(), 0);
    }

    #[test]
    fn test_resolve_final_paragraphs() {
        let mut session = processed_session();
        assert_eq!(
            session.resolve_final_paragraphs(),
            vec!["The cat.".to_string(), String::new(), "Fine.".to_string()]
        );

        session.review.set_approved(0, false).unwrap();
        assert_eq!(
            session.resolve_final_paragraphs(),
            vec!["Teh cat.".to_string(), String::new(), "Fine.".to_string()]
        );
    }

    #[test]
    fn test_save_load_round_trip() {
        let root = tempfile::tempdir().unwrap();
        let session = processed_session();

        save_session_in(root.path(), &session).unwrap();
        let loaded = load_session_in(root.path(), &session.id).unwrap();

        assert_eq!(loaded.id, session.id);
        assert_eq!(loaded.step, SessionStep::Review);
        assert_eq!(loaded.original_paragraphs, session.original_paragraphs);
        assert_eq!(loaded.corrected_paragraphs, session.corrected_paragraphs);
        assert_eq!(loaded.review, session.review);
    }

    #[test]
    fn test_load_missing_session() {
        let root = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_session_in(root.path(), "01ARZ3NDEKTSV4RRFFQ69G5FAV"),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_sessions_sorted_by_updated() {
        let root = tempfile::tempdir().unwrap();
        let older = sample_session();
        save_session_in(root.path(), &older).unwrap();

        let mut newer = sample_session();
        newer.begin_processing().unwrap(); // bumps updated
        save_session_in(root.path(), &newer).unwrap();

        let sessions = list_sessions_in(root.path()).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, newer.id);
    }

    #[test]
    fn test_delete_session() {
        let root = tempfile::tempdir().unwrap();
        let session = sample_session();
        save_session_in(root.path(), &session).unwrap();

        delete_session_in(root.path(), &session.id).unwrap();
        assert!(matches!(
            load_session_in(root.path(), &session.id),
            Err(SessionError::NotFound(_))
        ));
        assert!(delete_session_in(root.path(), &session.id).is_err());
    }
}
