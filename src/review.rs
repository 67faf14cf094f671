//! Per-Paragraph Review State
//!
//! Tracks approval flags and manual edits for paragraphs where the rewrite
//! produced a change, and resolves the final paragraph set at export time.
//! An index with no entry is an unchanged paragraph: it is never shown for
//! review and always resolves to its original text.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReviewError {
    #[error("no review entry for paragraph {0}")]
    NoEntry(usize),
}

impl Serialize for ReviewError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Approval and edit maps keyed by paragraph index.
///
/// Entries exist only for paragraphs where a change was detected (original
/// non-blank and different from corrected); a new entry starts approved.
/// Resolution precedence is edited > corrected > original, per paragraph
/// independently. BTreeMap keeps serialization deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewState {
    approved: BTreeMap<usize, bool>,
    edited: BTreeMap<usize, String>,
}

impl ReviewState {
    /// Build entries by comparing originals against corrected paragraphs
    pub fn from_paragraphs(originals: &[String], corrected: &[String]) -> Self {
        let mut approved = BTreeMap::new();
        for (index, (original, rewritten)) in originals.iter().zip(corrected).enumerate() {
            if is_change(original, rewritten) {
                approved.insert(index, true);
            }
        }
        Self {
            approved,
            edited: BTreeMap::new(),
        }
    }

    pub fn has_entry(&self, index: usize) -> bool {
        self.approved.contains_key(&index)
    }

    /// Indices with review entries, in document order
    pub fn entry_indices(&self) -> Vec<usize> {
        self.approved.keys().copied().collect()
    }

    pub fn change_count(&self) -> usize {
        self.approved.len()
    }

    pub fn approved_count(&self) -> usize {
        self.approved.values().filter(|&&a| a).count()
    }

    pub fn manual_edit_count(&self) -> usize {
        self.edited.len()
    }

    pub fn is_approved(&self, index: usize) -> bool {
        self.approved.get(&index).copied().unwrap_or(false)
    }

    pub fn edited_text(&self, index: usize) -> Option<&str> {
        self.edited.get(&index).map(String::as_str)
    }

    pub fn set_approved(&mut self, index: usize, approved: bool) -> Result<(), ReviewError> {
        match self.approved.get_mut(&index) {
            Some(flag) => {
                *flag = approved;
                Ok(())
            }
            None => Err(ReviewError::NoEntry(index)),
        }
    }

    pub fn toggle_approved(&mut self, index: usize) -> Result<bool, ReviewError> {
        match self.approved.get_mut(&index) {
            Some(flag) => {
                *flag = !*flag;
                Ok(*flag)
            }
            None => Err(ReviewError::NoEntry(index)),
        }
    }

    /// Record a manual edit; the paragraph stays pending review
    pub fn set_edit(&mut self, index: usize, text: String) -> Result<(), ReviewError> {
        if !self.has_entry(index) {
            return Err(ReviewError::NoEntry(index));
        }
        self.edited.insert(index, text);
        Ok(())
    }

    /// Discard a manual edit, falling back to the AI-corrected text
    pub fn clear_edit(&mut self, index: usize) -> Result<(), ReviewError> {
        if !self.has_entry(index) {
            return Err(ReviewError::NoEntry(index));
        }
        self.edited.remove(&index);
        Ok(())
    }

    /// Resolve one paragraph: approved takes the edit if present, else the
    /// corrected text; not approved (or no entry) takes the original.
    pub fn resolve_final<'a>(
        &'a self,
        index: usize,
        original: &'a str,
        corrected: &'a str,
    ) -> &'a str {
        match self.approved.get(&index) {
            Some(true) => self
                .edited
                .get(&index)
                .map(String::as_str)
                .unwrap_or(corrected),
            Some(false) | None => original,
        }
    }

    /// Resolve the whole document, computed fresh on every call
    pub fn resolve_all(&self, originals: &[String], corrected: &[String]) -> Vec<String> {
        originals
            .iter()
            .zip(corrected)
            .enumerate()
            .map(|(index, (original, rewritten))| {
                self.resolve_final(index, original, rewritten).to_string()
            })
            .collect()
    }

    pub fn summary(&self) -> ReviewSummary {
        ReviewSummary {
            approved_changes: self.approved_count(),
            total_changes: self.change_count(),
            manual_edits: self.manual_edit_count(),
        }
    }
}

/// A change worth reviewing: non-blank original whose corrected text
/// differs beyond surrounding whitespace
fn is_change(original: &str, corrected: &str) -> bool {
    let original = original.trim();
    !original.is_empty() && original != corrected.trim()
}

/// Applied-changes summary for the export step
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub approved_changes: usize,
    pub total_changes: usize,
    pub manual_edits: usize,
}

impl fmt::Display for ReviewSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} out of {} suggested changes were applied",
            self.approved_changes, self.total_changes
        )?;
        if self.manual_edits > 0 {
            write!(f, ", with {} manual edits", self.manual_edits)?;
        }
        write!(f, ".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraphs(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_entries_only_for_changed_paragraphs() {
        let originals = paragraphs(&["Teh cat.", "Fine already.", "", "Teh dog."]);
        let corrected = paragraphs(&["The cat.", "Fine already.", "", "The dog."]);
        let review = ReviewState::from_paragraphs(&originals, &corrected);

        assert_eq!(review.entry_indices(), vec![0, 3]);
        assert!(review.is_approved(0));
        assert!(review.is_approved(3));
        assert!(!review.has_entry(1));
        assert!(!review.has_entry(2));
    }

    #[test]
    fn test_blank_original_never_gets_an_entry() {
        // Even if the rewrite invented text for a blank paragraph
        let originals = paragraphs(&["   "]);
        let corrected = paragraphs(&["Surprise text."]);
        let review = ReviewState::from_paragraphs(&originals, &corrected);
        assert_eq!(review.change_count(), 0);
        assert_eq!(review.resolve_final(0, "   ", "Surprise text."), "   ");
    }

    #[test]
    fn test_whitespace_only_difference_is_not_a_change() {
        let originals = paragraphs(&["Hello there. "]);
        let corrected = paragraphs(&["Hello there."]);
        let review = ReviewState::from_paragraphs(&originals, &corrected);
        assert_eq!(review.change_count(), 0);
    }

    #[test]
    fn test_resolution_precedence() {
        let originals = paragraphs(&["Teh cat."]);
        let corrected = paragraphs(&["The cat."]);
        let mut review = ReviewState::from_paragraphs(&originals, &corrected);

        // Approved, no edit: corrected
        assert_eq!(review.resolve_final(0, "Teh cat.", "The cat."), "The cat.");

        // Approved, edited: the edit wins
        review.set_edit(0, "The tabby cat.".to_string()).unwrap();
        assert_eq!(
            review.resolve_final(0, "Teh cat.", "The cat."),
            "The tabby cat."
        );

        // Not approved: original, even with an edit on file
        review.set_approved(0, false).unwrap();
        assert_eq!(review.resolve_final(0, "Teh cat.", "The cat."), "Teh cat.");

        // Re-approved after clearing the edit: corrected again
        review.set_approved(0, true).unwrap();
        review.clear_edit(0).unwrap();
        assert_eq!(review.resolve_final(0, "Teh cat.", "The cat."), "The cat.");
    }

    #[test]
    fn test_operations_require_an_entry() {
        let mut review = ReviewState::default();
        assert_eq!(review.set_approved(5, true), Err(ReviewError::NoEntry(5)));
        assert_eq!(review.toggle_approved(5), Err(ReviewError::NoEntry(5)));
        assert_eq!(
            review.set_edit(5, "text".to_string()),
            Err(ReviewError::NoEntry(5))
        );
        assert_eq!(review.clear_edit(5), Err(ReviewError::NoEntry(5)));
    }

    #[test]
    fn test_toggle_flips_flag() {
        let originals = paragraphs(&["Teh cat."]);
        let corrected = paragraphs(&["The cat."]);
        let mut review = ReviewState::from_paragraphs(&originals, &corrected);

        assert_eq!(review.toggle_approved(0), Ok(false));
        assert_eq!(review.toggle_approved(0), Ok(true));
    }

    #[test]
    fn test_resolve_all_paragraphs_are_independent() {
        let originals = paragraphs(&["Teh cat.", "Plain.", "Teh dog.", ""]);
        let corrected = paragraphs(&["The cat.", "Plain.", "The dog.", ""]);
        let mut review = ReviewState::from_paragraphs(&originals, &corrected);
        review.set_approved(2, false).unwrap();

        let finals = review.resolve_all(&originals, &corrected);
        assert_eq!(finals, paragraphs(&["The cat.", "Plain.", "Teh dog.", ""]));
    }

    #[test]
    fn test_summary_phrasing() {
        let originals = paragraphs(&["Teh cat.", "Teh dog.", "Teh bird."]);
        let corrected = paragraphs(&["The cat.", "The dog.", "The bird."]);
        let mut review = ReviewState::from_paragraphs(&originals, &corrected);
        review.set_approved(1, false).unwrap();

        assert_eq!(
            review.summary().to_string(),
            "2 out of 3 suggested changes were applied."
        );

        review.set_edit(0, "The tabby cat.".to_string()).unwrap();
        assert_eq!(
            review.summary().to_string(),
            "2 out of 3 suggested changes were applied, with 1 manual edits."
        );
    }
}
