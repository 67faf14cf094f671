//! Document Source/Sink
//!
//! Paragraph extraction and final document construction sit behind a trait
//! so richer formats can plug in without touching the pipeline. The shipped
//! adapter treats UTF-8 text as one paragraph per line, preserving empty
//! paragraphs in position. Style hints ride along per paragraph; a hint
//! that fails to apply is recorded and construction continues.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid document: {0}")]
    Invalid(String),
}

impl Serialize for DocumentError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Basic run attributes carried from a source paragraph into the rebuilt
/// document (first-run bold/italic/underline plus font size and name)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub font_size: Option<f32>,
    pub font_name: Option<String>,
}

/// A paragraph as extracted from the source document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceParagraph {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<ParagraphStyle>,
}

/// A style hint that could not be applied to one rebuilt paragraph
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleWarning {
    pub index: usize,
    pub reason: String,
}

/// Built document bytes plus any per-paragraph style-copy failures
#[derive(Debug, Clone)]
pub struct BuildResult {
    pub bytes: Vec<u8>,
    pub style_warnings: Vec<StyleWarning>,
}

/// Reads paragraphs out of a document and writes the corrected set back.
///
/// `extract` must preserve empty paragraphs as empty strings in position so
/// paragraph indices stay stable across the pipeline. `build` applies style
/// hints best-effort: a failed hint becomes a `StyleWarning`, never an
/// error for the whole document.
pub trait DocumentAdapter {
    fn extract(&self, bytes: &[u8]) -> Result<Vec<SourceParagraph>, DocumentError>;

    fn build(
        &self,
        paragraphs: &[String],
        styles: &[Option<ParagraphStyle>],
    ) -> Result<BuildResult, DocumentError>;
}

/// Plain-text adapter: one paragraph per line
pub struct TextDocument;

impl DocumentAdapter for TextDocument {
    fn extract(&self, bytes: &[u8]) -> Result<Vec<SourceParagraph>, DocumentError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| DocumentError::Invalid(format!("not valid UTF-8: {}", e)))?;
        Ok(text
            .lines()
            .map(|line| SourceParagraph {
                text: line.to_string(),
                style: None,
            })
            .collect())
    }

    fn build(
        &self,
        paragraphs: &[String],
        _styles: &[Option<ParagraphStyle>],
    ) -> Result<BuildResult, DocumentError> {
        // Plain text carries no run attributes; hints are a no-op here
        let mut text = paragraphs.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        Ok(BuildResult {
            bytes: text.into_bytes(),
            style_warnings: Vec::new(),
        })
    }
}

/// Statistics for one loaded document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStats {
    pub total_paragraphs: usize,
    pub non_empty_paragraphs: usize,
    pub total_words: usize,
    pub total_chars: usize,
    pub longest_paragraph_words: usize,
    pub longest_paragraph_chars: usize,
    pub avg_words_per_paragraph: f64,
}

/// Compute statistics over the extracted paragraph texts
pub fn document_stats(paragraphs: &[String]) -> DocumentStats {
    let mut stats = DocumentStats {
        total_paragraphs: paragraphs.len(),
        ..Default::default()
    };

    for paragraph in paragraphs {
        if paragraph.trim().is_empty() {
            continue;
        }
        let words = paragraph.split_whitespace().count();
        let chars = paragraph.chars().count();
        stats.non_empty_paragraphs += 1;
        stats.total_words += words;
        stats.total_chars += chars;
        stats.longest_paragraph_words = stats.longest_paragraph_words.max(words);
        stats.longest_paragraph_chars = stats.longest_paragraph_chars.max(chars);
    }

    stats.avg_words_per_paragraph =
        stats.total_words as f64 / stats.non_empty_paragraphs.max(1) as f64;
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_preserves_empty_paragraphs_in_position() {
        let bytes = b"First line.\n\nThird line.\n";
        let paragraphs = TextDocument.extract(bytes).unwrap();
        let texts: Vec<&str> = paragraphs.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["First line.", "", "Third line."]);
    }

    #[test]
    fn test_extract_rejects_non_utf8() {
        let bytes = [0xff, 0xfe, 0x00];
        assert!(matches!(
            TextDocument.extract(&bytes),
            Err(DocumentError::Invalid(_))
        ));
    }

    #[test]
    fn test_build_round_trip() {
        let bytes = b"One.\n\nTwo.\n";
        let paragraphs = TextDocument.extract(bytes).unwrap();
        let texts: Vec<String> = paragraphs.into_iter().map(|p| p.text).collect();
        let styles = vec![None; texts.len()];
        let built = TextDocument.build(&texts, &styles).unwrap();
        assert_eq!(built.bytes, bytes.to_vec());
        assert!(built.style_warnings.is_empty());
    }

    #[test]
    fn test_build_empty_document() {
        let built = TextDocument.build(&[], &[]).unwrap();
        assert!(built.bytes.is_empty());
    }

    #[test]
    fn test_document_stats() {
        let paragraphs = vec![
            "One two three.".to_string(),
            String::new(),
            "Four five six seven eight.".to_string(),
            "   ".to_string(),
        ];
        let stats = document_stats(&paragraphs);

        assert_eq!(stats.total_paragraphs, 4);
        assert_eq!(stats.non_empty_paragraphs, 2);
        assert_eq!(stats.total_words, 8);
        assert_eq!(stats.longest_paragraph_words, 5);
        assert_eq!(stats.longest_paragraph_chars, 26);
        assert!((stats.avg_words_per_paragraph - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_document_stats_empty() {
        let stats = document_stats(&[]);
        assert_eq!(stats.total_paragraphs, 0);
        assert_eq!(stats.avg_words_per_paragraph, 0.0);
    }
}
