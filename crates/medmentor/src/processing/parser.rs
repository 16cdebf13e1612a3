//! Corpus file parsing.
//!
//! Only plain text and PDF-extracted text feed the index. Any other extension
//! is skipped with a logged notice rather than an error, so a mixed corpus
//! directory never fails ingestion.

use anyhow::{Context, Result};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub title: String,
    pub source: String,
    pub content: String,
}

pub struct DocumentParser;

impl DocumentParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a corpus file. Returns `None` for unsupported extensions.
    pub fn parse_file(&self, path: &Path) -> Result<Option<ParsedDocument>> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let content = match extension.as_str() {
            "txt" | "md" | "text" => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read text file: {}", path.display()))?,
            "pdf" => self.parse_pdf(path)?,
            _ => {
                tracing::info!(path = %path.display(), "Skipping unsupported file");
                return Ok(None);
            }
        };

        // File stem (without extension) gives a cleaner display title
        let title = path
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or("untitled")
            .to_string();

        Ok(Some(ParsedDocument {
            title,
            source: path.display().to_string(),
            content,
        }))
    }

    fn parse_pdf(&self, path: &Path) -> Result<String> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read PDF: {}", path.display()))?;

        let text = pdf_extract::extract_text_from_mem(&bytes)
            .with_context(|| format!("Failed to extract PDF text: {}", path.display()))?;

        // Collapse extraction whitespace noise
        let cleaned = text
            .lines()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(cleaned)
    }
}

impl Default for DocumentParser {
    fn default() -> Self {
        Self::new()
    }
}
