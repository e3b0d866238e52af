//! Resume extraction collaborator.
//!
//! The pipeline only depends on [`ResumeExtractor`]: `(filename, bytes)` in,
//! structured fields or a content error out. [`TextResumeExtractor`] is a
//! minimal default that reads the document text and picks out an email and a name.

use std::sync::OnceLock;

use async_trait::async_trait;
use bytes::Bytes;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::candidates::models::ExtractedCandidate;

#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The document is malformed, unreadable, or not a supported format.
    #[error("{0}")]
    InvalidContent(String),

    /// Anything else went wrong inside the extractor.
    #[error("resume extraction failed: {0}")]
    Internal(String),
}

#[async_trait]
pub trait ResumeExtractor: Send + Sync {
    async fn extract(
        &self,
        filename: &str,
        bytes: Bytes,
    ) -> Result<ExtractedCandidate, ExtractionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Pdf,
    Docx,
}

impl DocumentKind {
    /// Magic bytes win over the filename extension.
    fn detect(filename: &str, bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF-") {
            return Some(DocumentKind::Pdf);
        }
        if bytes.starts_with(b"PK\x03\x04") {
            return Some(DocumentKind::Docx);
        }
        let lower = filename.to_ascii_lowercase();
        if lower.ends_with(".pdf") {
            Some(DocumentKind::Pdf)
        } else if lower.ends_with(".docx") {
            Some(DocumentKind::Docx)
        } else {
            None
        }
    }
}

/// Default extractor: PDF via `pdf-extract`, DOCX via `docx-rs`.
pub struct TextResumeExtractor;

#[async_trait]
impl ResumeExtractor for TextResumeExtractor {
    async fn extract(
        &self,
        filename: &str,
        bytes: Bytes,
    ) -> Result<ExtractedCandidate, ExtractionError> {
        let kind = DocumentKind::detect(filename, &bytes).ok_or_else(|| {
            ExtractionError::InvalidContent("Unsupported resume format".to_string())
        })?;

        let text = tokio::task::spawn_blocking(move || read_text(kind, &bytes))
            .await
            .map_err(|e| {
                if e.is_panic() {
                    ExtractionError::InvalidContent("Resume could not be read".to_string())
                } else {
                    ExtractionError::Internal(e.to_string())
                }
            })??;

        if text.trim().is_empty() {
            return Err(ExtractionError::InvalidContent(
                "Resume contains no readable text".to_string(),
            ));
        }

        debug!("Extracted {} characters from {filename}", text.len());
        Ok(parse_fields(&text))
    }
}

fn read_text(kind: DocumentKind, bytes: &[u8]) -> Result<String, ExtractionError> {
    match kind {
        DocumentKind::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ExtractionError::InvalidContent(format!("Invalid PDF: {e}"))),
        DocumentKind::Docx => {
            let doc = docx_rs::read_docx(bytes)
                .map_err(|e| ExtractionError::InvalidContent(format!("Invalid DOCX: {e}")))?;
            let mut text = String::new();
            for child in doc.document.children {
                if let docx_rs::DocumentChild::Paragraph(p) = child {
                    for child in p.children {
                        if let docx_rs::ParagraphChild::Run(run) = child {
                            for child in run.children {
                                if let docx_rs::RunChild::Text(t) = child {
                                    text.push_str(&t.text);
                                }
                            }
                        }
                    }
                    text.push('\n');
                }
            }
            Ok(text)
        }
    }
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid email regex")
    })
}

fn phone_pattern() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"\+?\d[\d\s().-]{7,}\d").expect("valid phone regex"))
}

/// Pulls contact fields out of plain resume text.
fn parse_fields(text: &str) -> ExtractedCandidate {
    let email = email_pattern()
        .find(text)
        .map(|m| m.as_str().trim_end_matches('.').to_string());
    let phone = phone_pattern().find(text).map(|m| m.as_str().trim().to_string());

    let name = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .find(|line| looks_like_name(line))
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "));

    let mut extracted = ExtractedCandidate {
        name,
        email,
        ..Default::default()
    };
    if let Some(phone) = phone {
        extracted.extra.insert("phone".to_string(), Value::String(phone));
    }
    extracted.extra.insert(
        "word_count".to_string(),
        Value::from(text.split_whitespace().count()),
    );
    extracted
}

fn looks_like_name(line: &str) -> bool {
    let lower = line.to_lowercase();
    line.chars().count() <= 60
        && !line.contains('@')
        && !lower.starts_with("http")
        && !lower.starts_with("www.")
        && line.chars().any(char::is_alphabetic)
        && !line.chars().any(|c| c.is_ascii_digit())
}
