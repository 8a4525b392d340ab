//! Document conversion — turns an uploaded resume into a preview image and its text.
//!
//! `extracted_text` may legitimately come back empty (scanned, image-only
//! documents). That is not a conversion error; callers check it themselves.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub mod pdf;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("PDFium library unavailable: {0}")]
    Library(String),

    #[error("failed to load document: {0}")]
    Load(String),

    #[error("failed to render page {page}: {reason}")]
    Render { page: usize, reason: String },

    #[error("image encoding failed: {0}")]
    Encode(String),

    #[error("text extraction failed: {0}")]
    TextExtraction(String),

    #[error("conversion task failed: {0}")]
    Task(String),
}

/// A document as received from the caller.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub file_name: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone)]
pub struct ConvertedDocument {
    pub image_name: String,
    pub image_bytes: Bytes,
    pub extracted_text: String,
}

#[async_trait]
pub trait DocumentConverter: Send + Sync {
    async fn convert(&self, document: &UploadedDocument) -> Result<ConvertedDocument, ConversionError>;
}

/// `resume.pdf` -> `resume.png`; names without a `.pdf` extension just gain `.png`.
pub fn preview_image_name(file_name: &str) -> String {
    let lower = file_name.to_ascii_lowercase();
    let stem = if lower.ends_with(".pdf") {
        &file_name[..file_name.len() - 4]
    } else {
        file_name
    };
    let stem = if stem.is_empty() { "resume" } else { stem };
    format!("{stem}.png")
}
