//! Error types for the schet-core library.

use thiserror::Error;

/// Main error type for the schet library.
#[derive(Error, Debug)]
pub enum SchetError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Field extraction or rule table error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Content cache error.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Result (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised by the direct text backend.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// Failed to extract page images from PDF.
    #[error("failed to extract images: {0}")]
    ImageExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,
}

/// Errors raised by the OCR backend.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// The configured recognizer cannot run on this host.
    #[error("recognizer unavailable: {0}")]
    Unavailable(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors related to invoice field extraction.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// A post-processing step rejected the matched value.
    #[error("failed to parse {field}: {value}")]
    Parse { field: String, value: String },

    /// A rule pattern does not compile.
    #[error("invalid pattern for {field}: {reason}")]
    InvalidPattern { field: String, reason: String },

    /// A rule targets a field that does not belong to its table section.
    #[error("field {field} cannot be used in the {section} section")]
    MisplacedField { field: String, section: String },
}

/// Errors raised by the content cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Recency bookkeeping disagrees with the stored entries.
    #[error("cache bookkeeping corrupted: {0}")]
    Corrupted(String),

    /// A thread panicked while holding the cache lock.
    #[error("cache lock poisoned")]
    Poisoned,
}

/// Result type for the schet library.
pub type Result<T> = std::result::Result<T, SchetError>;
