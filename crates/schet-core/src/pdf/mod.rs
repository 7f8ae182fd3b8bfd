//! PDF access: the direct text layer and page images for OCR.

mod extractor;

pub use extractor::PdfExtractor;

use crate::error::PdfError;
use image::DynamicImage;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Reads the embedded text layer of a document.
pub trait DirectTextBackend: Send + Sync {
    /// Extract all text from the document bytes.
    fn extract_text(&self, data: &[u8]) -> Result<String>;
}

/// Turns document pages into images for recognition.
pub trait PageRenderer: Send + Sync {
    /// Images of the document pages in page order, at most `max_pages`
    /// (0 = all pages).
    fn render_pages(&self, data: &[u8], max_pages: usize) -> Result<Vec<DynamicImage>>;
}
