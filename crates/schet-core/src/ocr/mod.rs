//! OCR fallback: page images recognized one by one.
//!
//! The recognizer is picked at startup from configuration. When it cannot
//! run on this host, [`detect_backend`] returns `None` and acquisition goes
//! without OCR.

#[cfg(feature = "native")]
mod pure_engine;
mod tesseract;

#[cfg(feature = "native")]
pub use pure_engine::OnnxRecognizer;
pub use tesseract::TesseractRecognizer;

use image::DynamicImage;
use tracing::{debug, info, warn};

use crate::error::{OcrError, Result};
use crate::models::config::{OcrConfig, OcrEngineKind};
use crate::pdf::{PageRenderer, PdfExtractor};

/// Recognizes the text of a single image.
pub trait ImageRecognizer: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Recognize `image` with the given language(s) and page segmentation mode.
    fn image_to_text(&self, image: &DynamicImage, language: &str, psm: u32)
        -> std::result::Result<String, OcrError>;
}

/// Produces text for a whole document from its page images.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, data: &[u8]) -> Result<String>;
}

/// Renders pages, recognizes each and joins the page texts with newlines.
pub struct PageOcr {
    renderer: Box<dyn PageRenderer>,
    recognizer: Box<dyn ImageRecognizer>,
    language: String,
    psm: u32,
    max_pages: usize,
}

impl PageOcr {
    pub fn new(
        renderer: Box<dyn PageRenderer>,
        recognizer: Box<dyn ImageRecognizer>,
        config: &OcrConfig,
    ) -> Self {
        Self {
            renderer,
            recognizer,
            language: config.language.clone(),
            psm: config.page_segmentation_mode,
            max_pages: config.max_pages,
        }
    }
}

impl OcrBackend for PageOcr {
    fn recognize(&self, data: &[u8]) -> Result<String> {
        let pages = self.renderer.render_pages(data, self.max_pages)?;
        debug!("Recognizing {} pages with {}", pages.len(), self.recognizer.name());

        let mut texts = Vec::with_capacity(pages.len());
        for (index, page) in pages.iter().enumerate() {
            match self.recognizer.image_to_text(page, &self.language, self.psm) {
                Ok(text) if !text.trim().is_empty() => texts.push(text),
                Ok(_) => debug!("Page {} produced no text", index + 1),
                Err(e) => warn!("OCR failed on page {}: {}", index + 1, e),
            }
        }

        Ok(texts.join("\n"))
    }
}

/// Build the configured OCR backend, or `None` when OCR is disabled or the
/// recognizer is not available on this host.
pub fn detect_backend(config: &OcrConfig) -> Option<Box<dyn OcrBackend>> {
    if !config.enabled {
        info!("OCR disabled by configuration");
        return None;
    }

    let recognizer = match config.engine {
        OcrEngineKind::Tesseract => {
            let tesseract = TesseractRecognizer::new(&config.tesseract_path);
            match tesseract.version() {
                Ok(version) => {
                    info!("Using {}", version);
                    Box::new(tesseract) as Box<dyn ImageRecognizer>
                }
                Err(e) => {
                    warn!("OCR unavailable: {}", e);
                    return None;
                }
            }
        }
        OcrEngineKind::Onnx => onnx_recognizer(config)?,
    };

    Some(Box::new(PageOcr::new(Box::new(PdfExtractor::new()), recognizer, config)))
}

#[cfg(feature = "native")]
fn onnx_recognizer(config: &OcrConfig) -> Option<Box<dyn ImageRecognizer>> {
    match OnnxRecognizer::from_dir(&config.model_dir) {
        Ok(recognizer) => Some(Box::new(recognizer)),
        Err(e) => {
            warn!("OCR unavailable: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "native"))]
fn onnx_recognizer(_config: &OcrConfig) -> Option<Box<dyn ImageRecognizer>> {
    warn!("OCR unavailable: built without the `native` feature");
    None
}
