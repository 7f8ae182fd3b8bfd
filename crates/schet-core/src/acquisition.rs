//! Text acquisition: direct text layer first, OCR as fallback.
//!
//! ```text
//! Start -> DirectAttempt -> Success(direct)
//!                        -> OcrAttempt -> Success(ocr)
//!                                      -> Failed
//! ```
//!
//! Each backend runs at most once per call. A backend error and empty text
//! lead to the same transition; errors are logged, never returned.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::ocr::OcrBackend;
use crate::pdf::DirectTextBackend;

lazy_static! {
    static ref LINE_BREAK: Regex = Regex::new(r"\r\n?|\x0c").unwrap();
    static ref TRAILING_SPACE: Regex = Regex::new(r"[ \t\x{a0}]+\n").unwrap();
    static ref EXTRA_BLANK_LINES: Regex = Regex::new(r"\n{3,}").unwrap();
}

/// Where the text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    Direct,
    Ocr,
}

/// Text obtained from a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredText {
    pub text: String,
    pub source: TextSource,
}

/// States of one acquisition run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionState {
    Start,
    DirectAttempt,
    OcrAttempt,
    Success(AcquiredText),
    Failed,
}

/// Runs the direct-then-OCR state machine over the configured backends.
pub struct TextAcquisition {
    direct: Box<dyn DirectTextBackend>,
    ocr: Option<Box<dyn OcrBackend>>,
}

impl TextAcquisition {
    pub fn new(direct: Box<dyn DirectTextBackend>, ocr: Option<Box<dyn OcrBackend>>) -> Self {
        Self { direct, ocr }
    }

    pub fn has_ocr(&self) -> bool {
        self.ocr.is_some()
    }

    /// Acquire text, or `None` when every available backend failed.
    ///
    /// With `force_ocr` the direct attempt is skipped, unless no OCR backend
    /// exists, in which case the direct backend is still tried.
    pub fn acquire(&self, data: &[u8], force_ocr: bool) -> Option<AcquiredText> {
        let mut state = AcquisitionState::Start;
        loop {
            state = match state {
                AcquisitionState::Start if force_ocr && self.has_ocr() => AcquisitionState::OcrAttempt,
                AcquisitionState::Start => {
                    if force_ocr {
                        warn!("OCR requested but unavailable, using the text layer");
                    }
                    AcquisitionState::DirectAttempt
                }
                AcquisitionState::DirectAttempt => {
                    match usable(self.direct.extract_text(data).map_err(Into::into), TextSource::Direct) {
                        Some(acquired) => AcquisitionState::Success(acquired),
                        None if self.has_ocr() && !force_ocr => AcquisitionState::OcrAttempt,
                        None => AcquisitionState::Failed,
                    }
                }
                AcquisitionState::OcrAttempt => {
                    let result = match &self.ocr {
                        Some(ocr) => ocr.recognize(data),
                        None => return None,
                    };
                    match usable(result, TextSource::Ocr) {
                        Some(acquired) => AcquisitionState::Success(acquired),
                        None => AcquisitionState::Failed,
                    }
                }
                AcquisitionState::Success(acquired) => {
                    info!(source = ?acquired.source, chars = acquired.text.len(), "text acquired");
                    return Some(acquired);
                }
                AcquisitionState::Failed => {
                    warn!("no text extracted from document");
                    return None;
                }
            };
        }
    }
}

fn usable(result: Result<String>, source: TextSource) -> Option<AcquiredText> {
    match result {
        Ok(raw) => {
            let text = clean_text(&raw);
            if text.is_empty() {
                debug!(?source, "backend returned no text");
                None
            } else {
                Some(AcquiredText { text, source })
            }
        }
        Err(e) => {
            debug!(?source, "backend failed: {}", e);
            None
        }
    }
}

/// Normalize line endings and drop trailing spaces so blank lines stay blank.
pub fn clean_text(raw: &str) -> String {
    let text = LINE_BREAK.replace_all(raw, "\n");
    let text = TRAILING_SPACE.replace_all(&text, "\n");
    let text = EXTRA_BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{OcrError, PdfError};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Direct(std::result::Result<&'static str, ()>, Arc<AtomicUsize>);

    impl DirectTextBackend for Direct {
        fn extract_text(&self, _data: &[u8]) -> std::result::Result<String, PdfError> {
            self.1.fetch_add(1, Ordering::SeqCst);
            self.0
                .map(String::from)
                .map_err(|_| PdfError::TextExtraction("broken".to_string()))
        }
    }

    struct Ocr(std::result::Result<&'static str, ()>, Arc<AtomicUsize>);

    impl OcrBackend for Ocr {
        fn recognize(&self, _data: &[u8]) -> Result<String> {
            self.1.fetch_add(1, Ordering::SeqCst);
            self.0
                .map(String::from)
                .map_err(|_| OcrError::Recognition("blurred".to_string()).into())
        }
    }

    struct Setup {
        acquisition: TextAcquisition,
        direct_calls: Arc<AtomicUsize>,
        ocr_calls: Arc<AtomicUsize>,
    }

    fn setup(
        direct: std::result::Result<&'static str, ()>,
        ocr: Option<std::result::Result<&'static str, ()>>,
    ) -> Setup {
        let direct_calls = Arc::new(AtomicUsize::new(0));
        let ocr_calls = Arc::new(AtomicUsize::new(0));
        let ocr_backend = ocr.map(|o| Box::new(Ocr(o, ocr_calls.clone())) as Box<dyn OcrBackend>);
        Setup {
            acquisition: TextAcquisition::new(
                Box::new(Direct(direct, direct_calls.clone())),
                ocr_backend,
            ),
            direct_calls,
            ocr_calls,
        }
    }

    #[test]
    fn test_direct_success_skips_ocr() {
        let s = setup(Ok("Счет № 1"), Some(Ok("ocr")));
        let acquired = s.acquisition.acquire(b"%PDF", false).unwrap();
        assert_eq!(acquired.source, TextSource::Direct);
        assert_eq!(acquired.text, "Счет № 1");
        assert_eq!(s.ocr_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_direct_falls_back_once() {
        let s = setup(Ok("  \n "), Some(Ok("Счет № 2")));
        let acquired = s.acquisition.acquire(b"%PDF", false).unwrap();
        assert_eq!(acquired.source, TextSource::Ocr);
        assert_eq!(s.direct_calls.load(Ordering::SeqCst), 1);
        assert_eq!(s.ocr_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_direct_error_falls_back() {
        let s = setup(Err(()), Some(Ok("Счет № 3")));
        let acquired = s.acquisition.acquire(b"%PDF", false).unwrap();
        assert_eq!(acquired.text, "Счет № 3");
    }

    #[test]
    fn test_both_fail() {
        let s = setup(Err(()), Some(Err(())));
        assert_eq!(s.acquisition.acquire(b"%PDF", false), None);
        assert_eq!(s.direct_calls.load(Ordering::SeqCst), 1);
        assert_eq!(s.ocr_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_ocr_backend_fails_after_direct() {
        let s = setup(Ok(""), None);
        assert_eq!(s.acquisition.acquire(b"%PDF", false), None);
        assert!(!s.acquisition.has_ocr());
    }

    #[test]
    fn test_force_ocr_skips_direct() {
        let s = setup(Ok("text layer"), Some(Ok("scanned")));
        let acquired = s.acquisition.acquire(b"%PDF", true).unwrap();
        assert_eq!(acquired.source, TextSource::Ocr);
        assert_eq!(s.direct_calls.load(Ordering::SeqCst), 0);

        let s = setup(Ok("text layer"), Some(Err(())));
        assert_eq!(s.acquisition.acquire(b"%PDF", true), None);
        assert_eq!(s.direct_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_force_ocr_without_backend_uses_direct() {
        let s = setup(Ok("text layer"), None);
        let acquired = s.acquisition.acquire(b"%PDF", true).unwrap();
        assert_eq!(acquired.source, TextSource::Direct);
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("a  \r\nb\x0c\n\n\n\nc \t"), "a\nb\n\nc");
        assert_eq!(clean_text(" \n\t"), "");
    }
}
