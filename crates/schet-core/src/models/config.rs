//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Literal substituted for unresolved fields in the generalized form.
pub const GENERIC_SENTINEL: &str = "UNRECOGNIZED";

/// Literal substituted for unresolved fields in the deployed service.
pub const DEFAULT_SENTINEL: &str = "НЕ_РАСПОЗНАНО";

/// Default number of cached documents.
pub const DEFAULT_CACHE_CAPACITY: usize = 50;

/// Main configuration for the schet pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchetConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Content cache configuration.
    pub cache: CacheConfig,
}

/// Which recognizer turns page images into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrEngineKind {
    /// External `tesseract` binary.
    Tesseract,
    /// ONNX models run in-process.
    Onnx,
}

/// OCR backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Allow the OCR fallback at all.
    pub enabled: bool,

    /// Recognizer implementation.
    pub engine: OcrEngineKind,

    /// Recognition language(s), tesseract syntax.
    pub language: String,

    /// Tesseract page segmentation mode.
    pub page_segmentation_mode: u32,

    /// Path or name of the tesseract binary.
    pub tesseract_path: String,

    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,

    /// Maximum pages to recognize (0 = unlimited).
    pub max_pages: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            engine: OcrEngineKind::Tesseract,
            language: "rus+eng".to_string(),
            page_segmentation_mode: 6,
            tesseract_path: "tesseract".to_string(),
            model_dir: PathBuf::from("models"),
            max_pages: 20,
        }
    }
}

/// Field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Literal substituted for fields that could not be determined.
    pub sentinel: String,

    /// Run the secondary rule pass and reconcile it with the primary one.
    pub secondary_pass: bool,

    /// JSON rule set replacing the built-in primary table.
    pub primary_rules: Option<PathBuf>,

    /// JSON rule set replacing the built-in secondary table.
    pub secondary_rules: Option<PathBuf>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL.to_string(),
            secondary_pass: true,
            primary_rules: None,
            secondary_rules: None,
        }
    }
}

/// Content cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached results.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl SchetConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
