//! Core library for Russian payment invoice extraction.
//!
//! This crate provides:
//! - Text acquisition from PDFs (text layer first, OCR fallback)
//! - Rule-based field extraction with payer/recipient/bank blocks
//! - Reconciliation of a primary and a secondary rule pass
//! - Sentinel normalization and a content-addressed LRU result cache

pub mod acquisition;
pub mod cache;
pub mod error;
pub mod invoice;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;

pub use acquisition::{AcquiredText, TextAcquisition, TextSource};
pub use cache::{CacheKey, ContentCache};
pub use error::{Result, SchetError};
pub use invoice::{FieldReconciler, FieldRuleEngine, NormalizedFields, RuleSet};
pub use models::config::SchetConfig;
pub use models::fields::InvoiceFields;
pub use ocr::{ImageRecognizer, OcrBackend};
pub use pdf::{DirectTextBackend, PdfExtractor};
pub use pipeline::{ExtractionOutcome, ExtractionPipeline, MetricsSnapshot};
