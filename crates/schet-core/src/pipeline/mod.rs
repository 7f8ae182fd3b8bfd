//! The extraction pipeline: cache, acquisition, rule passes, reconciliation
//! and normalization composed into one call.

mod metrics;

pub use metrics::{MetricsSnapshot, PipelineMetrics};

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::acquisition::{AcquiredText, TextAcquisition};
use crate::cache::{CacheKey, ContentCache};
use crate::error::{Result, SchetError};
use crate::invoice::rules::{primary_rules, secondary_rules, RuleSet};
use crate::invoice::{ExtractionPass, FieldReconciler, FieldRuleEngine, NormalizedFields};
use crate::models::config::{SchetConfig, GENERIC_SENTINEL};
use crate::ocr::{detect_backend, OcrBackend};
use crate::pdf::{DirectTextBackend, PdfExtractor};

/// Result of processing one document.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    /// Fields extracted (or served from cache).
    Extracted(NormalizedFields),
    /// Neither backend produced any text.
    NoTextExtracted,
}

impl ExtractionOutcome {
    pub fn fields(&self) -> Option<&NormalizedFields> {
        match self {
            Self::Extracted(fields) => Some(fields),
            Self::NoTextExtracted => None,
        }
    }
}

/// Shared, immutable extraction pipeline. Safe to call from many threads.
pub struct ExtractionPipeline {
    acquisition: TextAcquisition,
    primary: Box<dyn ExtractionPass>,
    secondary: Option<Box<dyn ExtractionPass>>,
    reconciler: FieldReconciler,
    sentinel: String,
    cache: Arc<ContentCache<NormalizedFields>>,
    metrics: PipelineMetrics,
}

impl ExtractionPipeline {
    pub fn builder() -> ExtractionPipelineBuilder {
        ExtractionPipelineBuilder::default()
    }

    /// Build the pipeline described by `config`, detecting the OCR backend.
    pub fn from_config(config: &SchetConfig) -> Result<Self> {
        let primary = match &config.extraction.primary_rules {
            Some(path) => RuleSet::from_file(path)?,
            None => primary_rules(),
        };
        let secondary = match (&config.extraction.secondary_rules, config.extraction.secondary_pass) {
            (_, false) => None,
            (Some(path), true) => Some(RuleSet::from_file(path)?),
            (None, true) => Some(secondary_rules()),
        };

        Self::builder()
            .ocr(detect_backend(&config.ocr))
            .primary_rules(primary)
            .secondary_rules(secondary)
            .sentinel(&config.extraction.sentinel)
            .cache(Arc::new(ContentCache::new(config.cache.capacity)))
            .build()
    }

    /// Cache key for a document, for callers that track hits themselves.
    pub fn cache_key(&self, data: &[u8]) -> CacheKey {
        CacheKey::of(data)
    }

    pub fn cache(&self) -> &Arc<ContentCache<NormalizedFields>> {
        &self.cache
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn has_ocr(&self) -> bool {
        self.acquisition.has_ocr()
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    /// Process one document.
    ///
    /// A cache hit returns the stored result without touching the backends.
    /// Documents with no extractable text give
    /// [`ExtractionOutcome::NoTextExtracted`] and are not cached.
    pub fn process(&self, data: &[u8], force_ocr: bool) -> Result<ExtractionOutcome> {
        let start = Instant::now();
        let outcome = self.run(data, force_ocr);
        self.metrics.record_request(outcome.is_ok(), start.elapsed());
        outcome
    }

    fn run(&self, data: &[u8], force_ocr: bool) -> Result<ExtractionOutcome> {
        let key = self.cache_key(data);
        if let Some(cached) = self.cache.get(&key)? {
            self.metrics.record_cache(true);
            info!(%key, "served from cache");
            return Ok(ExtractionOutcome::Extracted(cached));
        }
        self.metrics.record_cache(false);

        let Some(AcquiredText { text, source }) = self.acquisition.acquire(data, force_ocr) else {
            return Ok(ExtractionOutcome::NoTextExtracted);
        };
        debug!(%key, ?source, "extracting fields");

        let fields = self.extract_from_text(&text)?;
        self.cache.set(key, fields.clone())?;
        Ok(ExtractionOutcome::Extracted(fields))
    }

    /// Run both passes over already acquired text, then reconcile and normalize.
    pub fn extract_from_text(&self, text: &str) -> Result<NormalizedFields> {
        let mut fields = self.primary.extract(text);
        if let Some(secondary) = &self.secondary {
            fields = self.reconciler.merge(fields, &secondary.extract(text));
        }
        NormalizedFields::from_fields(&fields, &self.sentinel)
    }
}

/// Assembles an [`ExtractionPipeline`] from explicit parts.
pub struct ExtractionPipelineBuilder {
    direct: Box<dyn DirectTextBackend>,
    ocr: Option<Box<dyn OcrBackend>>,
    primary: RuleSet,
    secondary: Option<RuleSet>,
    sentinel: String,
    cache: Option<Arc<ContentCache<NormalizedFields>>>,
}

impl Default for ExtractionPipelineBuilder {
    fn default() -> Self {
        Self {
            direct: Box::new(PdfExtractor::new()),
            ocr: None,
            primary: primary_rules(),
            secondary: Some(secondary_rules()),
            sentinel: GENERIC_SENTINEL.to_string(),
            cache: None,
        }
    }
}

impl ExtractionPipelineBuilder {
    pub fn direct(mut self, backend: Box<dyn DirectTextBackend>) -> Self {
        self.direct = backend;
        self
    }

    pub fn ocr(mut self, backend: Option<Box<dyn OcrBackend>>) -> Self {
        self.ocr = backend;
        self
    }

    pub fn primary_rules(mut self, rules: RuleSet) -> Self {
        self.primary = rules;
        self
    }

    /// `None` disables the secondary pass.
    pub fn secondary_rules(mut self, rules: Option<RuleSet>) -> Self {
        self.secondary = rules;
        self
    }

    pub fn sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinel = sentinel.into();
        self
    }

    /// Share a cache between pipelines; a private default-sized one is created otherwise.
    pub fn cache(mut self, cache: Arc<ContentCache<NormalizedFields>>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Compile the rule tables and assemble the pipeline.
    pub fn build(self) -> Result<ExtractionPipeline> {
        if self.sentinel.is_empty() {
            return Err(SchetError::Config("sentinel must not be empty".to_string()));
        }

        let primary = FieldRuleEngine::new(self.primary.compile()?);
        let secondary = self
            .secondary
            .map(|rules| rules.compile().map(FieldRuleEngine::new))
            .transpose()?;

        info!(
            primary = primary.table().name(),
            secondary = secondary.as_ref().map(|s| s.table().name()),
            ocr = self.ocr.is_some(),
            "extraction pipeline ready"
        );

        Ok(ExtractionPipeline {
            acquisition: TextAcquisition::new(self.direct, self.ocr),
            primary: Box::new(primary),
            secondary: secondary.map(|s| Box::new(s) as Box<dyn ExtractionPass>),
            reconciler: FieldReconciler::new(self.sentinel.clone()),
            sentinel: self.sentinel,
            cache: self.cache.unwrap_or_default(),
            metrics: PipelineMetrics::new(),
        })
    }
}
