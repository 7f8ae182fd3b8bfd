//! Declarative rule tables for invoice field extraction.
//!
//! A [`RuleSet`] is plain data (and can be loaded from JSON); compiling it
//! into a [`RuleTable`] builds every regex once so a table can be shared by
//! all requests.

pub mod post;
pub mod tables;

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ExtractionError, SchetError};
use crate::models::fields::{Entity, FieldId, FieldSection};

pub use post::{PostStep, Validator};
pub use tables::{primary_rules, secondary_rules};

fn default_group() -> usize {
    1
}

/// One field rule: alternative patterns tried in order, first match wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRuleSpec {
    pub field: FieldId,
    pub patterns: Vec<String>,

    /// Capture group holding the value.
    #[serde(default = "default_group")]
    pub group: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate: Option<Validator>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post: Vec<PostStep>,
}

impl FieldRuleSpec {
    pub fn new(field: FieldId, patterns: &[impl AsRef<str>]) -> Self {
        Self {
            field,
            patterns: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            group: 1,
            validate: None,
            post: Vec::new(),
        }
    }

    pub fn with_post(mut self, steps: &[PostStep]) -> Self {
        self.post = steps.to_vec();
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validate = Some(validator);
        self
    }
}

/// Locates a payer/recipient block by label and extracts sub-fields from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRuleSpec {
    pub entity: Entity,

    /// Label patterns; the block starts right after the first match.
    pub labels: Vec<String>,

    /// Lines starting with an upper-case letter still belong to the block
    /// when they match this pattern.
    pub continuation: String,

    pub fields: Vec<FieldRuleSpec>,
}

/// A complete table: document fields, entity blocks and bank requisites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub name: String,

    #[serde(default)]
    pub fields: Vec<FieldRuleSpec>,

    #[serde(default)]
    pub entities: Vec<EntityRuleSpec>,

    /// Flat bank rules; results land in the recipient bank block.
    #[serde(default)]
    pub bank: Vec<FieldRuleSpec>,
}

impl RuleSet {
    /// Load a rule set from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, SchetError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| SchetError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Compile every pattern, rejecting bad regexes and misplaced fields.
    pub fn compile(&self) -> Result<RuleTable, ExtractionError> {
        let fields = compile_section(&self.fields, FieldSection::Document)?;
        let bank = compile_section(&self.bank, FieldSection::Bank)?;
        let entities = self
            .entities
            .iter()
            .map(EntityRule::compile)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RuleTable {
            name: self.name.clone(),
            fields,
            entities,
            bank,
        })
    }
}

fn compile_section(
    specs: &[FieldRuleSpec],
    section: FieldSection,
) -> Result<Vec<FieldRule>, ExtractionError> {
    specs.iter().map(|s| FieldRule::compile(s, section)).collect()
}

fn compile_pattern(field: &str, pattern: &str) -> Result<Regex, ExtractionError> {
    Regex::new(pattern).map_err(|e| ExtractionError::InvalidPattern {
        field: field.to_string(),
        reason: e.to_string(),
    })
}

/// Compiled field rule.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub field: FieldId,
    patterns: Vec<Regex>,
    group: usize,
    validator: Option<Validator>,
    post: Vec<PostStep>,
}

impl FieldRule {
    pub fn compile(spec: &FieldRuleSpec, section: FieldSection) -> Result<Self, ExtractionError> {
        if !spec.field.allowed_in(section) {
            return Err(ExtractionError::MisplacedField {
                field: spec.field.key().to_string(),
                section: format!("{:?}", section).to_lowercase(),
            });
        }

        let mut patterns = Vec::with_capacity(spec.patterns.len());
        for pattern in &spec.patterns {
            let regex = compile_pattern(spec.field.key(), pattern)?;
            if regex.captures_len() <= spec.group {
                return Err(ExtractionError::InvalidPattern {
                    field: spec.field.key().to_string(),
                    reason: format!("pattern {:?} has no capture group {}", pattern, spec.group),
                });
            }
            patterns.push(regex);
        }

        Ok(Self {
            field: spec.field,
            patterns,
            group: spec.group,
            validator: spec.validate,
            post: spec.post.clone(),
        })
    }

    /// First candidate in pattern order that passes validation, post-processed.
    ///
    /// An empty post-processed value counts as no match.
    pub fn apply(&self, text: &str) -> Result<Option<String>, ExtractionError> {
        for pattern in &self.patterns {
            for caps in pattern.captures_iter(text) {
                let Some(m) = caps.get(self.group) else {
                    continue;
                };
                if let Some(validator) = &self.validator {
                    if !validator.accepts(m.as_str()) {
                        continue;
                    }
                }

                let value = post::apply_steps(self.field, &self.post, m.as_str())?;
                return Ok((!value.is_empty()).then_some(value));
            }
        }
        Ok(None)
    }
}

/// Compiled entity rule.
#[derive(Debug, Clone)]
pub struct EntityRule {
    pub entity: Entity,
    labels: Vec<Regex>,
    continuation: Regex,
    fields: Vec<FieldRule>,
}

impl EntityRule {
    pub fn compile(spec: &EntityRuleSpec) -> Result<Self, ExtractionError> {
        let name = format!("{:?}", spec.entity).to_lowercase();
        let labels = spec
            .labels
            .iter()
            .map(|l| compile_pattern(&name, l))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            entity: spec.entity,
            labels,
            continuation: compile_pattern(&name, &spec.continuation)?,
            fields: compile_section(&spec.fields, FieldSection::Entity)?,
        })
    }

    pub fn fields(&self) -> &[FieldRule] {
        &self.fields
    }

    /// The text block following the first label match.
    ///
    /// The line the label sits on always belongs to the block. Following lines
    /// are included until a blank line or a line that starts with an upper-case
    /// letter and does not match the continuation pattern.
    pub fn locate_block<'t>(&self, text: &'t str) -> Option<&'t str> {
        let start = self.labels.iter().find_map(|l| l.find(text))?.end();
        let rest = &text[start..];

        let mut end = 0;
        for (i, line) in rest.split_inclusive('\n').enumerate() {
            let body = line.trim();
            if i > 0 {
                if body.is_empty() {
                    break;
                }
                let capitalized = body.chars().next().is_some_and(char::is_uppercase);
                if capitalized && !self.continuation.is_match(body) {
                    break;
                }
            }
            end += line.len();
        }

        let block = rest[..end].trim();
        (!block.is_empty()).then_some(block)
    }
}

/// A compiled, immutable rule table.
#[derive(Debug, Clone)]
pub struct RuleTable {
    name: String,
    fields: Vec<FieldRule>,
    entities: Vec<EntityRule>,
    bank: Vec<FieldRule>,
}

impl RuleTable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldRule] {
        &self.fields
    }

    pub fn entities(&self) -> &[EntityRule] {
        &self.entities
    }

    pub fn bank(&self) -> &[FieldRule] {
        &self.bank
    }
}
