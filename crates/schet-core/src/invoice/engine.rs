//! Applies a compiled rule table to document text.

use std::collections::HashSet;

use tracing::{debug, trace, warn};

use super::rules::{FieldRule, RuleTable};
use crate::models::fields::{BankDetails, FieldId, InvoiceFields, Party};

/// One pass over the document text producing a partial record.
pub trait ExtractionPass: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Extract what this pass can find. Never fails; unresolved fields stay `None`.
    fn extract(&self, text: &str) -> InvoiceFields;
}

/// Rule-table driven field extraction.
#[derive(Debug, Clone)]
pub struct FieldRuleEngine {
    table: RuleTable,
}

impl FieldRuleEngine {
    pub fn new(table: RuleTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    /// Apply every rule of the table to `text`.
    pub fn apply(&self, text: &str) -> InvoiceFields {
        let mut result = InvoiceFields::default();

        let mut seen = HashSet::new();
        for rule in self.table.fields() {
            if seen.contains(&rule.field) {
                continue;
            }
            if let Some(value) = run_rule(rule, text) {
                seen.insert(rule.field);
                result.set(rule.field, value);
            }
        }

        for entity_rule in self.table.entities() {
            if result.party_mut(entity_rule.entity).is_some() {
                continue;
            }
            let Some(block) = entity_rule.locate_block(text) else {
                trace!(entity = ?entity_rule.entity, "no label found");
                continue;
            };

            let mut party = Party::default();
            fill_block(entity_rule.fields(), block, |field, value| party.set(field, value));
            if !party.is_empty() {
                *result.party_mut(entity_rule.entity) = Some(party);
            }
        }

        let mut bank = BankDetails::default();
        fill_block(self.table.bank(), text, |field, value| bank.set(field, value));
        if !bank.is_empty() {
            result.recipient_bank = Some(bank);
        }

        debug!(table = self.table.name(), empty = result.is_empty(), "rule pass done");
        result
    }
}

impl ExtractionPass for FieldRuleEngine {
    fn name(&self) -> &str {
        self.table.name()
    }

    fn extract(&self, text: &str) -> InvoiceFields {
        self.apply(text)
    }
}

fn fill_block(rules: &[FieldRule], text: &str, mut set: impl FnMut(FieldId, String) -> bool) {
    let mut seen = HashSet::new();
    for rule in rules {
        if seen.contains(&rule.field) {
            continue;
        }
        if let Some(value) = run_rule(rule, text) {
            seen.insert(rule.field);
            set(rule.field, value);
        }
    }
}

/// A failing rule only loses its own field.
fn run_rule(rule: &FieldRule, text: &str) -> Option<String> {
    match rule.apply(text) {
        Ok(value) => value,
        Err(e) => {
            warn!(field = %rule.field, "rule failed: {}", e);
            None
        }
    }
}
