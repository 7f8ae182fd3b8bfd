//! Merges a secondary extraction into the primary one.
//!
//! A slot is filled from the secondary record when the primary left it
//! unresolved: absent, empty, or already holding the sentinel literal. Nested
//! blocks are merged leaf by leaf so a half-filled primary block keeps what it
//! found.

use crate::models::fields::{AdditionalFields, BankDetails, InvoiceFields, Party};

/// Fills unresolved primary fields from a secondary record.
#[derive(Debug, Clone)]
pub struct FieldReconciler {
    sentinel: String,
}

impl FieldReconciler {
    pub fn new(sentinel: impl Into<String>) -> Self {
        Self {
            sentinel: sentinel.into(),
        }
    }

    /// Merge `secondary` into `primary`. Resolved primary values are never replaced.
    pub fn merge(&self, mut primary: InvoiceFields, secondary: &InvoiceFields) -> InvoiceFields {
        self.fill(&mut primary.account_number, &secondary.account_number);
        self.fill(&mut primary.date, &secondary.date);
        self.fill(&mut primary.amount, &secondary.amount);
        self.fill(&mut primary.payment_purpose, &secondary.payment_purpose);

        self.fill_block(&mut primary.payer, &secondary.payer);
        self.fill_block(&mut primary.recipient, &secondary.recipient);
        self.fill_block(&mut primary.payer_bank, &secondary.payer_bank);
        self.fill_block(&mut primary.recipient_bank, &secondary.recipient_bank);
        self.fill_block(&mut primary.additional, &secondary.additional);

        primary
    }

    /// Whether a leaf value counts as not extracted.
    pub fn is_unresolved(&self, value: &Option<String>) -> bool {
        match value {
            None => true,
            Some(v) => v.trim().is_empty() || *v == self.sentinel,
        }
    }

    fn fill(&self, slot: &mut Option<String>, other: &Option<String>) {
        if self.is_unresolved(slot) && !self.is_unresolved(other) {
            slot.clone_from(other);
        }
    }

    fn fill_block<B: Block>(&self, slot: &mut Option<B>, other: &Option<B>) {
        let Some(other) = other else {
            return;
        };
        match slot {
            Some(current) => current.fill_from(other, self),
            None => *slot = Some(other.clone()),
        }
    }
}

/// A nested record whose leaves merge independently.
trait Block: Clone {
    fn fill_from(&mut self, other: &Self, reconciler: &FieldReconciler);
}

impl Block for Party {
    fn fill_from(&mut self, other: &Self, r: &FieldReconciler) {
        r.fill(&mut self.name, &other.name);
        r.fill(&mut self.inn, &other.inn);
        r.fill(&mut self.kpp, &other.kpp);
    }
}

impl Block for BankDetails {
    fn fill_from(&mut self, other: &Self, r: &FieldReconciler) {
        r.fill(&mut self.name, &other.name);
        r.fill(&mut self.bik, &other.bik);
        r.fill(&mut self.account, &other.account);
    }
}

impl Block for AdditionalFields {
    fn fill_from(&mut self, other: &Self, r: &FieldReconciler) {
        r.fill(&mut self.currency, &other.currency);
        r.fill(&mut self.vat, &other.vat);
        r.fill(&mut self.amount_in_words, &other.amount_in_words);
        r.fill(&mut self.contract, &other.contract);
        r.fill(&mut self.payment_due, &other.payment_due);
    }
}
