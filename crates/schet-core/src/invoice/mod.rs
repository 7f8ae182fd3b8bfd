//! Invoice field extraction: rule passes, reconciliation and normalization.

mod engine;
pub mod normalize;
pub mod reconcile;
pub mod rules;

pub use engine::{ExtractionPass, FieldRuleEngine};
pub use normalize::{normalize, NormalizedFields};
pub use reconcile::FieldReconciler;
pub use rules::{RuleSet, RuleTable};
