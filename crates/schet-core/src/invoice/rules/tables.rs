//! Built-in rule tables for Russian payment invoices.
//!
//! The primary table follows the labels of the standard "счет на оплату"
//! form. The secondary table covers alternative wording (supplier/buyer
//! labels, "к оплате", "расчетный счет") and fills what the primary misses.

use super::post::{PostStep, Validator};
use super::{EntityRuleSpec, FieldRuleSpec, RuleSet};
use crate::models::fields::{Entity, FieldId};

const AMOUNT_STEPS: &[PostStep] = &[PostStep::StripDigitGroups, PostStep::DecimalComma, PostStep::Numeric];
const TEXT_STEPS: &[PostStep] = &[PostStep::Trim];

const ENTITY_CONTINUATION: &str = r"^(?i:инн|кпп)";

/// Amount capture: digit groups split by (non-breaking) spaces, optional kopecks.
const AMOUNT: &str = r"(\d{1,3}(?:[ \x{a0}]\d{3})+(?:[.,]\d{2})?|\d+(?:[.,]\d{2})?)";

/// `prefix`, the amount capture, then `suffix`.
fn amount(prefix: &str, suffix: &str) -> String {
    format!("{}{}{}", prefix, AMOUNT, suffix)
}

/// Primary extraction table.
pub fn primary_rules() -> RuleSet {
    RuleSet {
        name: "primary".to_string(),
        fields: vec![
            FieldRuleSpec::new(
                FieldId::AccountNumber,
                &[
                    r"(?i)сч[её]т(?:\s+на\s+оплату)?[а\s]+[№n]?\s*:?\s*(\d+)",
                    r"[№N]\s*:?\s*(\d{4,})",
                    r"(?i)сч[её]т\s+(\d+)",
                ],
            ),
            FieldRuleSpec::new(
                FieldId::Date,
                &[
                    r"\b(\d{1,2}[./]\d{1,2}[./]\d{2,4})\b",
                    r"\b(\d{4}-\d{2}-\d{2})\b",
                ],
            )
            .with_validator(Validator::CalendarDate),
            FieldRuleSpec::new(
                FieldId::Amount,
                &[
                    amount(r"(?i)сумма[:\s]+", ""),
                    amount(r"(?i)сумма\s+к\s+оплате[:\s]+", ""),
                    amount("(?i)", r"\s*руб"),
                ],
            )
            .with_post(AMOUNT_STEPS),
            FieldRuleSpec::new(
                FieldId::PaymentPurpose,
                &[
                    r"(?s)(?i:назначение\s+платежа)[:\s]+(.+?)(?:\n\s*\n|\n\p{Lu}|$)",
                    r"(?s)(?i:назначение)[:\s]+(.+?)(?:\n\s*\n|\n\p{Lu}|$)",
                ],
            )
            .with_post(&[PostStep::Trim, PostStep::Truncate(500)]),
            FieldRuleSpec::new(FieldId::Currency, &[r"(?i)валюта[:\s]+([а-яёa-z]{3})"])
                .with_post(&[PostStep::Trim, PostStep::Uppercase]),
            FieldRuleSpec::new(
                FieldId::Vat,
                &[amount(r"(?i)\bндс(?:\s*\(?\d{1,2}\s*%\)?)?[:\s]+", "")],
            )
            .with_post(AMOUNT_STEPS),
            FieldRuleSpec::new(
                FieldId::AmountInWords,
                &[r"(?s)(?i:сумма\s+прописью)[:\s]+(.+?)(?:\n|(?i:сумма|итого)|$)"],
            )
            .with_post(&[PostStep::Trim, PostStep::Truncate(200)]),
            FieldRuleSpec::new(
                FieldId::Contract,
                &[
                    r"(?s)(?i:договор)[:\s]+(.+?)(?:\n\s*\n|\n\p{Lu}|\s(?i:от)\s|$)",
                    r"(?s)(?i:соглашение)[:\s]+(.+?)(?:\n\s*\n|\n\p{Lu}|\s(?i:от)\s|$)",
                ],
            )
            .with_post(&[PostStep::Trim, PostStep::Truncate(100)]),
            FieldRuleSpec::new(
                FieldId::PaymentDue,
                &[
                    r"(?i)срок\s+оплаты[:\s]+(\d{1,2}[./]\d{1,2}[./]\d{2,4})\b",
                    r"(?i)оплатить\s+до[:\s]+(\d{1,2}[./]\d{1,2}[./]\d{2,4})\b",
                ],
            )
            .with_validator(Validator::CalendarDate),
        ],
        entities: vec![
            entity(Entity::Payer, &[r"(?i)\bплательщик[:\s]+"]),
            entity(
                Entity::Recipient,
                &[r"(?i)\bполучатель(?:\s+платежа)?[:\s]+"],
            ),
        ],
        bank: bank_rules(&[r"(?i)\bр/с[:\s]+(\d{20})\b"]),
    }
}

/// Secondary extraction table.
pub fn secondary_rules() -> RuleSet {
    RuleSet {
        name: "secondary".to_string(),
        fields: vec![
            FieldRuleSpec::new(
                FieldId::AccountNumber,
                &[
                    r"(?i)сч[её]т\s+№\s*(\d+)",
                    r"(?i)сч[её]т[а\s]+[№n]?\s*:?\s*(\d+)",
                    r"(?i)сч[её]т\s+(\d+)",
                ],
            ),
            FieldRuleSpec::new(
                FieldId::Date,
                &[
                    r"(?i)дата[:\s]+(\d{1,2}[./]\d{1,2}[./]\d{2,4})\b",
                    r"\b(\d{1,2}[./]\d{1,2}[./]\d{2,4})\b",
                    r"\b(\d{4}-\d{2}-\d{2})\b",
                ],
            )
            .with_validator(Validator::CalendarDate),
            FieldRuleSpec::new(
                FieldId::Amount,
                &[
                    amount(r"(?i)сумма[:\s]+", ""),
                    amount(r"(?i)к\s+оплате[:\s]+", ""),
                    amount(r"(?i)итого[:\s]+", ""),
                    amount("(?i)", r"\s*руб"),
                ],
            )
            .with_post(AMOUNT_STEPS),
            FieldRuleSpec::new(
                FieldId::PaymentPurpose,
                &[
                    r"(?s)(?i:назначение\s+платежа)[:\s]+(.+?)(?:\n\s*\n|\n\p{Lu}|$)",
                    r"(?s)(?i:назначение)[:\s]+(.+?)(?:\n\s*\n|\n\p{Lu}|$)",
                    r"(?s)(?i:оплата)[:\s]+(.+?)(?:\n\s*\n|\n\p{Lu}|$)",
                ],
            )
            .with_post(&[PostStep::Trim, PostStep::Truncate(500)]),
            FieldRuleSpec::new(FieldId::Currency, &[r"(?i)валюта[:\s]+([а-яёa-z]{3})"])
                .with_post(&[PostStep::Trim, PostStep::Uppercase]),
            FieldRuleSpec::new(
                FieldId::Vat,
                &[
                    amount(
                        r"(?i)\bв\s+т(?:ом)?\.?\s*ч(?:исле)?\.?\s+ндс[^\d\n]{0,12}(?:\d{1,2}\s*%[^\d\n]{0,6})?",
                        "",
                    ),
                    amount(r"(?i)включая\s+ндс[:\s]+", ""),
                ],
            )
            .with_post(AMOUNT_STEPS),
            FieldRuleSpec::new(
                FieldId::Contract,
                &[r"(?i)по\s+договору\s+(№\s*[^\n,]+?)(?:\s+от\s|,|\n|$)"],
            )
            .with_post(&[PostStep::Trim, PostStep::Truncate(100)]),
            FieldRuleSpec::new(
                FieldId::PaymentDue,
                &[r"(?i)оплат[аи]ть?\s+(?:не\s+позднее|до)[:\s]+(\d{1,2}[./]\d{1,2}[./]\d{2,4})\b"],
            )
            .with_validator(Validator::CalendarDate),
        ],
        entities: vec![
            entity(
                Entity::Payer,
                &[
                    r"(?i)\bплательщик[:\s]+",
                    r"(?i)\bпокупатель[:\s]+",
                    r"(?i)\bзаказчик[:\s]+",
                ],
            ),
            entity(
                Entity::Recipient,
                &[
                    r"(?i)\bполучатель(?:\s+платежа)?[:\s]+",
                    r"(?i)\bпоставщик[:\s]+",
                    r"(?i)\bпродавец[:\s]+",
                    r"(?i)\bисполнитель[:\s]+",
                ],
            ),
        ],
        bank: bank_rules(&[
            r"(?i)\bр/с[:\s]+(\d{20})\b",
            r"(?i)\bр\.?\s?с\.?[:\s]+(\d{20})\b",
            r"(?i)расч[её]тный\s+сч[её]т[:\s]+(\d{20})\b",
        ]),
    }
}

fn entity(entity: Entity, labels: &[&str]) -> EntityRuleSpec {
    EntityRuleSpec {
        entity,
        labels: labels.iter().map(|l| l.to_string()).collect(),
        continuation: ENTITY_CONTINUATION.to_string(),
        fields: party_rules(),
    }
}

fn party_rules() -> Vec<FieldRuleSpec> {
    vec![
        FieldRuleSpec::new(
            FieldId::Name,
            &[
                r"\b((?:ООО|ОАО|ЗАО|ПАО|АО|ИП)\s+[^\n]+?)\s*(?:,|\b(?i:инн|кпп)\b|\n|$)",
                r#"([А-ЯЁа-яё"«][А-ЯЁа-яё "«».-]{9,})"#,
            ],
        )
        .with_post(TEXT_STEPS),
        FieldRuleSpec::new(
            FieldId::Inn,
            &[
                r"(?i)инн[:\s]+(\d{10,12})\b",
                r"(?i)инн\s*/\s*кпп[:\s]+(\d{10,12})\b",
            ],
        ),
        FieldRuleSpec::new(
            FieldId::Kpp,
            &[
                r"(?i)кпп[:\s]+(\d{9})\b",
                r"(?i)инн\s*/\s*кпп[:\s]+\d{10,12}\s*/\s*(\d{9})\b",
            ],
        ),
    ]
}

fn bank_rules(account_patterns: &[&str]) -> Vec<FieldRuleSpec> {
    vec![
        FieldRuleSpec::new(
            FieldId::Name,
            &[r"(?i)\bбанк(?:\s+получателя|\s+плательщика)?[:\s]+([^\n]+?)\s*(?:,|\bбик|\bинн|\n|$)"],
        )
        .with_post(TEXT_STEPS),
        FieldRuleSpec::new(FieldId::Bik, &[r"(?i)\bбик[:\s]+(\d{9})\b"]),
        FieldRuleSpec::new(FieldId::SettlementAccount, account_patterns),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_compile() {
        let primary = primary_rules().compile().unwrap();
        let secondary = secondary_rules().compile().unwrap();
        assert_eq!(primary.name(), "primary");
        assert_eq!(primary.entities().len(), 2);
        assert_eq!(secondary.bank().len(), 3);
    }

    #[test]
    fn test_builtin_tables_survive_json() {
        let json = serde_json::to_string(&primary_rules()).unwrap();
        let parsed: RuleSet = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, primary_rules());
    }
}
