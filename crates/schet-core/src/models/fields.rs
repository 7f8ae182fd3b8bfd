//! Payment invoice field model.
//!
//! Every field the extractor knows about is a named `Option`. Serialization
//! keeps unresolved fields as `null` so the normalizer can turn them into the
//! configured sentinel; wire keys follow the deployed response schema.

use serde::{Deserialize, Serialize};

/// Identifier of a single extractable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldId {
    /// Invoice (account) number.
    AccountNumber,
    /// Invoice date as written in the document.
    Date,
    /// Total amount due.
    Amount,
    /// Payment purpose text.
    PaymentPurpose,
    /// Currency code.
    Currency,
    /// VAT amount.
    Vat,
    /// Amount spelled out in words.
    AmountInWords,
    /// Contract reference.
    Contract,
    /// Payment due date.
    PaymentDue,
    /// Organisation name inside a payer/recipient or bank block.
    Name,
    /// Taxpayer identification number.
    Inn,
    /// Tax registration reason code.
    Kpp,
    /// Bank identification code.
    Bik,
    /// Settlement account number.
    SettlementAccount,
}

/// The part of the record a field lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSection {
    /// Top-level scalar or additional field.
    Document,
    /// Field of a payer/recipient block.
    Entity,
    /// Field of a bank details block.
    Bank,
}

impl FieldId {
    /// Wire key used in the serialized result.
    pub fn key(&self) -> &'static str {
        match self {
            Self::AccountNumber => "номер_счета",
            Self::Date => "дата",
            Self::Amount => "сумма",
            Self::PaymentPurpose => "назначение_платежа",
            Self::Currency => "валюта",
            Self::Vat => "НДС",
            Self::AmountInWords => "сумма_прописью",
            Self::Contract => "договор",
            Self::PaymentDue => "срок_оплаты",
            Self::Name => "наименование",
            Self::Inn => "ИНН",
            Self::Kpp => "КПП",
            Self::Bik => "БИК",
            Self::SettlementAccount => "р/с",
        }
    }

    /// Whether a rule for this field may appear in the given table section.
    pub fn allowed_in(&self, section: FieldSection) -> bool {
        match section {
            FieldSection::Document => matches!(
                self,
                Self::AccountNumber
                    | Self::Date
                    | Self::Amount
                    | Self::PaymentPurpose
                    | Self::Currency
                    | Self::Vat
                    | Self::AmountInWords
                    | Self::Contract
                    | Self::PaymentDue
            ),
            FieldSection::Entity => matches!(self, Self::Name | Self::Inn | Self::Kpp),
            FieldSection::Bank => matches!(self, Self::Name | Self::Bik | Self::SettlementAccount),
        }
    }
}

impl std::fmt::Display for FieldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Which party block an entity rule extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    /// The paying side (плательщик).
    Payer,
    /// The receiving side (получатель).
    Recipient,
}

/// Extracted invoice fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceFields {
    #[serde(rename = "номер_счета")]
    pub account_number: Option<String>,

    #[serde(rename = "дата")]
    pub date: Option<String>,

    #[serde(rename = "плательщик")]
    pub payer: Option<Party>,

    #[serde(rename = "получатель")]
    pub recipient: Option<Party>,

    #[serde(rename = "сумма")]
    pub amount: Option<String>,

    #[serde(rename = "назначение_платежа")]
    pub payment_purpose: Option<String>,

    #[serde(rename = "банк_плательщика")]
    pub payer_bank: Option<BankDetails>,

    #[serde(rename = "банк_получателя")]
    pub recipient_bank: Option<BankDetails>,

    #[serde(rename = "дополнительные_поля")]
    pub additional: Option<AdditionalFields>,
}

impl InvoiceFields {
    /// Store a document-level value. Returns `false` for fields that belong
    /// to a nested block.
    pub fn set(&mut self, field: FieldId, value: String) -> bool {
        match field {
            FieldId::AccountNumber => self.account_number = Some(value),
            FieldId::Date => self.date = Some(value),
            FieldId::Amount => self.amount = Some(value),
            FieldId::PaymentPurpose => self.payment_purpose = Some(value),
            FieldId::Currency
            | FieldId::Vat
            | FieldId::AmountInWords
            | FieldId::Contract
            | FieldId::PaymentDue => {
                return self
                    .additional
                    .get_or_insert_with(AdditionalFields::default)
                    .set(field, value);
            }
            _ => return false,
        }
        true
    }

    /// Party block for the given entity.
    pub fn party_mut(&mut self, entity: Entity) -> &mut Option<Party> {
        match entity {
            Entity::Payer => &mut self.payer,
            Entity::Recipient => &mut self.recipient,
        }
    }

    /// Check if nothing was extracted.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Payer or recipient identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    #[serde(rename = "наименование")]
    pub name: Option<String>,

    #[serde(rename = "ИНН")]
    pub inn: Option<String>,

    #[serde(rename = "КПП")]
    pub kpp: Option<String>,
}

impl Party {
    pub fn set(&mut self, field: FieldId, value: String) -> bool {
        match field {
            FieldId::Name => self.name = Some(value),
            FieldId::Inn => self.inn = Some(value),
            FieldId::Kpp => self.kpp = Some(value),
            _ => return false,
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.inn.is_none() && self.kpp.is_none()
    }
}

/// Bank requisites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    #[serde(rename = "наименование")]
    pub name: Option<String>,

    #[serde(rename = "БИК")]
    pub bik: Option<String>,

    #[serde(rename = "р/с")]
    pub account: Option<String>,
}

impl BankDetails {
    pub fn set(&mut self, field: FieldId, value: String) -> bool {
        match field {
            FieldId::Name => self.name = Some(value),
            FieldId::Bik => self.bik = Some(value),
            FieldId::SettlementAccount => self.account = Some(value),
            _ => return false,
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.bik.is_none() && self.account.is_none()
    }
}

/// Secondary document fields grouped under `дополнительные_поля`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalFields {
    #[serde(rename = "валюта")]
    pub currency: Option<String>,

    #[serde(rename = "НДС")]
    pub vat: Option<String>,

    #[serde(rename = "сумма_прописью")]
    pub amount_in_words: Option<String>,

    #[serde(rename = "договор")]
    pub contract: Option<String>,

    #[serde(rename = "срок_оплаты")]
    pub payment_due: Option<String>,
}

impl AdditionalFields {
    pub fn set(&mut self, field: FieldId, value: String) -> bool {
        match field {
            FieldId::Currency => self.currency = Some(value),
            FieldId::Vat => self.vat = Some(value),
            FieldId::AmountInWords => self.amount_in_words = Some(value),
            FieldId::Contract => self.contract = Some(value),
            FieldId::PaymentDue => self.payment_due = Some(value),
            _ => return false,
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_serializes_every_known_key() {
        let value = serde_json::to_value(InvoiceFields::default()).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();

        for key in [
            "номер_счета",
            "дата",
            "плательщик",
            "получатель",
            "сумма",
            "назначение_платежа",
            "банк_плательщика",
            "банк_получателя",
            "дополнительные_поля",
        ] {
            assert!(keys.contains(&key), "missing {}", key);
        }
        assert!(value["сумма"].is_null());
    }

    #[test]
    fn test_set_routes_additional_fields() {
        let mut fields = InvoiceFields::default();
        assert!(fields.set(FieldId::Vat, "250.00".to_string()));
        assert!(fields.set(FieldId::Amount, "1500.00".to_string()));
        assert!(!fields.set(FieldId::Inn, "1234567890".to_string()));

        assert_eq!(fields.amount.as_deref(), Some("1500.00"));
        assert_eq!(
            fields.additional.unwrap().vat.as_deref(),
            Some("250.00")
        );
    }

    #[test]
    fn test_field_sections() {
        assert!(FieldId::Inn.allowed_in(FieldSection::Entity));
        assert!(!FieldId::Inn.allowed_in(FieldSection::Bank));
        assert!(FieldId::Name.allowed_in(FieldSection::Bank));
        assert!(!FieldId::Bik.allowed_in(FieldSection::Document));
    }

    #[test]
    fn test_bank_details_wire_keys() {
        let bank = BankDetails {
            name: Some("ПАО Сбербанк".to_string()),
            bik: Some("044525225".to_string()),
            account: None,
        };
        let value = serde_json::to_value(&bank).unwrap();
        assert_eq!(value["БИК"], "044525225");
        assert!(value["р/с"].is_null());
    }
}
