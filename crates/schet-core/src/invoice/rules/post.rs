//! Candidate validation and post-processing steps for field rules.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;
use crate::models::fields::FieldId;

/// Marker appended to values cut by [`PostStep::Truncate`].
pub const ELLIPSIS: &str = "...";

/// A transformation applied to a matched value, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStep {
    /// Remove leading and trailing whitespace.
    Trim,
    /// Remove digit group separators ("1 500,00" -> "1500,00").
    StripDigitGroups,
    /// Convert a decimal comma to a dot.
    DecimalComma,
    /// Require a decimal number.
    Numeric,
    /// Upper-case the value.
    Uppercase,
    /// Cut to N characters, appending an ellipsis when cut.
    Truncate(usize),
}

impl PostStep {
    /// Apply this step to a value extracted for `field`.
    pub fn apply(&self, field: FieldId, value: String) -> Result<String, ExtractionError> {
        let value = match self {
            Self::Trim => value.trim().to_string(),
            Self::StripDigitGroups => value.chars().filter(|c| !c.is_whitespace()).collect(),
            Self::DecimalComma => value.replace(',', "."),
            Self::Numeric => Decimal::from_str(&value)
                .map_err(|_| ExtractionError::Parse {
                    field: field.key().to_string(),
                    value: value.clone(),
                })?
                .to_string(),
            Self::Uppercase => value.to_uppercase(),
            Self::Truncate(max) => truncate_chars(&value, *max),
        };
        Ok(value)
    }
}

/// Run every step in order.
pub fn apply_steps(field: FieldId, steps: &[PostStep], raw: &str) -> Result<String, ExtractionError> {
    steps
        .iter()
        .try_fold(raw.to_string(), |value, step| step.apply(field, value))
}

/// Cut `value` to at most `max` characters, marking the cut with an ellipsis.
pub fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((byte_end, _)) => format!("{}{}", &value[..byte_end], ELLIPSIS),
        None => value.to_string(),
    }
}

/// Predicate a regex candidate must satisfy to count as a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validator {
    /// DD.MM.YYYY, DD/MM/YY or YYYY-MM-DD naming a real day.
    CalendarDate,
}

impl Validator {
    pub fn accepts(&self, candidate: &str) -> bool {
        match self {
            Self::CalendarDate => parse_calendar_date(candidate).is_some(),
        }
    }
}

fn parse_calendar_date(s: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = s.trim().split(['.', '/', '-']).collect();
    let [first, second, third] = parts.as_slice() else {
        return None;
    };

    let (year, month, day) = if first.len() == 4 {
        (first.parse().ok()?, second.parse().ok()?, third.parse().ok()?)
    } else {
        (parse_year(third)?, second.parse().ok()?, first.parse().ok()?)
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_year(s: &str) -> Option<i32> {
    let year: i32 = s.parse().ok()?;
    Some(match s.len() {
        // Two-digit year: 00-50 -> 2000s, 51-99 -> 1900s
        2 if year <= 50 => 2000 + year,
        2 => 1900 + year,
        4 => year,
        _ => return None,
    })
}
