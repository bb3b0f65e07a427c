//! Conversion from the UI's form-data JSON into a [`FilingRecord`].
//!
//! The form stores each section as two parallel maps: one of toggles keyed by
//! category name and one of amounts keyed by a field name derived from the
//! category (`salaryIncome`, `zakat`, `zakatAmount`, ...). Amounts arrive as
//! numbers, as strings typed by the user, or not at all.
//!
//! Nothing here rejects a record because of a bad amount or toggle. An
//! unparseable amount counts as zero and is logged, a toggle that is null or
//! not a boolean counts as off, and a toggle or amount for a category the
//! form no longer offers is logged and dropped.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tax_core::{
    AssetCategory, Category, DeductionCategory, ExpenseCategory, FilingRecord, IncomeCategory,
    LineItem, SpecialCredits, Taxpayer, WithholdingCategory,
};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum FormDataError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a single form record, found an array of {0}")]
    UnexpectedArray(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    #[serde(alias = "name")]
    pub full_name: String,
    pub cnic: String,
}

/// One saved form, as the UI writes it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormData {
    pub tax_year: Option<i32>,
    pub personal_info: Option<PersonalInfo>,
    #[serde(deserialize_with = "lenient_toggles")]
    pub income_streams: BTreeMap<String, bool>,
    #[serde(deserialize_with = "nullable_amounts")]
    pub income_amounts: BTreeMap<String, Value>,
    #[serde(deserialize_with = "lenient_toggles")]
    pub deduction_flags: BTreeMap<String, bool>,
    #[serde(deserialize_with = "nullable_amounts")]
    pub deduction_amounts: BTreeMap<String, Value>,
    #[serde(deserialize_with = "lenient_toggles")]
    pub expense_flags: BTreeMap<String, bool>,
    #[serde(deserialize_with = "nullable_amounts")]
    pub expense_amounts: BTreeMap<String, Value>,
    #[serde(deserialize_with = "lenient_toggles")]
    pub asset_flags: BTreeMap<String, bool>,
    #[serde(deserialize_with = "nullable_amounts")]
    pub asset_amounts: BTreeMap<String, Value>,
    #[serde(deserialize_with = "lenient_toggles")]
    pub withholding_flags: BTreeMap<String, bool>,
    #[serde(deserialize_with = "nullable_amounts")]
    pub withholding_amounts: BTreeMap<String, Value>,
    pub paid_tax: Option<Value>,
    #[serde(deserialize_with = "lenient_credits")]
    pub special_credits: SpecialCredits,
}

/// Reads a toggle map. A null map is empty; a null or non-boolean toggle is
/// off. A section that is not a map at all still fails the record.
fn lenient_toggles<'de, D>(deserializer: D) -> Result<BTreeMap<String, bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Value>> = Option::deserialize(deserializer)?;

    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| {
            let on = match value {
                Value::Bool(on) => on,
                Value::Null => false,
                other => {
                    warn!(key = %key, input = %other, "toggle is not true or false; treated as off");
                    false
                }
            };
            (key, on)
        })
        .collect())
}

fn nullable_amounts<'de, D>(deserializer: D) -> Result<BTreeMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Value>> = Option::deserialize(deserializer)?;
    Ok(raw.unwrap_or_default())
}

/// Special credits follow the toggle rules: null means none claimed.
fn lenient_credits<'de, D>(deserializer: D) -> Result<SpecialCredits, D::Error>
where
    D: Deserializer<'de>,
{
    let flags = lenient_toggles(deserializer)?;
    let flag = |key: &str| flags.get(key).copied().unwrap_or(false);

    Ok(SpecialCredits {
        first_time_filer: flag("firstTimeFiler"),
        it_sector: flag("itSector"),
        export_industry: flag("exportIndustry"),
    })
}

impl FormData {
    /// Parses a single form record.
    pub fn from_json_str(input: &str) -> Result<Self, FormDataError> {
        let value: Value = serde_json::from_str(input)?;
        if let Value::Array(items) = &value {
            return Err(FormDataError::UnexpectedArray(items.len()));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Parses a file holding either one record or an array of records.
    ///
    /// The outer document must be valid JSON. Each element is converted on
    /// its own, so one malformed record does not hide the others.
    pub fn parse_many(input: &str) -> Result<Vec<Result<Self, FormDataError>>, FormDataError> {
        let value: Value = serde_json::from_str(input)?;
        let items = match value {
            Value::Array(items) => items,
            single => vec![single],
        };

        Ok(items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(FormDataError::from))
            .collect())
    }

    /// Builds the record the calculator works on.
    ///
    /// A category appears in the record when it has a toggle or an amount.
    /// When the form carries no withholding toggles at all, every withholding
    /// amount present is taken as active.
    pub fn to_record(&self) -> FilingRecord {
        let withholding_always_on = self.withholding_flags.is_empty();

        FilingRecord {
            tax_year: self.tax_year,
            taxpayer: self.personal_info.as_ref().map(|info| Taxpayer {
                name: info.full_name.trim().to_string(),
                cnic: info.cnic.trim().to_string(),
            }),
            income: line_items::<IncomeCategory>(
                &self.income_streams,
                &self.income_amounts,
                &["{}Income", "{}"],
                false,
            ),
            deductions: line_items::<DeductionCategory>(
                &self.deduction_flags,
                &self.deduction_amounts,
                &["{}", "{}Amount"],
                false,
            ),
            expenses: line_items::<ExpenseCategory>(
                &self.expense_flags,
                &self.expense_amounts,
                &["{}", "{}Amount"],
                false,
            ),
            assets: line_items::<AssetCategory>(
                &self.asset_flags,
                &self.asset_amounts,
                &["{}", "{}Amount"],
                false,
            ),
            withholding: line_items::<WithholdingCategory>(
                &self.withholding_flags,
                &self.withholding_amounts,
                &["{}", "{}Amount"],
                withholding_always_on,
            ),
            paid_tax: match &self.paid_tax {
                None | Some(Value::Null) => None,
                Some(value) => Some(parse_amount("paidTax", value)),
            },
            credits: self.special_credits,
        }
    }
}

fn amount_keys(
    category: &str,
    patterns: &[&str],
) -> Vec<String> {
    patterns
        .iter()
        .map(|p| p.replace("{}", category))
        .collect()
}

fn line_items<C: Category>(
    flags: &BTreeMap<String, bool>,
    amounts: &BTreeMap<String, Value>,
    patterns: &[&str],
    default_active: bool,
) -> Vec<LineItem<C>> {
    let section = C::SECTION;

    for key in flags.keys().filter(|k| C::parse(k).is_none()) {
        warn!(%section, key = %key, "unknown category toggle ignored");
    }

    let known_amount_keys: Vec<String> = C::all()
        .iter()
        .flat_map(|c| amount_keys(c.as_str(), patterns))
        .collect();
    for key in amounts.keys().filter(|k| !known_amount_keys.contains(k)) {
        warn!(%section, key = %key, "unknown amount field ignored");
    }

    C::all()
        .iter()
        .filter_map(|&category| {
            let flag = flags.get(category.as_str()).copied();
            let amount = amount_keys(category.as_str(), patterns)
                .iter()
                .find_map(|key| amounts.get(key).map(|v| (key.as_str(), v)))
                .map(|(key, value)| parse_amount(key, value));

            if flag.is_none() && amount.is_none() {
                return None;
            }

            Some(LineItem {
                category,
                active: flag.unwrap_or(default_active && amount.is_some()),
                amount: amount.unwrap_or(Decimal::ZERO),
            })
        })
        .collect()
}

/// Reads a form amount.
///
/// Strings may carry thousands separators. Null and blank strings are zero.
/// Anything that cannot be read as a number is logged and counts as zero.
pub fn parse_amount(
    field: &str,
    value: &Value,
) -> Decimal {
    match value {
        Value::Null => Decimal::ZERO,
        Value::Number(n) => {
            let text = n.to_string();
            text.parse::<Decimal>()
                .or_else(|_| Decimal::from_scientific(&text))
                .unwrap_or_else(|e| {
                    warn!(field, input = %text, "unrepresentable amount: {}", e);
                    Decimal::ZERO
                })
        }
        Value::String(s) => {
            let normalized = s.trim().replace(',', "");
            if normalized.is_empty() {
                return Decimal::ZERO;
            }
            normalized.parse().unwrap_or_else(|e| {
                warn!(field, input = %s, "invalid amount: {}", e);
                Decimal::ZERO
            })
        }
        other => {
            warn!(field, input = %other, "amount is not a number or string");
            Decimal::ZERO
        }
    }
}
