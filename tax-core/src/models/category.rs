use std::fmt;

use serde::{Deserialize, Serialize};

/// The form section a line item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    Income,
    Deduction,
    Expense,
    Asset,
    Withholding,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Deduction => "deduction",
            Self::Expense => "expense",
            Self::Asset => "asset",
            Self::Withholding => "withholding",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Income => "Income",
            Self::Deduction => "Deductions",
            Self::Expense => "Expenses",
            Self::Asset => "Assets",
            Self::Withholding => "Tax withheld",
        }
    }

    /// Whether amounts in this section feed the liability calculation.
    ///
    /// Expenses and assets are collected for the summary only.
    pub fn affects_liability(&self) -> bool {
        matches!(self, Self::Income | Self::Deduction | Self::Withholding)
    }
}

impl fmt::Display for Section {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common behaviour of the per-section category enums.
pub trait Category: Copy + Eq + fmt::Debug + 'static {
    /// The section every variant of this enum belongs to.
    const SECTION: Section;

    /// Every variant, in form order.
    fn all() -> &'static [Self];

    /// The camelCase key used by the form layer (e.g. `capitalGains`).
    fn as_str(&self) -> &'static str;

    /// Human readable label for summaries.
    fn label(&self) -> &'static str;

    /// Parses a form key. Unknown keys yield `None`.
    fn parse(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|c| c.as_str() == s)
    }

    /// The `"<section>.<category>"` key used for line-code lookups.
    fn line_key(&self) -> String {
        format!("{}.{}", Self::SECTION.as_str(), self.as_str())
    }
}

macro_rules! category_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $section:expr, {
            $($variant:ident => ($key:literal, $label:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub enum $name {
            $($variant),+
        }

        impl Category for $name {
            const SECTION: Section = $section;

            fn all() -> &'static [Self] {
                &[$(Self::$variant),+]
            }

            fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $key),+
                }
            }

            fn label(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(
                &self,
                f: &mut fmt::Formatter<'_>,
            ) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

category_enum!(
    /// Income streams offered by the form.
    IncomeCategory, Section::Income, {
        Salary => ("salary", "Salary"),
        Business => ("business", "Business income"),
        Rental => ("rental", "Rental income"),
        Agricultural => ("agricultural", "Agricultural income"),
        CapitalGains => ("capitalGains", "Capital gains"),
        Foreign => ("foreign", "Foreign income"),
    }
);

category_enum!(
    /// Deductible allowances and zakat.
    DeductionCategory, Section::Deduction, {
        LifeInsurance => ("lifeInsurance", "Life insurance premium"),
        Pension => ("pension", "Pension fund contribution"),
        Donations => ("donations", "Charitable donations"),
        Education => ("education", "Education expenses"),
        Royalty => ("royalty", "Royalty"),
        Zakat => ("zakat", "Zakat"),
    }
);

category_enum!(
    /// Expense heads. Summary only.
    ExpenseCategory, Section::Expense, {
        Rent => ("rent", "Rent"),
        Utilities => ("utilities", "Utilities"),
        Vehicle => ("vehicle", "Vehicle running"),
        Travel => ("travel", "Travel"),
        Medical => ("medical", "Medical"),
        Education => ("education", "Education"),
        Other => ("other", "Other expenses"),
    }
);

category_enum!(
    /// Asset heads for the wealth statement. Summary only.
    AssetCategory, Section::Asset, {
        Property => ("property", "Immovable property"),
        Vehicles => ("vehicles", "Motor vehicles"),
        BankBalance => ("bankBalance", "Bank balances"),
        Investments => ("investments", "Investments"),
        Jewelry => ("jewelry", "Jewellery"),
        Cash => ("cash", "Cash in hand"),
        Other => ("other", "Other assets"),
    }
);

category_enum!(
    /// Tax collected at source.
    WithholdingCategory, Section::Withholding, {
        Salary => ("salary", "Deducted from salary"),
        Electricity => ("electricity", "Electricity bills"),
        Telephone => ("telephone", "Telephone and mobile"),
        Vehicle => ("vehicle", "Motor vehicle tax"),
        BankTransactions => ("bankTransactions", "Bank transactions"),
        Property => ("property", "Property transfer"),
    }
);
