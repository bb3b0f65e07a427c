//! TOML configuration for the `pk-tax` tool.
//!
//! Every field is optional:
//!
//! ```toml
//! bracket_table = "standard"        # or "extended"
//! amount_policy = "clamp-negative"  # or "pass-through"
//!
//! [credits]
//! first_time_filer_reduction = "50000"
//! it_sector_factor = "0.85"
//!
//! [line_codes]
//! "income.salary" = "1000"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tax_core::calculations::{
    Aggregator, AmountPolicy, BracketTable, BracketTableError, CreditPolicy, CreditPolicyError,
    LiabilityCalculator,
};
use tax_core::summary::LineCodes;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Brackets(#[from] BracketTableError),

    #[error(transparent)]
    Credits(#[from] CreditPolicyError),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Name of the built-in bracket table to use.
    pub bracket_table: String,
    pub amount_policy: AmountPolicy,
    pub credits: CreditPolicy,
    pub line_codes: LineCodes,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bracket_table: BracketTable::STANDARD.to_string(),
            amount_policy: AmountPolicy::default(),
            credits: CreditPolicy::default(),
            line_codes: LineCodes::default(),
        }
    }
}

impl AppConfig {
    /// Parses and checks a config document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.credits.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&input)?;
        debug!(path = %path.display(), table = %config.bracket_table, "config loaded");
        Ok(config)
    }

    /// The configured built-in bracket table.
    pub fn table(&self) -> Result<BracketTable, ConfigError> {
        Ok(BracketTable::builtin(&self.bracket_table)?)
    }

    /// Builds a calculator from this config.
    ///
    /// `table` replaces the configured built-in table when given, e.g. one
    /// loaded from a CSV file.
    pub fn calculator(
        &self,
        table: Option<BracketTable>,
    ) -> Result<LiabilityCalculator, ConfigError> {
        let table = match table {
            Some(table) => table,
            None => self.table()?,
        };
        self.credits.validate()?;

        Ok(LiabilityCalculator::new(table)
            .with_credit_policy(self.credits.clone())
            .with_aggregator(Aggregator::new(self.amount_policy)))
    }
}
