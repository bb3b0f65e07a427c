//! Input adapters and tooling around `tax_core`: bracket tables from CSV,
//! saved form data from JSON, TOML configuration, and batch recalculation.

pub mod batch;
pub mod config;
pub mod form;
pub mod loader;

pub use batch::{BatchEntry, run_batch};
pub use config::{AppConfig, ConfigError};
pub use form::{FormData, FormDataError};
pub use loader::{BracketLoader, BracketLoaderError, BracketRecord};
