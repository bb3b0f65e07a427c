use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tax_core::calculations::{BracketTable, LiabilityCalculator};
use tax_core::observer::MemoryObserver;
use tax_core::summary::{FilingSummary, LineCodes};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use tax_data::{AppConfig, BracketLoader, FormData, run_batch};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Income tax estimator for individual returns in Pakistan.
///
/// Reads saved form data, totals income, deductions and tax withheld, and
/// works out the liability under the progressive slab schedule.
#[derive(Debug, Parser)]
#[command(name = "pk-tax")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML config file (bracket table, amount policy, credits, line codes).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// CSV file of bracket tables; overrides the configured table.
    #[arg(long, global = true)]
    brackets: Option<PathBuf>,

    /// Bracket table name: picks a table from the CSV file, or a built-in
    /// table (`standard`, `extended`) when no file is given.
    #[arg(long, global = true)]
    table: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print totals and the tax outcome for one saved form.
    Calculate {
        /// JSON form-data file holding a single record.
        #[arg(short, long)]
        form: PathBuf,

        /// Print JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print the filing summary for one saved form.
    Summary {
        #[arg(short, long)]
        form: PathBuf,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Recalculate every record in a JSON array of saved forms.
    Batch {
        #[arg(short, long)]
        form: PathBuf,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print the active bracket table.
    Brackets,
}

// ─── tracing ─────────────────────────────────────────────────────────────────

/// Initialise the tracing subscriber.
///
/// * Honours `RUST_LOG` when set.
/// * Otherwise `info`, or `debug` with `--verbose`.
/// * Writes to stderr so `--json` output stays machine readable.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::from(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .init();
}

// ─── setup ───────────────────────────────────────────────────────────────────

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display())),
        None => Ok(AppConfig::default()),
    }
}

fn build_calculator(
    cli: &Cli,
    config: &AppConfig,
) -> Result<LiabilityCalculator> {
    let table = match (&cli.brackets, &cli.table) {
        (Some(path), name) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open: {}", path.display()))?;
            let table = BracketLoader::load_table(file, name.as_deref())
                .with_context(|| format!("Failed to load brackets: {}", path.display()))?;
            Some(table)
        }
        (None, Some(name)) => Some(
            BracketTable::builtin(name)
                .with_context(|| format!("Unknown bracket table: {name}"))?,
        ),
        (None, None) => None,
    };

    let calculator = config
        .calculator(table)
        .context("Failed to build calculator from config")?;
    debug!(table = calculator.table().name(), "calculator ready");
    Ok(calculator)
}

fn read_form(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read: {}", path.display()))
}

// ─── commands ────────────────────────────────────────────────────────────────

fn calculate(
    calculator: &LiabilityCalculator,
    path: &Path,
    json: bool,
) -> Result<()> {
    let form = FormData::from_json_str(&read_form(path)?)
        .with_context(|| format!("Failed to parse form data: {}", path.display()))?;
    let record = form.to_record();

    let observer = MemoryObserver::default();
    let assessment = calculator.assess_observed(&record, &observer);
    if observer.has_problems() {
        warn!("record has issues; see log above");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
        return Ok(());
    }

    let totals = &assessment.totals;
    let outcome = &assessment.outcome;
    println!("Total income:        {:>16}", totals.total_income);
    println!("Total deductions:    {:>16}", totals.total_deductions);
    println!("Tax withheld:        {:>16}", totals.total_withholding);
    println!("Taxable income:      {:>16}", outcome.taxable_income);
    println!("Tax before credits:  {:>16}", outcome.tax_before_credits);
    println!("Tax liability:       {:>16}", outcome.calculated_tax);
    println!("Tax paid:            {:>16}", outcome.paid_tax);
    println!("Balance due:         {:>16}", outcome.balance_due);
    println!("Refund due:          {:>16}", outcome.refund_due);
    Ok(())
}

fn summary(
    calculator: &LiabilityCalculator,
    codes: &LineCodes,
    path: &Path,
    json: bool,
) -> Result<()> {
    let form = FormData::from_json_str(&read_form(path)?)
        .with_context(|| format!("Failed to parse form data: {}", path.display()))?;
    let summary = FilingSummary::build(&form.to_record(), calculator, codes);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{summary}");
    }
    Ok(())
}

fn batch(
    calculator: &LiabilityCalculator,
    path: &Path,
    json: bool,
) -> Result<()> {
    let forms = FormData::parse_many(&read_form(path)?)
        .with_context(|| format!("Failed to parse form data: {}", path.display()))?;
    let entries = run_batch(forms, calculator);

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!(
        "{:>5}  {:<24} {:>16} {:>14} {:>14} {:>14}  {}",
        "#", "Taxpayer", "Taxable", "Tax", "Balance", "Refund", "Notes"
    );
    for entry in &entries {
        let outcome = &entry.assessment.outcome;
        let notes = match &entry.error {
            Some(error) => format!("error: {error}"),
            None => entry.issues.join("; "),
        };
        println!(
            "{:>5}  {:<24} {:>16} {:>14} {:>14} {:>14}  {}",
            entry.index,
            entry.taxpayer.as_deref().unwrap_or("—"),
            outcome.taxable_income,
            outcome.calculated_tax,
            outcome.balance_due,
            outcome.refund_due,
            notes
        );
    }
    Ok(())
}

fn brackets(calculator: &LiabilityCalculator) {
    let table = calculator.table();
    println!("Bracket table: {}", table.name());
    println!("{:>14} {:>14} {:>14} {:>8}", "Over", "Up to", "Base tax", "Rate");
    for bracket in table.brackets() {
        let max = bracket
            .max_income
            .map(|m| m.to_string())
            .unwrap_or_else(|| "—".to_string());
        println!(
            "{:>14} {:>14} {:>14} {:>7}%",
            bracket.min_income,
            max,
            bracket.base_tax,
            (bracket.tax_rate * Decimal::ONE_HUNDRED).normalize()
        );
    }
}

// ─── entry point ─────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let calculator = build_calculator(&cli, &config)?;

    match &cli.command {
        Command::Calculate { form, json } => calculate(&calculator, form, *json),
        Command::Summary { form, json } => summary(&calculator, &config.line_codes, form, *json),
        Command::Batch { form, json } => batch(&calculator, form, *json),
        Command::Brackets => {
            brackets(&calculator);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_options_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "pk-tax", "calculate", "--form", "f.json", "--table", "extended", "--json",
        ])
        .expect("valid arguments");

        assert_eq!(cli.table.as_deref(), Some("extended"));
        let Command::Calculate { form, json } = cli.command else {
            panic!("Expected calculate command");
        };
        assert_eq!(form, PathBuf::from("f.json"));
        assert!(json);
    }

    #[test]
    fn builtin_table_selected_by_name() {
        let cli = Cli::try_parse_from(["pk-tax", "--table", "extended", "brackets"])
            .expect("valid arguments");

        let calculator = build_calculator(&cli, &AppConfig::default()).expect("builtin table");

        assert_eq!(calculator.table().name(), "extended");
    }

    #[test]
    fn unknown_builtin_table_is_an_error() {
        let cli = Cli::try_parse_from(["pk-tax", "--table", "2019", "brackets"])
            .expect("valid arguments");

        assert!(build_calculator(&cli, &AppConfig::default()).is_err());
    }
}
