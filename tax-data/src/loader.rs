use std::io::Read;

use rust_decimal::Decimal;
use serde::Deserialize;
use tax_core::TaxBracket;
use tax_core::calculations::{BracketTable, BracketTableError};
use thiserror::Error;

/// Errors that can occur when loading bracket tables.
#[derive(Debug, Error)]
pub enum BracketLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("no bracket tables in file")]
    Empty,

    #[error("bracket table '{0}' not found in file")]
    TableNotFound(String),

    #[error("invalid bracket table '{table}': {source}")]
    InvalidTable {
        table: String,
        #[source]
        source: BracketTableError,
    },
}

impl From<csv::Error> for BracketLoaderError {
    fn from(err: csv::Error) -> Self {
        BracketLoaderError::CsvParse(err.to_string())
    }
}

/// A single row of a bracket CSV file.
///
/// - `table`: name of the schedule the row belongs to (e.g. `standard`)
/// - `min_income`: lower bound of the slab (exclusive)
/// - `max_income`: upper bound of the slab (inclusive, empty for the top slab)
/// - `base_tax`: tax on all income up to `min_income`
/// - `rate`: marginal rate as a decimal (e.g. 0.05 for 5%)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BracketRecord {
    pub table: String,
    pub min_income: Decimal,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub max_income: Option<Decimal>,
    pub base_tax: Decimal,
    pub rate: Decimal,
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Loader for bracket tables kept in CSV files.
///
/// A file may hold several tables; rows are grouped by the `table` column
/// and each group is validated as a [`BracketTable`].
pub struct BracketLoader;

impl BracketLoader {
    /// Parse bracket rows from a CSV reader.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<BracketRecord>, BracketLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: BracketRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Group rows by table name and build one validated table per group.
    ///
    /// Tables come back in the order their first row appears. Rows within a
    /// table may be in any order.
    pub fn build(records: &[BracketRecord]) -> Result<Vec<BracketTable>, BracketLoaderError> {
        let mut groups: Vec<(String, Vec<&BracketRecord>)> = Vec::new();

        for record in records {
            match groups.iter_mut().find(|(name, _)| *name == record.table) {
                Some((_, rows)) => rows.push(record),
                None => groups.push((record.table.clone(), vec![record])),
            }
        }

        groups
            .into_iter()
            .map(|(name, mut rows)| {
                rows.sort_by(|a, b| a.min_income.cmp(&b.min_income));
                let brackets = rows
                    .into_iter()
                    .map(|r| TaxBracket {
                        min_income: r.min_income,
                        max_income: r.max_income,
                        tax_rate: r.rate,
                        base_tax: r.base_tax,
                    })
                    .collect();

                BracketTable::new(name.clone(), brackets)
                    .map_err(|source| BracketLoaderError::InvalidTable { table: name, source })
            })
            .collect()
    }

    /// Read a CSV file and return the table called `name`, or the first
    /// table in the file when no name is given.
    pub fn load_table<R: Read>(
        reader: R,
        name: Option<&str>,
    ) -> Result<BracketTable, BracketLoaderError> {
        let records = Self::parse(reader)?;
        let tables = Self::build(&records)?;

        match name {
            Some(name) => tables
                .into_iter()
                .find(|t| t.name() == name)
                .ok_or_else(|| BracketLoaderError::TableNotFound(name.to_string())),
            None => tables.into_iter().next().ok_or(BracketLoaderError::Empty),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    const TEST_CSV: &str = r#"table,min_income,max_income,base_tax,rate
standard,0,600000,0,0
standard,600000,1200000,0,0.05
standard,1200000,2400000,30000,0.10
standard,2400000,3600000,150000,0.15
standard,3600000,6000000,330000,0.20
standard,6000000,,810000,0.25
extended,0,600000,0,0
extended,600000,1200000,0,0.05
extended,1200000,2400000,30000,0.10
extended,2400000,3600000,150000,0.15
extended,3600000,6000000,330000,0.20
extended,6000000,12000000,810000,0.25
extended,12000000,,2310000,0.32
"#;

    #[test]
    fn test_parse_csv_single_bracket() {
        let csv = "table,min_income,max_income,base_tax,rate\nstandard,600000,1200000,0,0.05";

        let records = BracketLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

        assert_eq!(
            records,
            vec![BracketRecord {
                table: "standard".to_string(),
                min_income: dec!(600000),
                max_income: Some(dec!(1200000)),
                base_tax: dec!(0),
                rate: dec!(0.05),
            }]
        );
    }

    #[test]
    fn test_parse_csv_open_top_bracket() {
        let csv = "table,min_income,max_income,base_tax,rate\nstandard,6000000,,810000,0.25";

        let records = BracketLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

        assert_eq!(records[0].max_income, None);
        assert_eq!(records[0].base_tax, dec!(810000));
    }

    #[test]
    fn test_parse_csv_tolerates_whitespace() {
        let csv = "table, min_income, max_income, base_tax, rate\nstandard, 0, , 0, 0.1";

        let records = BracketLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

        assert_eq!(records[0].table, "standard");
        assert_eq!(records[0].max_income, None);
        assert_eq!(records[0].rate, dec!(0.1));
    }

    #[test]
    fn test_parse_invalid_csv_missing_column() {
        let csv = "table,min_income\nstandard,0";

        let err = BracketLoader::parse(csv.as_bytes()).expect_err("Should fail for missing column");

        let BracketLoaderError::CsvParse(msg) = err else {
            panic!("Expected CsvParse error, got: {:?}", err);
        };
        assert!(msg.contains("missing field"), "got: {}", msg);
    }

    #[test]
    fn test_parse_invalid_csv_bad_decimal() {
        let csv = "table,min_income,max_income,base_tax,rate\nstandard,abc,600000,0,0";

        let err = BracketLoader::parse(csv.as_bytes()).expect_err("Should fail for bad decimal");

        assert!(matches!(err, BracketLoaderError::CsvParse(_)));
    }

    #[test]
    fn test_build_groups_tables_in_file_order() {
        let records = BracketLoader::parse(TEST_CSV.as_bytes()).expect("Failed to parse CSV");

        let tables = BracketLoader::build(&records).expect("Failed to build tables");

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].name(), "standard");
        assert_eq!(tables[0].brackets(), BracketTable::standard().brackets());
        assert_eq!(tables[1].name(), "extended");
        assert_eq!(tables[1].brackets(), BracketTable::extended().brackets());
    }

    #[test]
    fn test_build_sorts_rows_within_a_table() {
        let csv = "table,min_income,max_income,base_tax,rate\n\
                   t,1000,,100,0.2\n\
                   t,0,1000,0,0.1";
        let records = BracketLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

        let tables = BracketLoader::build(&records).expect("Failed to build tables");

        assert_eq!(tables[0].tax_for(dec!(2000)), Ok(dec!(300)));
    }

    #[test]
    fn test_build_rejects_gap() {
        let csv = "table,min_income,max_income,base_tax,rate\n\
                   broken,0,1000,0,0.1\n\
                   broken,2000,,100,0.2";
        let records = BracketLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

        let err = BracketLoader::build(&records).expect_err("gap must be rejected");

        match err {
            BracketLoaderError::InvalidTable { table, source } => {
                assert_eq!(table, "broken");
                assert_eq!(
                    source,
                    BracketTableError::Gap {
                        index: 1,
                        expected: dec!(1000),
                        found: dec!(2000),
                    }
                );
            }
            other => panic!("expected InvalidTable, got {other:?}"),
        }
    }

    #[test]
    fn test_build_rejects_base_tax_that_breaks_the_schedule() {
        let csv = "table,min_income,max_income,base_tax,rate\n\
                   cliff,0,1000,0,0.5\n\
                   cliff,1000,,0,0";
        let records = BracketLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

        let err = BracketLoader::build(&records).expect_err("tax would fall at 1000");

        let BracketLoaderError::InvalidTable { table, source } = err else {
            panic!("Expected InvalidTable error, got: {:?}", err);
        };
        assert_eq!(table, "cliff");
        assert_eq!(
            source,
            BracketTableError::Discontinuous {
                index: 1,
                expected: dec!(500),
                found: dec!(0),
            }
        );
    }

    #[test]
    fn test_load_table_by_name() {
        let table = BracketLoader::load_table(TEST_CSV.as_bytes(), Some("extended"))
            .expect("extended table present");

        assert_eq!(table.tax_for(dec!(13000000)), Ok(dec!(2630000)));
    }

    #[test]
    fn test_load_table_defaults_to_first() {
        let table =
            BracketLoader::load_table(TEST_CSV.as_bytes(), None).expect("file has tables");

        assert_eq!(table.name(), "standard");
    }

    #[test]
    fn test_load_table_missing_name() {
        let err = BracketLoader::load_table(TEST_CSV.as_bytes(), Some("2019"))
            .expect_err("no such table");

        assert!(matches!(err, BracketLoaderError::TableNotFound(ref n) if n == "2019"));
    }

    #[test]
    fn test_load_table_empty_file() {
        let csv = "table,min_income,max_income,base_tax,rate\n";

        let err = BracketLoader::load_table(csv.as_bytes(), None).expect_err("no tables");

        assert!(matches!(err, BracketLoaderError::Empty));
    }
}
