use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::is_valid_currency_code;
use crate::dataset::{USD_COLUMN, converted_column_name};
use crate::{EtlError, Result};

const CURRENCY_COLUMN: &str = "Currency";
const RATE_COLUMN: &str = "Rate";

/// Currency code → USD multiplier, in the order codes were first seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateMap {
    entries: Vec<(String, f64)>,
}

impl RateMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rate for `code`, returning the previous one if the code was
    /// already present. An existing code keeps its position.
    pub fn insert(&mut self, code: impl Into<String>, rate: f64) -> Option<f64> {
        let code = code.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == code) {
            Some((_, slot)) => Some(std::mem::replace(slot, rate)),
            None => {
                self.entries.push((code, rate));
                None
            }
        }
    }

    pub fn get(&self, code: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == code)
            .map(|(_, rate)| *rate)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(code, _)| code.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(code, rate)| (code.as_str(), *rate))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keeps only `codes`, reordered to match. Every code must be present.
    pub fn select(&self, codes: &[String]) -> Result<RateMap> {
        let mut selected = RateMap::new();
        for code in codes {
            let rate = self.get(code).ok_or_else(|| {
                EtlError::Config(format!("No exchange rate for currency '{}'", code))
            })?;
            selected.insert(code.clone(), rate);
        }
        Ok(selected)
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for RateMap {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut map = RateMap::new();
        for (code, rate) in iter {
            map.insert(code, rate);
        }
        map
    }
}

#[derive(Debug, Deserialize)]
struct RateRecord {
    #[serde(rename = "Currency")]
    currency: String,
    #[serde(rename = "Rate")]
    rate: String,
}

/// Reads the exchange rate file (`Currency,Rate` columns, header row).
pub struct RateLoader {
    currencies: Vec<String>,
}

impl RateLoader {
    /// `currencies` restricts and orders the result; empty keeps every code
    /// in file order.
    pub fn new(currencies: Vec<String>) -> Self {
        Self { currencies }
    }

    pub fn load(&self, path: &Path) -> Result<RateMap> {
        let file = std::fs::File::open(path).map_err(|e| {
            EtlError::Config(format!(
                "Cannot open exchange rate file {}: {}",
                path.display(),
                e
            ))
        })?;

        let rates = self.load_from_reader(file)?;
        info!(
            "Loaded {} exchange rate(s) from {}",
            rates.len(),
            path.display()
        );
        Ok(rates)
    }

    pub fn load_from_reader<R: Read>(&self, reader: R) -> Result<RateMap> {
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

        let headers = reader.headers().map_err(malformed)?.clone();
        for required in [CURRENCY_COLUMN, RATE_COLUMN] {
            if !headers.iter().any(|header| header == required) {
                return Err(EtlError::Config(format!(
                    "Exchange rate file is missing the '{}' column",
                    required
                )));
            }
        }

        let mut rates = RateMap::new();
        for (idx, record) in reader.deserialize::<RateRecord>().enumerate() {
            let record = record.map_err(malformed)?;
            check_code(&record.currency, idx + 2)?;
            let rate = parse_rate(&record)?;

            if let Some(previous) = rates.insert(record.currency.clone(), rate) {
                warn!(
                    "Currency '{}' repeated on line {}: rate {} replaces {}",
                    record.currency,
                    idx + 2,
                    rate,
                    previous
                );
            }
        }

        let rates = if self.currencies.is_empty() {
            rates
        } else {
            rates.select(&self.currencies)?
        };

        check_column_names(&rates)?;
        Ok(rates)
    }
}

fn malformed(err: csv::Error) -> EtlError {
    match err.position() {
        Some(position) => EtlError::Config(format!(
            "Malformed exchange rate file at line {}: {}",
            position.line(),
            err
        )),
        None => EtlError::Config(format!("Malformed exchange rate file: {}", err)),
    }
}

/// SQLite compares column names case-insensitively, so `usd` collides with
/// the base column just like `USD` does.
fn check_column_names(rates: &RateMap) -> Result<()> {
    let mut seen = vec![USD_COLUMN.to_ascii_lowercase()];
    for code in rates.codes() {
        let column = converted_column_name(code);
        let folded = column.to_ascii_lowercase();
        if seen.contains(&folded) {
            return Err(EtlError::Config(format!(
                "Currency '{}' would duplicate the {} column",
                code, column
            )));
        }
        seen.push(folded);
    }
    Ok(())
}

fn check_code(code: &str, line: usize) -> Result<()> {
    if is_valid_currency_code(code) {
        Ok(())
    } else {
        Err(EtlError::Config(format!(
            "Invalid currency code '{}' on line {}",
            code, line
        )))
    }
}

fn parse_rate(record: &RateRecord) -> Result<f64> {
    match record.rate.parse::<f64>() {
        Ok(rate) if rate.is_finite() && rate > 0.0 => Ok(rate),
        _ => Err(EtlError::Config(format!(
            "Invalid rate '{}' for currency '{}'",
            record.rate, record.currency
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(csv: &str, currencies: &[&str]) -> Result<RateMap> {
        RateLoader::new(currencies.iter().map(|c| c.to_string()).collect())
            .load_from_reader(csv.as_bytes())
    }

    #[test]
    fn test_loads_every_row_in_file_order() {
        let rates = load("Currency,Rate\nEUR,0.93\nGBP,0.8\nINR,82.95\n", &[]).unwrap();

        assert_eq!(rates.codes().collect::<Vec<_>>(), vec!["EUR", "GBP", "INR"]);
        assert_eq!(rates.get("GBP"), Some(0.8));
        assert_eq!(rates.get("INR"), Some(82.95));
    }

    #[test]
    fn test_selection_restricts_and_reorders() {
        let rates = load(
            "Currency,Rate\nEUR,0.93\nJPY,140.1\nGBP,0.8\nINR,82.95\n",
            &["GBP", "EUR", "INR"],
        )
        .unwrap();

        assert_eq!(rates.codes().collect::<Vec<_>>(), vec!["GBP", "EUR", "INR"]);
    }

    #[test]
    fn test_selected_currency_missing_from_file() {
        let result = load("Currency,Rate\nEUR,0.93\n", &["GBP"]);
        assert!(matches!(result, Err(EtlError::Config(_))));
    }

    #[test]
    fn test_duplicate_code_last_write_wins() {
        let rates = load("Currency,Rate\nGBP,0.8\nEUR,0.93\nGBP,0.79\n", &[]).unwrap();

        assert_eq!(rates.len(), 2);
        assert_eq!(rates.get("GBP"), Some(0.79));
        assert_eq!(rates.codes().next(), Some("GBP"));
    }

    #[test]
    fn test_missing_column_is_config_error() {
        let result = load("Code,Value\nGBP,0.8\n", &[]);
        assert!(matches!(result, Err(EtlError::Config(message)) if message.contains("Currency")));

        let result = load("Currency,Value\nGBP,0.8\n", &[]);
        assert!(matches!(result, Err(EtlError::Config(message)) if message.contains("Rate")));
    }

    #[test]
    fn test_extra_columns_and_whitespace_are_tolerated() {
        let rates = load("Source, Currency , Rate\necb, GBP , 0.8 \n", &[]).unwrap();
        assert_eq!(rates.get("GBP"), Some(0.8));
    }

    #[test]
    fn test_rejects_non_positive_or_unparsable_rate() {
        assert!(matches!(
            load("Currency,Rate\nGBP,0\n", &[]),
            Err(EtlError::Config(_))
        ));
        assert!(matches!(
            load("Currency,Rate\nGBP,-1.2\n", &[]),
            Err(EtlError::Config(_))
        ));
        assert!(matches!(
            load("Currency,Rate\nGBP,abc\n", &[]),
            Err(EtlError::Config(_))
        ));
    }

    #[test]
    fn test_usd_row_would_collide_with_base_column() {
        let result = load("Currency,Rate\nUSD,1.0\nGBP,0.8\n", &[]);
        assert!(matches!(result, Err(EtlError::Config(message)) if message.contains("USD")));
    }

    #[test]
    fn test_codes_differing_only_in_case_are_rejected() {
        let result = load("Currency,Rate\nusd,1.0\n", &[]);
        assert!(matches!(result, Err(EtlError::Config(_))));

        let result = load("Currency,Rate\nGBP,0.8\ngbp,0.79\n", &[]);
        assert!(matches!(result, Err(EtlError::Config(message)) if message.contains("gbp")));
    }

    #[test]
    fn test_unselected_usd_row_is_ignored() {
        let rates = load("Currency,Rate\nUSD,1.0\nGBP,0.8\n", &["GBP"]).unwrap();
        assert_eq!(rates.codes().collect::<Vec<_>>(), vec!["GBP"]);
    }

    #[test]
    fn test_invalid_or_empty_code_is_config_error() {
        let result = load("Currency,Rate\nGBP,0.8\nE-UR,0.93\n", &[]);
        assert!(matches!(result, Err(EtlError::Config(message)) if message.contains("line 3")));

        let result = load("Currency,Rate\n,0.93\n", &[]);
        assert!(matches!(result, Err(EtlError::Config(_))));
    }

    #[test]
    fn test_ragged_row_is_config_error() {
        let result = load("Currency,Rate\nEUR,0.93\nGBP,0.8,extra\n", &[]);
        assert!(matches!(result, Err(EtlError::Config(message)) if message.contains("line 3")));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = RateLoader::new(Vec::new()).load(&dir.path().join("exchange_rate.csv"));
        assert!(matches!(result, Err(EtlError::Config(_))));
    }

    #[test]
    fn test_rate_map_from_iter() {
        let rates: RateMap = [("GBP", 0.8), ("EUR", 0.93)].into_iter().collect();
        assert_eq!(rates.iter().collect::<Vec<_>>(), vec![("GBP", 0.8), ("EUR", 0.93)]);
    }
}
