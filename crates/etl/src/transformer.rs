use std::fmt;

use tracing::{info, warn};

use crate::dataset::{Dataset, RawRow, Record};
use crate::rates::RateMap;

const DECIMALS: i32 = 2;

/// Rounds to `decimals` places the way numpy's `round` does: scale, round to
/// the nearest integer with ties to even, scale back.
pub fn round_half_even(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

/// Why a row ended up without a USD market cap.
#[derive(Debug, Clone, PartialEq)]
pub enum CoercionIssue {
    Missing,
    Unparsable(String),
    Negative(f64),
}

/// A row whose market cap could not be read. The row stays in the dataset
/// with null values.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionWarning {
    pub row: usize,
    pub name: String,
    pub issue: CoercionIssue,
}

impl fmt::Display for CoercionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = format!("Row {} ('{}')", self.row + 1, self.name);
        match &self.issue {
            CoercionIssue::Missing => write!(f, "{}: market cap cell is missing", label),
            CoercionIssue::Unparsable(text) => {
                write!(f, "{}: market cap '{}' is not a number", label, text)
            }
            CoercionIssue::Negative(value) => {
                write!(f, "{}: market cap {} is negative", label, value)
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct TransformReport {
    pub warnings: Vec<CoercionWarning>,
}

impl TransformReport {
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            warn!("{}", warning);
        }
    }
}

/// Turns scraped rows into the dataset: numeric USD value plus one rounded
/// converted column per rate.
pub struct Transformer<'a> {
    rates: &'a RateMap,
}

impl<'a> Transformer<'a> {
    pub fn new(rates: &'a RateMap) -> Self {
        Self { rates }
    }

    pub fn transform(&self, rows: Vec<RawRow>) -> (Dataset, TransformReport) {
        let mut report = TransformReport::default();

        let records = rows
            .into_iter()
            .enumerate()
            .map(|(idx, row)| {
                let market_cap_usd = match coerce(row.market_cap_text.as_deref()) {
                    Ok(value) => Some(value),
                    Err(issue) => {
                        report.warnings.push(CoercionWarning {
                            row: idx,
                            name: row.name.clone(),
                            issue,
                        });
                        None
                    }
                };

                Record {
                    converted: self.convert(market_cap_usd),
                    name: row.name,
                    market_cap_usd,
                }
            })
            .collect();

        let currencies = self.rates.codes().map(str::to_string).collect();
        let dataset = Dataset::new(currencies, records);

        info!(
            "Transformed {} row(s) into {} currencies ({} without a market cap)",
            dataset.len(),
            self.rates.len(),
            report.warnings.len()
        );

        (dataset, report)
    }

    fn convert(&self, market_cap_usd: Option<f64>) -> Vec<Option<f64>> {
        self.rates
            .iter()
            .map(|(_, rate)| market_cap_usd.map(|usd| round_half_even(usd * rate, DECIMALS)))
            .collect()
    }
}

fn coerce(text: Option<&str>) -> Result<f64, CoercionIssue> {
    let text = text.ok_or(CoercionIssue::Missing)?.trim();

    match text.parse::<f64>() {
        Ok(value) if !value.is_finite() => Err(CoercionIssue::Unparsable(text.to_string())),
        Ok(value) if value < 0.0 => Err(CoercionIssue::Negative(value)),
        Ok(value) => Ok(value),
        Err(_) => Err(CoercionIssue::Unparsable(text.to_string())),
    }
}
