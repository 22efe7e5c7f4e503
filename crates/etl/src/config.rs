use std::path::PathBuf;

use storage::models::Identifier;
use validator::{Validate, ValidationError};

use crate::Result;

pub const DEFAULT_SOURCE_URL: &str =
    "https://web.archive.org/web/20230908091635/https://en.wikipedia.org/wiki/List_of_largest_banks";
pub const DEFAULT_RATES_PATH: &str = "./exchange_rate.csv";
pub const DEFAULT_OUTPUT_PATH: &str = "./Largest_banks_data.csv";
pub const DEFAULT_DATABASE_PATH: &str = "Banks.db";
pub const DEFAULT_TABLE_NAME: &str = "Largest_banks";
pub const DEFAULT_LOG_PATH: &str = "./code_log.txt";
pub const DEFAULT_CURRENCIES: &[&str] = &["GBP", "EUR", "INR"];
pub const DEFAULT_AVERAGE_CURRENCY: &str = "GBP";

/// Everything one pipeline run needs. Built once and handed to each stage.
#[derive(Debug, Clone, Validate)]
pub struct PipelineConfig {
    /// HTTP(S) URL or local path of the HTML page holding the table.
    #[validate(length(min = 1, message = "Source URL is required"))]
    pub source_url: String,

    pub rates_path: PathBuf,

    pub output_path: PathBuf,

    pub database_path: PathBuf,

    #[validate(custom(function = "validate_table_name"))]
    pub table_name: String,

    pub log_path: PathBuf,

    /// Codes to derive, in output order. Empty means every code in the rate file.
    #[validate(custom(function = "validate_currency_codes"))]
    pub currencies: Vec<String>,

    #[validate(custom(function = "validate_currency_code"))]
    pub average_currency: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            rates_path: PathBuf::from(DEFAULT_RATES_PATH),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            table_name: DEFAULT_TABLE_NAME.to_string(),
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            currencies: DEFAULT_CURRENCIES.iter().map(|c| c.to_string()).collect(),
            average_currency: DEFAULT_AVERAGE_CURRENCY.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Runs field validation plus the cross-field checks the derive cannot express.
    pub fn check(&self) -> Result<()> {
        self.validate()?;

        if !self.currencies.is_empty() && !self.currencies.contains(&self.average_currency) {
            return Err(crate::EtlError::Config(format!(
                "Average currency '{}' is not among the selected currencies ({})",
                self.average_currency,
                self.currencies.join(", ")
            )));
        }

        Ok(())
    }
}

fn validate_table_name(name: &str) -> std::result::Result<(), ValidationError> {
    if Identifier::is_valid(name) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_table_name"))
    }
}

/// Non-empty ASCII alphanumeric, so the derived column name is a plain identifier.
pub(crate) fn is_valid_currency_code(code: &str) -> bool {
    !code.is_empty() && code.chars().all(|c| c.is_ascii_alphanumeric())
}

fn validate_currency_code(code: &str) -> std::result::Result<(), ValidationError> {
    if is_valid_currency_code(code) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_currency_code"))
    }
}

fn validate_currency_codes(codes: &[String]) -> std::result::Result<(), ValidationError> {
    codes
        .iter()
        .try_for_each(|code| validate_currency_code(code))
}
