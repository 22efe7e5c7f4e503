use serde::Serialize;

pub const NAME_COLUMN: &str = "Name";
pub const USD_COLUMN: &str = "MC_USD_Billion";

/// Column name for market cap converted into `currency`, e.g. `MC_GBP_Billion`.
pub fn converted_column_name(currency: &str) -> String {
    format!("MC_{}_Billion", currency)
}

/// One qualifying table row as scraped, before any numeric coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub name: String,
    /// `None` when the market cap cell (or its first child) is absent.
    pub market_cap_text: Option<String>,
}

impl RawRow {
    pub fn new(name: impl Into<String>, market_cap_text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            market_cap_text: Some(market_cap_text.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub name: String,
    pub market_cap_usd: Option<f64>,
    /// One value per entry of [`Dataset::currencies`], same order.
    pub converted: Vec<Option<f64>>,
}

/// The transformed table. Rows are identified by position; names may repeat.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    currencies: Vec<String>,
    records: Vec<Record>,
}

impl Dataset {
    /// Builds a dataset, checking every record carries one converted value
    /// per currency.
    pub(crate) fn new(currencies: Vec<String>, records: Vec<Record>) -> Self {
        debug_assert!(
            records
                .iter()
                .all(|record| record.converted.len() == currencies.len())
        );
        Self {
            currencies,
            records,
        }
    }

    pub fn currencies(&self) -> &[String] {
        &self.currencies
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every column name in output order: name, USD, then one per currency.
    pub fn columns(&self) -> Vec<String> {
        [NAME_COLUMN.to_string(), USD_COLUMN.to_string()]
            .into_iter()
            .chain(self.value_columns().into_iter().skip(1))
            .collect()
    }

    /// The numeric columns only: USD followed by the converted ones.
    pub fn value_columns(&self) -> Vec<String> {
        std::iter::once(USD_COLUMN.to_string())
            .chain(self.currencies.iter().map(|c| converted_column_name(c)))
            .collect()
    }

    /// Values of one numeric column by name, or `None` if there is no such column.
    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        if name == USD_COLUMN {
            return Some(self.records.iter().map(|r| r.market_cap_usd).collect());
        }

        let idx = self
            .currencies
            .iter()
            .position(|c| converted_column_name(c) == name)?;
        Some(self.records.iter().map(|r| r.converted[idx]).collect())
    }
}

impl Record {
    /// USD value followed by the converted values, matching
    /// [`Dataset::value_columns`].
    pub fn values(&self) -> Vec<Option<f64>> {
        std::iter::once(self.market_cap_usd)
            .chain(self.converted.iter().copied())
            .collect()
    }
}
