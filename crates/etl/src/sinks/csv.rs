use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use tracing::info;

use crate::dataset::{Dataset, NAME_COLUMN, Record, USD_COLUMN};
use crate::{EtlError, Result};

/// Writes the dataset as a comma separated file with a header row.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn write(&self, dataset: &Dataset) -> Result<()> {
        let mut writer = WriterBuilder::new().from_path(&self.path)?;

        writer.write_record(dataset.columns())?;
        for record in dataset.records() {
            writer.write_field(&record.name)?;
            for value in record.values() {
                writer.write_field(format_value(value))?;
            }
            writer.write_record(None::<&[u8]>)?;
        }
        writer.flush()?;

        info!(
            "Wrote {} row(s) to {}",
            dataset.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Empty for null. Debug formatting keeps the `.0` on whole numbers, so
/// `80` is written as `80.0`.
fn format_value(value: Option<f64>) -> String {
    value.map(|v| format!("{:?}", v)).unwrap_or_default()
}

/// Reads back a file written by [`CsvSink`]. Currency codes are recovered
/// from the `MC_<CODE>_Billion` headers.
pub fn read_dataset(path: &Path) -> Result<Dataset> {
    let mut reader = ReaderBuilder::new().from_path(path)?;
    let headers = reader.headers()?.clone();

    if headers.get(0) != Some(NAME_COLUMN) || headers.get(1) != Some(USD_COLUMN) {
        return Err(EtlError::Parse(format!(
            "{} does not start with {},{} columns",
            path.display(),
            NAME_COLUMN,
            USD_COLUMN
        )));
    }

    let currencies = headers
        .iter()
        .skip(2)
        .map(|header| {
            header
                .strip_prefix("MC_")
                .and_then(|rest| rest.strip_suffix("_Billion"))
                .map(str::to_string)
                .ok_or_else(|| EtlError::Parse(format!("Unexpected column '{}'", header)))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let mut values = row
            .iter()
            .skip(1)
            .map(parse_value)
            .collect::<Result<Vec<_>>>()?;

        if values.len() != currencies.len() + 1 {
            return Err(EtlError::Parse(format!(
                "Row {} has {} value(s), expected {}",
                records.len() + 1,
                values.len(),
                currencies.len() + 1
            )));
        }

        let converted = values.split_off(1);
        records.push(Record {
            name: row.get(0).unwrap_or_default().to_string(),
            market_cap_usd: values[0],
            converted,
        });
    }

    Ok(Dataset::new(currencies, records))
}

fn parse_value(text: &str) -> Result<Option<f64>> {
    if text.is_empty() {
        return Ok(None);
    }
    text.parse::<f64>()
        .map(Some)
        .map_err(|_| EtlError::Parse(format!("'{}' is not a number", text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::RawRow;
    use crate::rates::RateMap;
    use crate::transformer::Transformer;

    fn dataset() -> Dataset {
        let rates: RateMap = [("GBP", 0.8), ("EUR", 0.93), ("INR", 82.95)]
            .into_iter()
            .collect();
        Transformer::new(&rates)
            .transform(vec![
                RawRow::new("Bank A", "100"),
                RawRow::new("Bank, Ltd", "432.92"),
                RawRow::new("Bank C", "N/A"),
            ])
            .0
    }

    #[test]
    fn test_writes_header_and_rows_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Largest_banks_data.csv");

        CsvSink::new(&path).write(&dataset()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Name,MC_USD_Billion,MC_GBP_Billion,MC_EUR_Billion,MC_INR_Billion",
                "Bank A,100.0,80.0,93.0,8295.0",
                "\"Bank, Ltd\",432.92,346.34,402.62,35910.71",
                "Bank C,,,,",
            ]
        );
    }

    #[test]
    fn test_round_trip_matches_in_memory_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let original = dataset();

        CsvSink::new(&path).write(&original).unwrap();
        let loaded = read_dataset(&path).unwrap();

        assert_eq!(loaded.columns(), original.columns());
        assert_eq!(loaded.len(), original.len());
        for (a, b) in loaded.records().iter().zip(original.records()) {
            assert_eq!(a.name, b.name);
            for (x, y) in a.values().iter().zip(b.values()) {
                match (x, y) {
                    (Some(x), Some(y)) => assert!((x - y).abs() < 1e-2),
                    (None, None) => {}
                    other => panic!("null mismatch: {:?}", other),
                }
            }
        }
    }

    #[test]
    fn test_read_rejects_foreign_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.csv");
        std::fs::write(&path, "Currency,Rate\nGBP,0.8\n").unwrap();

        assert!(matches!(read_dataset(&path), Err(EtlError::Parse(_))));
    }
}
