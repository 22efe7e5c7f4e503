use sqlx::SqlitePool;
use storage::models::{TableLayout, TableRow};
use storage::repository::RankedTableRepository;
use tracing::info;

use crate::Result;
use crate::dataset::{Dataset, NAME_COLUMN};

/// Layout of the table a dataset is stored in: `Name` as key, then every
/// numeric column in output order.
pub fn layout_for(table_name: &str, dataset: &Dataset) -> Result<TableLayout> {
    Ok(TableLayout::new(
        table_name,
        NAME_COLUMN,
        dataset.value_columns(),
    )?)
}

/// Replace-loads a dataset into one table.
pub struct TableSink<'a> {
    pool: &'a SqlitePool,
    table_name: &'a str,
}

impl<'a> TableSink<'a> {
    pub fn new(pool: &'a SqlitePool, table_name: &'a str) -> Self {
        Self { pool, table_name }
    }

    /// Drops and recreates the table with the dataset's columns and rows.
    /// Atomic: on error the previous table is left as it was.
    pub async fn load(&self, dataset: &Dataset) -> Result<TableLayout> {
        let layout = layout_for(self.table_name, dataset)?;

        let rows: Vec<TableRow> = dataset
            .records()
            .iter()
            .map(|record| TableRow {
                key: record.name.clone(),
                values: record.values(),
            })
            .collect();

        let inserted = RankedTableRepository::new(self.pool, &layout)
            .replace_all(&rows)
            .await?;

        info!("Loaded {} row(s) into table {}", inserted, self.table_name);
        Ok(layout)
    }
}
