use serde::Serialize;
use sqlx::SqlitePool;
use storage::models::{TableLayout, TableRow};
use storage::repository::RankedTableRepository;
use tracing::info;

use crate::Result;
use crate::dataset::converted_column_name;
use crate::logging::PROGRESS_TARGET;

const FIRST_NAMES_LIMIT: u32 = 5;

/// Results of the three post-load queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryReport {
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
    pub average_column: String,
    pub average: Option<f64>,
    pub first_names: Vec<String>,
}

/// Runs the fixed read-only queries against a loaded table.
pub struct QueryRunner<'a> {
    pool: &'a SqlitePool,
    layout: &'a TableLayout,
}

impl<'a> QueryRunner<'a> {
    pub fn new(pool: &'a SqlitePool, layout: &'a TableLayout) -> Self {
        Self { pool, layout }
    }

    /// Every row; the average of `average_currency`'s converted column; the
    /// names of the first five rows in load order.
    pub async fn run(&self, average_currency: &str) -> Result<QueryReport> {
        let repo = RankedTableRepository::new(self.pool, self.layout);
        let table = self.layout.table();

        info!(target: PROGRESS_TARGET, "Running the query");

        info!("SELECT * FROM {}", table);
        let rows = repo.fetch_all().await?;
        info!(target: PROGRESS_TARGET, "First query completed");

        let average_column = converted_column_name(average_currency);
        info!("SELECT AVG({}) FROM {}", average_column, table);
        let average = repo.average(&average_column).await?;
        info!(target: PROGRESS_TARGET, "Second query completed");

        info!(
            "SELECT {} FROM {} LIMIT {}",
            self.layout.key_column(),
            table,
            FIRST_NAMES_LIMIT
        );
        let first_names = repo.first_keys(FIRST_NAMES_LIMIT).await?;
        info!(target: PROGRESS_TARGET, "Third query completed");

        let columns = std::iter::once(self.layout.key_column())
            .chain(self.layout.value_columns())
            .map(|column| column.to_string())
            .collect();

        Ok(QueryReport {
            columns,
            rows,
            average_column,
            average,
            first_names,
        })
    }
}
