use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{Result, StorageError};
use crate::models::{TableLayout, TableRow};

// Keeps each INSERT under SQLite's historical 999 bound-parameter limit for
// the widths this table is used with.
const INSERT_BATCH_ROWS: usize = 100;

pub struct RankedTableRepository<'a> {
    pool: &'a SqlitePool,
    layout: &'a TableLayout,
}

impl<'a> RankedTableRepository<'a> {
    pub fn new(pool: &'a SqlitePool, layout: &'a TableLayout) -> Self {
        Self { pool, layout }
    }

    /// Drops and recreates the table, then inserts `rows` in order.
    ///
    /// Everything happens in one transaction: readers see either the previous
    /// contents or the complete new set, never a half-loaded table.
    pub async fn replace_all(&self, rows: &[TableRow]) -> Result<u64> {
        let expected = self.layout.value_columns().len();
        if let Some(row) = rows.iter().find(|row| row.values.len() != expected) {
            return Err(StorageError::ColumnCountMismatch {
                key: row.key.clone(),
                expected,
                actual: row.values.len(),
            });
        }

        let table = self.layout.table().quoted();
        let drop_sql = format!("DROP TABLE IF EXISTS {}", table);
        let create_sql = self.layout.create_statement();
        let insert_prefix = format!("INSERT INTO {} ({}) ", table, self.layout.column_list());

        let mut tx = self.pool.begin().await?;

        sqlx::query(&drop_sql).execute(&mut *tx).await?;
        sqlx::query(&create_sql).execute(&mut *tx).await?;

        let mut inserted = 0;
        for chunk in rows.chunks(INSERT_BATCH_ROWS) {
            let mut query = QueryBuilder::<Sqlite>::new(insert_prefix.as_str());
            query.push_values(chunk, |mut values, row| {
                values.push_bind(row.key.clone());
                for value in &row.values {
                    values.push_bind(*value);
                }
            });
            inserted += query.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;

        debug!("Replaced {} with {} row(s)", self.layout.table(), inserted);
        Ok(inserted)
    }

    /// Every row, in insertion order.
    pub async fn fetch_all(&self) -> Result<Vec<TableRow>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY rowid",
            self.layout.column_list(),
            self.layout.table().quoted()
        );

        let rows = sqlx::query(&sql).fetch_all(self.pool).await?;
        rows.iter().map(|row| self.decode_row(row)).collect()
    }

    /// Average of one value column. NULL cells are ignored; an empty table
    /// (or one with only NULLs) yields `None`.
    pub async fn average(&self, column: &str) -> Result<Option<f64>> {
        let column = self.layout.value_column(column)?;
        let sql = format!(
            "SELECT AVG({}) FROM {}",
            column.quoted(),
            self.layout.table().quoted()
        );

        let average = sqlx::query_scalar::<_, Option<f64>>(&sql)
            .fetch_one(self.pool)
            .await?;

        Ok(average)
    }

    /// Keys of the first `limit` rows in insertion order.
    pub async fn first_keys(&self, limit: u32) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY rowid LIMIT ?",
            self.layout.key_column().quoted(),
            self.layout.table().quoted()
        );

        let keys = sqlx::query_scalar::<_, String>(&sql)
            .bind(i64::from(limit))
            .fetch_all(self.pool)
            .await?;

        Ok(keys)
    }

    fn decode_row(&self, row: &SqliteRow) -> Result<TableRow> {
        let key: String = row.try_get(0)?;
        let values = (1..=self.layout.value_columns().len())
            .map(|idx| row.try_get::<Option<f64>, _>(idx))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(TableRow { key, values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    fn layout() -> TableLayout {
        TableLayout::new(
            "Largest_banks",
            "Name",
            ["MC_USD_Billion", "MC_GBP_Billion"],
        )
        .unwrap()
    }

    fn row(key: &str, usd: Option<f64>, gbp: Option<f64>) -> TableRow {
        TableRow {
            key: key.to_string(),
            values: vec![usd, gbp],
        }
    }

    async fn open() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(dir.path().join("banks.db")).await.unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn test_replace_all_round_trips_in_order() {
        let (_dir, db) = open().await;
        let layout = layout();
        let repo = RankedTableRepository::new(db.pool(), &layout);

        let rows = vec![
            row("Bank B", Some(200.0), Some(160.0)),
            row("Bank A", Some(100.0), Some(80.0)),
            row("Bank C", None, None),
        ];

        assert_eq!(repo.replace_all(&rows).await.unwrap(), 3);
        assert_eq!(repo.fetch_all().await.unwrap(), rows);

        db.close().await;
    }

    #[tokio::test]
    async fn test_replace_is_idempotent() {
        let (_dir, db) = open().await;
        let layout = layout();
        let repo = RankedTableRepository::new(db.pool(), &layout);
        let rows = vec![row("Bank A", Some(100.0), Some(80.0))];

        repo.replace_all(&rows).await.unwrap();
        repo.replace_all(&rows).await.unwrap();

        assert_eq!(repo.fetch_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_average_ignores_nulls() {
        let (_dir, db) = open().await;
        let layout = layout();
        let repo = RankedTableRepository::new(db.pool(), &layout);

        repo.replace_all(&[
            row("A", Some(100.0), Some(80.0)),
            row("B", Some(50.0), Some(40.0)),
            row("C", None, None),
        ])
        .await
        .unwrap();

        let average = repo.average("MC_GBP_Billion").await.unwrap().unwrap();
        assert!((average - 60.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_average_of_empty_table_is_none() {
        let (_dir, db) = open().await;
        let layout = layout();
        let repo = RankedTableRepository::new(db.pool(), &layout);

        repo.replace_all(&[]).await.unwrap();
        assert_eq!(repo.average("MC_USD_Billion").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_average_of_unknown_column() {
        let (_dir, db) = open().await;
        let layout = layout();
        let repo = RankedTableRepository::new(db.pool(), &layout);

        let result = repo.average("MC_JPY_Billion").await;
        assert!(matches!(result, Err(StorageError::UnknownColumn(_))));
    }

    #[tokio::test]
    async fn test_first_keys_follow_insertion_order() {
        let (_dir, db) = open().await;
        let layout = layout();
        let repo = RankedTableRepository::new(db.pool(), &layout);

        let rows: Vec<_> = ["F", "E", "D", "C", "B", "A"]
            .iter()
            .map(|name| row(name, Some(1.0), Some(1.0)))
            .collect();
        repo.replace_all(&rows).await.unwrap();

        assert_eq!(
            repo.first_keys(5).await.unwrap(),
            vec!["F", "E", "D", "C", "B"]
        );
    }

    #[tokio::test]
    async fn test_mismatched_row_width_leaves_table_untouched() {
        let (_dir, db) = open().await;
        let layout = layout();
        let repo = RankedTableRepository::new(db.pool(), &layout);

        repo.replace_all(&[row("A", Some(1.0), Some(1.0))])
            .await
            .unwrap();

        let bad = TableRow {
            key: "B".to_string(),
            values: vec![Some(1.0)],
        };
        let result = repo.replace_all(&[bad]).await;
        assert!(matches!(
            result,
            Err(StorageError::ColumnCountMismatch { expected: 2, actual: 1, .. })
        ));
        assert_eq!(repo.fetch_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_before_load_is_database_error() {
        let (_dir, db) = open().await;
        let layout = layout();
        let repo = RankedTableRepository::new(db.pool(), &layout);

        let result = repo.fetch_all().await;
        assert!(matches!(result, Err(StorageError::Database(_))));
    }
}
