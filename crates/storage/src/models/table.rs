use serde::Serialize;

use super::Identifier;
use crate::error::{Result, StorageError};

/// Shape of a ranked table: one text key column followed by nullable REAL
/// value columns, in a fixed order.
#[derive(Debug, Clone)]
pub struct TableLayout {
    table: Identifier,
    key_column: Identifier,
    value_columns: Vec<Identifier>,
}

impl TableLayout {
    pub fn new<I, S>(table: &str, key_column: &str, value_columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            table: Identifier::new(table)?,
            key_column: Identifier::new(key_column)?,
            value_columns: value_columns
                .into_iter()
                .map(|name| Identifier::new(name.as_ref()))
                .collect::<Result<Vec<_>>>()?,
        })
    }

    pub fn table(&self) -> &Identifier {
        &self.table
    }

    pub fn key_column(&self) -> &Identifier {
        &self.key_column
    }

    pub fn value_columns(&self) -> &[Identifier] {
        &self.value_columns
    }

    pub fn value_column(&self, name: &str) -> Result<&Identifier> {
        self.value_columns
            .iter()
            .find(|column| column.as_str() == name)
            .ok_or_else(|| StorageError::UnknownColumn(name.to_string()))
    }

    /// Quoted, comma separated list of every column, key first.
    pub(crate) fn column_list(&self) -> String {
        std::iter::once(&self.key_column)
            .chain(&self.value_columns)
            .map(Identifier::quoted)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub(crate) fn create_statement(&self) -> String {
        let columns = std::iter::once(format!("{} TEXT", self.key_column.quoted()))
            .chain(
                self.value_columns
                    .iter()
                    .map(|column| format!("{} REAL", column.quoted())),
            )
            .collect::<Vec<_>>()
            .join(", ");

        format!("CREATE TABLE {} ({})", self.table.quoted(), columns)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub key: String,
    pub values: Vec<Option<f64>>,
}
