pub mod csv;
pub mod queries;
pub mod table;

pub use self::csv::{CsvSink, read_dataset};
pub use queries::{QueryReport, QueryRunner};
pub use table::TableSink;
