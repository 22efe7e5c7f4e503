pub mod table;

pub use table::{TableExtractor, is_data_row};
