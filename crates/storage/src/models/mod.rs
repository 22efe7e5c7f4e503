mod identifier;
mod table;

pub use identifier::Identifier;
pub use table::{TableLayout, TableRow};
