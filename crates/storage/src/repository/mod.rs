pub mod ranked_table;

pub use ranked_table::RankedTableRepository;
