pub mod database;
pub mod error;
pub mod models;
pub mod repository;

pub use database::Database;
