//! Persistence layer — libSQL-backed document store for enriched records.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use traits::MessageStore;
