//! Accès PostgreSQL: pool, schéma, transaction d'import

pub mod pool;
pub mod schema;
pub mod transaction;

pub use pool::{create_pool, check_connection, DatabaseConfig, SslMode};
pub use schema::create_schema;
pub use transaction::CensusImport;
