//! PostgreSQL storage for the Tally ledger.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for the ledger tables
//! - Database migrations, including the tenant isolation policies
//! - [`PgLedgerStore`], the PostgreSQL implementation of the engine's
//!   storage traits

pub mod entities;
pub mod error;
pub mod migration;
pub mod rls;
pub mod store;

mod mapping;

pub use store::{PgLedgerStore, PgLedgerTx};

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tally_shared::config::DatabaseConfig;

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a pooled connection sized by the database configuration.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);
    Database::connect(options).await
}
