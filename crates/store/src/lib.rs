//! Gateway Store Library
//!
//! Generic data-access core for the banking gateway: repositories over
//! sea-orm entities, a unit of work that commits staged changes atomically
//! and runs raw commands, and offset pagination. Token persistence is built
//! on top of it.

pub mod config;
pub mod entities;
pub mod infra;
pub mod repository;
pub mod service;
pub mod types;
pub mod unit_of_work;

use std::sync::Arc;

use tracing::info;

use crate::config::StoreConfig;
use crate::infra::Database;

pub use repository::{Repository, RepositoryEntity};
pub use service::{NewAccessToken, TokenManager, TokenStore};
pub use types::{OrderBy, PageRequest, PagedResult, SortDirection, MAX_ROW_LIMIT};
pub use unit_of_work::{ConnectionFactory, Scalar, UnitOfWork, UnitOfWorkFactory};

/// Connect both pools described by `config` and build a unit of work factory.
///
/// Migrations run on the context pool.
pub async fn connect(config: &StoreConfig) -> Result<UnitOfWorkFactory, Box<dyn std::error::Error>> {
    let context = Database::connect(&config.database).await?;
    let factory = match &config.database.raw_url {
        Some(_) => {
            let raw = Database::connect_raw(&config.database).await?;
            UnitOfWorkFactory::new(Arc::new(context), Arc::new(raw))
        }
        None => UnitOfWorkFactory::from_database(context),
    };

    Ok(factory.with_command_timeout(config.database.command_timeout()))
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(action: MigrateAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = StoreConfig::from_env();
    let db = Database::connect_without_migrations(&config.database).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

/// Check that the configured database answers.
pub async fn ping() -> Result<(), Box<dyn std::error::Error>> {
    let config = StoreConfig::from_env();
    let db = Database::connect_without_migrations(&config.database).await?;
    db.ping().await?;
    info!("Database is reachable");
    Ok(())
}

/// Run trusted SQL on the raw connection and print each row as a JSON line.
pub async fn run_query(sql: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = StoreConfig::from_env();
    let factory = connect(&config).await?;

    let sql = sql.to_string();
    let rows = with_unit_of_work!(factory, |uow| uow.execute_query(&sql).await)?;
    for row in &rows {
        println!("{}", serde_json::to_string(row)?);
    }
    info!(rows = rows.len(), "Query finished");
    Ok(())
}
