//! Infrastructure layer - database connections and migrations.

mod db;
pub mod migrations;

pub use db::Database;
pub use migrations::Migrator;
