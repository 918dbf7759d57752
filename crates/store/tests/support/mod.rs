//! Shared fixtures: an in-memory SQLite store with a few test tables.

#![allow(dead_code)]

use sea_orm::{ConnectionTrait, DbErr, EntityTrait, Schema};

use common::DatabaseConfig;
use gateway_store_lib::infra::Database;
use gateway_store_lib::UnitOfWorkFactory;

/// Plain entity with a caller-assigned key
pub mod widget {
    use sea_orm::entity::prelude::*;

    use gateway_store_lib::RepositoryEntity;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "widgets")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: i32,
        pub name: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl RepositoryEntity for Entity {}
}

/// Soft-deletable entity
pub mod note {
    use sea_orm::entity::prelude::*;

    use gateway_store_lib::RepositoryEntity;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "notes")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: i32,
        pub body: String,
        pub deleted_at: Option<DateTimeUtc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl RepositoryEntity for Entity {
        fn soft_delete_column() -> Option<Self::Column> {
            Some(Column::DeletedAt)
        }
    }
}

/// Entity whose soft delete column cannot hold a timestamp; never stored
pub mod ledger_entry {
    use sea_orm::entity::prelude::*;

    use gateway_store_lib::RepositoryEntity;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "ledger_entries")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: i32,
        pub archived: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl RepositoryEntity for Entity {
        fn soft_delete_column() -> Option<Self::Column> {
            Some(Column::Archived)
        }
    }
}

/// In-memory SQLite lives per connection, so the pool holds exactly one.
pub fn test_config() -> DatabaseConfig {
    DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        raw_url: None,
        max_connections: 1,
        min_connections: 1,
        command_timeout_secs: 5,
    }
}

/// Migrated store with the widget and note tables created
pub async fn test_database() -> Database {
    let db = Database::connect(&test_config())
        .await
        .expect("Failed to open in-memory database");

    create_table(&db, widget::Entity).await.expect("Failed to create widgets");
    create_table(&db, note::Entity).await.expect("Failed to create notes");
    db
}

async fn create_table<E: EntityTrait>(db: &Database, entity: E) -> Result<(), DbErr> {
    let backend = db.connection().get_database_backend();
    let statement = Schema::new(backend).create_table_from_entity(entity);
    db.connection().execute(backend.build(&statement)).await?;
    Ok(())
}

pub async fn test_factory() -> UnitOfWorkFactory {
    UnitOfWorkFactory::from_database(test_database().await)
}

pub fn widget(id: i32, name: &str) -> widget::Model {
    widget::Model {
        id,
        name: name.to_string(),
    }
}

pub fn note(id: i32, body: &str) -> note::Model {
    note::Model {
        id,
        body: body.to_string(),
        deleted_at: None,
    }
}

/// Store widgets through a short-lived unit of work
pub async fn seed_widgets(factory: &UnitOfWorkFactory, widgets: Vec<widget::Model>) {
    let uow = factory.create().await.expect("Failed to create unit of work");
    uow.repository::<widget::Entity>()
        .expect("Unit of work disposed")
        .add_range(widgets);
    uow.save_changes().await.expect("Failed to seed widgets");
}

pub async fn seed_notes(factory: &UnitOfWorkFactory, notes: Vec<note::Model>) {
    let uow = factory.create().await.expect("Failed to create unit of work");
    uow.repository::<note::Entity>()
        .expect("Unit of work disposed")
        .add_range(notes);
    uow.save_changes().await.expect("Failed to seed notes");
}

pub fn ids<T>(items: &[T], id: impl Fn(&T) -> i32) -> Vec<i32> {
    items.iter().map(id).collect()
}
