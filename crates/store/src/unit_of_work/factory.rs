//! Unit of work creation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use sea_orm::DatabaseConnection;

use common::AppResult;

use super::UnitOfWork;
use crate::infra::Database;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Source of database connections for new units of work.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// Hand out a connection; pooled handles are cheap to clone
    async fn connect(&self) -> AppResult<DatabaseConnection>;
}

#[async_trait]
impl ConnectionFactory for Database {
    async fn connect(&self) -> AppResult<DatabaseConnection> {
        Ok(self.get_connection())
    }
}

/// Builds units of work, each with its own persistence context and raw
/// command connection.
#[derive(Clone)]
pub struct UnitOfWorkFactory {
    context: Arc<dyn ConnectionFactory>,
    connection: Arc<dyn ConnectionFactory>,
    command_timeout: Option<Duration>,
}

impl UnitOfWorkFactory {
    /// Create a factory from separate context and raw connection sources
    pub fn new(context: Arc<dyn ConnectionFactory>, connection: Arc<dyn ConnectionFactory>) -> Self {
        Self {
            context,
            connection,
            command_timeout: None,
        }
    }

    /// Create a factory where both connections come from one pool
    pub fn from_database(db: Database) -> Self {
        let db = Arc::new(db);
        Self::new(db.clone(), db)
    }

    /// Default timeout for raw commands issued by created units of work
    pub fn with_command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Create a fresh unit of work.
    ///
    /// Fails with the store error when either connection cannot be obtained.
    pub async fn create(&self) -> AppResult<UnitOfWork> {
        let context = self.context.connect().await?;
        let connection = self.connection.connect().await?;
        tracing::debug!("Unit of work created");
        Ok(UnitOfWork::new(context, connection).with_command_timeout(self.command_timeout))
    }

    /// Run `f` against a fresh unit of work, disposing it on every exit path.
    ///
    /// Unsaved changes are discarded; call `save_changes` inside `f` to keep
    /// them. See also [`with_unit_of_work!`](crate::with_unit_of_work).
    pub async fn scope<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'u> FnOnce(&'u UnitOfWork) -> BoxFuture<'u, AppResult<T>> + Send,
        T: Send,
    {
        let mut uow = self.create().await?;
        let result = f(&uow).await;
        uow.dispose();
        result
    }
}
