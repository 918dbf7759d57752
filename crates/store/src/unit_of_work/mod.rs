//! Unit of Work pattern implementation.
//!
//! A unit of work scopes one logical operation:
//! - Owns a persistence context (repositories + staged changes)
//! - Owns a raw command connection for procedures, functions and queries
//! - Commits staged changes atomically through `save_changes`
//! - Releases both resources together on disposal

mod context;
mod factory;
mod raw;

use std::time::Duration;

use sea_orm::DatabaseConnection;

use common::{AppError, AppResult};

use crate::repository::Repository;

pub use context::{ChangeKind, PersistenceContext};
pub(crate) use context::{StagedBulkDelete, StagedChange};
pub use factory::{ConnectionFactory, UnitOfWorkFactory};
pub use raw::Scalar;

#[cfg(any(test, feature = "test-utils"))]
pub use factory::MockConnectionFactory;

/// One logical operation against the store.
///
/// Not meant for concurrent use: the repositories it hands out borrow it, and
/// staged changes are flushed in the order they were made. Dropping a unit of
/// work disposes it, so resources are released on every exit path.
pub struct UnitOfWork {
    context: Option<PersistenceContext>,
    connection: Option<DatabaseConnection>,
    command_timeout: Option<Duration>,
}

impl UnitOfWork {
    /// Build a unit of work over a context connection and a raw connection
    pub fn new(context: DatabaseConnection, connection: DatabaseConnection) -> Self {
        Self {
            context: Some(PersistenceContext::new(context)),
            connection: Some(connection),
            command_timeout: None,
        }
    }

    /// Default timeout for raw commands that do not specify one
    pub fn with_command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Persistence context backing the repositories
    pub fn context(&self) -> AppResult<&PersistenceContext> {
        self.context.as_ref().ok_or(AppError::Disposed)
    }

    fn connection(&self) -> AppResult<&DatabaseConnection> {
        self.connection.as_ref().ok_or(AppError::Disposed)
    }

    /// Repository for entity kind `E`, bound to this unit of work
    pub fn repository<E>(&self) -> AppResult<Repository<'_, E>> {
        Ok(Repository::new(self.context()?))
    }

    /// Commit every change staged through this unit of work's repositories.
    ///
    /// Returns the number of changes applied.
    pub async fn save_changes(&self) -> AppResult<usize> {
        self.context()?.save_changes().await
    }

    /// Whether anything is staged
    pub fn has_changes(&self) -> bool {
        self.context
            .as_ref()
            .is_some_and(|context| context.pending_count() > 0)
    }

    /// Drop staged changes without committing them
    pub fn discard_changes(&self) -> usize {
        self.context.as_ref().map_or(0, PersistenceContext::discard)
    }

    /// Release the persistence context and the raw connection.
    ///
    /// Idempotent. Unsaved changes are discarded.
    pub fn dispose(&mut self) {
        let context = self.context.take();
        let connection = self.connection.take();
        if context.is_none() && connection.is_none() {
            return;
        }

        if let Some(pending) = context
            .as_ref()
            .map(PersistenceContext::pending_count)
            .filter(|count| *count > 0)
        {
            tracing::warn!(pending, "Unit of work disposed with unsaved changes");
        }

        drop(context);
        drop(connection);
        tracing::debug!("Unit of work disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.context.is_none() && self.connection.is_none()
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Run a block against a fresh unit of work that is disposed afterwards.
///
/// Expands to [`UnitOfWorkFactory::scope`]; the block must evaluate to an
/// `AppResult`.
#[macro_export]
macro_rules! with_unit_of_work {
    ($factory:expr, |$uow:ident| $body:expr) => {
        $factory
            .scope(|$uow| ::std::boxed::Box::pin(async move { $body }))
            .await
    };
}
