//! Persistence context: the staging area flushed by `save_changes`.

use std::marker::PhantomData;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use futures::future::BoxFuture;
use sea_orm::{
    sea_query::SimpleExpr, ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityName, EntityTrait, IntoActiveModel, QueryFilter,
    TransactionTrait,
};

use common::AppResult;

/// Kind of a staged mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A mutation waiting for the next commit.
#[async_trait]
pub(crate) trait PendingChange: Send + Sync {
    fn kind(&self) -> ChangeKind;

    fn table(&self) -> String;

    /// Apply the change inside the commit transaction.
    ///
    /// Takes `&self` so that a failed commit leaves the change staged.
    async fn apply(&self, txn: &DatabaseTransaction) -> Result<(), DbErr>;
}

/// Staged change for one active model
pub(crate) struct StagedChange<A> {
    kind: ChangeKind,
    model: A,
}

impl<A> StagedChange<A> {
    pub(crate) fn new(kind: ChangeKind, model: A) -> Self {
        Self { kind, model }
    }
}

#[async_trait]
impl<A> PendingChange for StagedChange<A>
where
    A: ActiveModelTrait + ActiveModelBehavior + Send + Sync + 'static,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
{
    fn kind(&self) -> ChangeKind {
        self.kind
    }

    fn table(&self) -> String {
        A::Entity::default().table_name().to_string()
    }

    async fn apply(&self, txn: &DatabaseTransaction) -> Result<(), DbErr> {
        let model = self.model.clone();
        match self.kind {
            ChangeKind::Insert => {
                model.insert(txn).await?;
            }
            ChangeKind::Update => {
                model.update(txn).await?;
            }
            ChangeKind::Delete => {
                model.delete(txn).await?;
            }
        }
        Ok(())
    }
}

/// Staged delete of every row matching a filter, resolved at commit time
pub(crate) struct StagedBulkDelete<E: EntityTrait> {
    filter: Condition,
    soft_delete_column: Option<E::Column>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: EntityTrait> StagedBulkDelete<E> {
    pub(crate) fn new(filter: Condition, soft_delete_column: Option<E::Column>) -> Self {
        Self {
            filter,
            soft_delete_column,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<E: EntityTrait> PendingChange for StagedBulkDelete<E> {
    fn kind(&self) -> ChangeKind {
        match self.soft_delete_column {
            Some(_) => ChangeKind::Update,
            None => ChangeKind::Delete,
        }
    }

    fn table(&self) -> String {
        E::default().table_name().to_string()
    }

    async fn apply(&self, txn: &DatabaseTransaction) -> Result<(), DbErr> {
        let result = match self.soft_delete_column {
            Some(column) => {
                E::update_many()
                    .col_expr(column, SimpleExpr::Value(Utc::now().into()))
                    .filter(column.is_null())
                    .filter(self.filter.clone())
                    .exec(txn)
                    .await?
                    .rows_affected
            }
            None => {
                E::delete_many()
                    .filter(self.filter.clone())
                    .exec(txn)
                    .await?
                    .rows_affected
            }
        };
        tracing::debug!(table = %self.table(), rows = result, "Bulk delete applied");
        Ok(())
    }
}

/// Changes taken out of the staging area for one commit attempt.
///
/// Puts them back when dropped unless the commit went through, which covers
/// store errors as well as a caller dropping the commit future mid-flight.
struct InFlight<'c> {
    context: &'c PersistenceContext,
    changes: Option<Vec<Box<dyn PendingChange>>>,
}

impl<'c> InFlight<'c> {
    fn take(context: &'c PersistenceContext) -> Self {
        let changes = std::mem::take(&mut *context.lock());
        Self {
            context,
            changes: Some(changes),
        }
    }

    fn changes(&self) -> &[Box<dyn PendingChange>] {
        self.changes.as_deref().unwrap_or_default()
    }

    fn committed(mut self) {
        self.changes = None;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(changes) = self.changes.take() {
            self.context.restore(changes);
        }
    }
}

/// Persistence context owned by a unit of work.
///
/// Holds the connection used by repositories and the ordered list of staged
/// changes. Changes are applied in staging order, all inside one transaction.
pub struct PersistenceContext {
    db: DatabaseConnection,
    pending: Mutex<Vec<Box<dyn PendingChange>>>,
}

impl PersistenceContext {
    pub(crate) fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Connection used for repository reads
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Number of changes waiting for the next commit
    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    /// Drop every staged change, returning how many were dropped
    pub fn discard(&self) -> usize {
        let discarded = std::mem::take(&mut *self.lock());
        discarded.len()
    }

    pub(crate) fn stage(&self, change: Box<dyn PendingChange>) {
        tracing::debug!(table = %change.table(), kind = ?change.kind(), "Change staged");
        self.lock().push(change);
    }

    /// Commit every staged change atomically.
    ///
    /// Returns the number of changes applied.
    pub async fn save_changes(&self) -> AppResult<usize> {
        let ((), applied) = self
            .save_changes_with(|_| Box::pin(async { Ok::<(), DbErr>(()) }))
            .await?;
        Ok(applied)
    }

    /// Commit every staged change, then run `finish` in the same transaction.
    ///
    /// On any failure the transaction is rolled back, the staged changes are
    /// kept and the store error is returned unchanged.
    pub(crate) async fn save_changes_with<F, T>(&self, finish: F) -> AppResult<(T, usize)>
    where
        F: for<'t> FnOnce(&'t DatabaseTransaction) -> BoxFuture<'t, Result<T, DbErr>> + Send,
        T: Send,
    {
        let inflight = InFlight::take(self);
        let count = inflight.changes().len();

        let txn = self.db.begin().await?;

        let outcome = match Self::apply_all(inflight.changes(), &txn).await {
            Ok(()) => finish(&txn).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(value) => {
                txn.commit().await?;
                inflight.committed();
                tracing::debug!(count, "Changes saved");
                Ok((value, count))
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e.into())
            }
        }
    }

    async fn apply_all(
        changes: &[Box<dyn PendingChange>],
        txn: &DatabaseTransaction,
    ) -> Result<(), DbErr> {
        for change in changes {
            change.apply(txn).await?;
        }
        Ok(())
    }

    /// Put changes back in front of anything staged meanwhile
    fn restore(&self, mut changes: Vec<Box<dyn PendingChange>>) {
        let mut pending = self.lock();
        changes.append(&mut pending);
        *pending = changes;
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Box<dyn PendingChange>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
