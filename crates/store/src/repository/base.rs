//! Generic repository over a single entity kind.

use std::marker::PhantomData;

use chrono::Utc;
use sea_orm::{
    sea_query::IntoCondition, ActiveModelBehavior, ActiveModelTrait, ColumnTrait,
    DatabaseConnection, EntityTrait, IntoActiveModel, Iterable, Order, PaginatorTrait,
    PrimaryKeyToColumn, PrimaryKeyTrait, QueryFilter, QueryOrder, QuerySelect, Select,
};

use common::{AppError, AppResult, OptionExt};

use super::RepositoryEntity;
use crate::types::{paginate, OrderBy, PageRequest, PagedResult, MAX_ROW_LIMIT};
use crate::unit_of_work::{ChangeKind, PersistenceContext, StagedBulkDelete, StagedChange};

/// CRUD and query access to one entity kind.
///
/// Reads return owned models that are not tracked: changing them has no
/// effect until they are passed back to [`update`](Self::update).
/// Mutations are staged on the owning unit of work and reach the store on
/// its next `save_changes`, except [`add_and_save`](Self::add_and_save) and
/// [`update_and_save`](Self::update_and_save), which commit immediately.
///
/// "Natural order" below means primary key order.
pub struct Repository<'a, E> {
    context: &'a PersistenceContext,
    _entity: PhantomData<fn() -> E>,
}

impl<'a, E> Repository<'a, E> {
    pub(crate) fn new(context: &'a PersistenceContext) -> Self {
        Self {
            context,
            _entity: PhantomData,
        }
    }
}

impl<'a, E> Repository<'a, E>
where
    E: RepositoryEntity + 'static,
    E::Model: IntoActiveModel<E::ActiveModel> + Sync + 'static,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync + 'static,
{
    fn db(&self) -> &DatabaseConnection {
        self.context.connection()
    }

    /// Apply the soft delete exclusion filter, if the entity has one
    fn scoped(select: Select<E>) -> Select<E> {
        match E::soft_delete_column() {
            Some(column) => select.filter(column.is_null()),
            None => select,
        }
    }

    fn in_natural_order(select: Select<E>, order: Order) -> Select<E> {
        E::PrimaryKey::iter().fold(select, |select, key| {
            select.order_by(key.into_column(), order.clone())
        })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Lazy filtered view; nothing runs until the select is executed, and
    /// every execution re-evaluates the filter against the store.
    ///
    /// Pass `Condition::all()` to match every entity.
    pub fn query<F>(&self, filter: F) -> Select<E>
    where
        F: IntoCondition,
    {
        Self::scoped(E::find().filter(filter))
    }

    /// All entities
    pub async fn get_all(&self) -> AppResult<Vec<E::Model>> {
        Ok(Self::scoped(E::find()).all(self.db()).await?)
    }

    /// Whether any entity matches; fetches at most one row
    pub async fn any<F>(&self, filter: F) -> AppResult<bool>
    where
        F: IntoCondition,
    {
        Ok(self.query(filter).one(self.db()).await?.is_some())
    }

    /// Number of matching entities
    pub async fn count<F>(&self, filter: F) -> AppResult<u64>
    where
        F: IntoCondition,
    {
        Ok(self.query(filter).count(self.db()).await?)
    }

    /// Matching entities, in store iteration order
    pub async fn find<F>(&self, filter: F) -> AppResult<Vec<E::Model>>
    where
        F: IntoCondition,
    {
        Ok(self.query(filter).all(self.db()).await?)
    }

    /// First match in natural order, or `None`
    pub async fn get_entity<F>(&self, filter: F) -> AppResult<Option<E::Model>>
    where
        F: IntoCondition,
    {
        self.first_or_none(filter).await
    }

    /// Like [`get_entity`](Self::get_entity) but also sees soft-deleted rows
    pub async fn get_entity_ignore_filter<F>(&self, filter: F) -> AppResult<Option<E::Model>>
    where
        F: IntoCondition,
    {
        Ok(Self::in_natural_order(E::find().filter(filter), Order::Asc)
            .one(self.db())
            .await?)
    }

    /// Entity by primary key, or `None`
    pub async fn get_by_id(
        &self,
        id: <E::PrimaryKey as PrimaryKeyTrait>::ValueType,
    ) -> AppResult<Option<E::Model>> {
        Ok(Self::scoped(E::find_by_id(id)).one(self.db()).await?)
    }

    /// First match in natural order; `NotFound` when nothing matches
    pub async fn first<F>(&self, filter: F) -> AppResult<E::Model>
    where
        F: IntoCondition,
    {
        self.first_or_none(filter).await?.ok_or_not_found()
    }

    pub async fn first_or_none<F>(&self, filter: F) -> AppResult<Option<E::Model>>
    where
        F: IntoCondition,
    {
        Ok(Self::in_natural_order(self.query(filter), Order::Asc)
            .one(self.db())
            .await?)
    }

    /// Last match in natural order; `NotFound` when nothing matches
    pub async fn last<F>(&self, filter: F) -> AppResult<E::Model>
    where
        F: IntoCondition,
    {
        self.last_or_none(filter).await?.ok_or_not_found()
    }

    pub async fn last_or_none<F>(&self, filter: F) -> AppResult<Option<E::Model>>
    where
        F: IntoCondition,
    {
        Ok(Self::in_natural_order(self.query(filter), Order::Desc)
            .one(self.db())
            .await?)
    }

    /// The only match; `NotFound` for none, `AmbiguousMatch` for several
    pub async fn single<F>(&self, filter: F) -> AppResult<E::Model>
    where
        F: IntoCondition,
    {
        self.single_or_none(filter).await?.ok_or_not_found()
    }

    /// The only match or `None`; `AmbiguousMatch` for several
    pub async fn single_or_none<F>(&self, filter: F) -> AppResult<Option<E::Model>>
    where
        F: IntoCondition,
    {
        let mut rows = self.query(filter).limit(2).all(self.db()).await?;
        match rows.len() {
            0 | 1 => Ok(rows.pop()),
            _ => Err(AppError::AmbiguousMatch),
        }
    }

    /// Up to `count` matches from the start of the natural order
    pub async fn get_top<F>(&self, count: u64, filter: F) -> AppResult<Vec<E::Model>>
    where
        F: IntoCondition,
    {
        Ok(Self::in_natural_order(self.query(filter), Order::Asc)
            .limit(count.min(MAX_ROW_LIMIT))
            .all(self.db())
            .await?)
    }

    /// Up to `count` matches from the end of the natural order, last first.
    ///
    /// Callers needing another field order should sort through [`query`](Self::query).
    pub async fn get_last<F>(&self, count: u64, filter: F) -> AppResult<Vec<E::Model>>
    where
        F: IntoCondition,
    {
        Ok(Self::in_natural_order(self.query(filter), Order::Desc)
            .limit(count.min(MAX_ROW_LIMIT))
            .all(self.db())
            .await?)
    }

    /// One page of matches.
    ///
    /// The order column defaults to descending. Rows are then ordered by
    /// primary key ascending, so pages never overlap even when the order
    /// column has duplicates or no column is given.
    pub async fn get_paged<F>(
        &self,
        request: &PageRequest,
        filter: F,
        order: Option<OrderBy<E::Column>>,
    ) -> AppResult<PagedResult<E::Model>>
    where
        F: IntoCondition,
    {
        let select = match order {
            Some(order) => self
                .query(filter)
                .order_by(order.column, order.direction.into()),
            None => self.query(filter),
        };

        paginate(
            Self::in_natural_order(select, Order::Asc),
            self.db(),
            request,
            None,
        )
        .await
    }

    // =========================================================================
    // Staged mutations
    // =========================================================================

    /// Stage a new entity.
    ///
    /// Accepts a model or an active model; leave generated keys `NotSet` on an
    /// active model to let the store assign them.
    pub fn insert<M>(&self, model: M)
    where
        M: IntoActiveModel<E::ActiveModel>,
    {
        self.stage(ChangeKind::Insert, model.into_active_model());
    }

    pub fn add_range<I>(&self, models: I)
    where
        I: IntoIterator,
        I::Item: IntoActiveModel<E::ActiveModel>,
    {
        for model in models {
            self.insert(model);
        }
    }

    /// Stage every column of `model` for update
    pub fn update<M>(&self, model: M)
    where
        M: IntoActiveModel<E::ActiveModel>,
    {
        self.stage(ChangeKind::Update, model.into_active_model().reset_all());
    }

    pub fn update_range<I>(&self, models: I)
    where
        I: IntoIterator,
        I::Item: IntoActiveModel<E::ActiveModel>,
    {
        for model in models {
            self.update(model);
        }
    }

    /// Stage removal of the row, regardless of soft delete support
    pub fn remove<M>(&self, model: M)
    where
        M: IntoActiveModel<E::ActiveModel>,
    {
        self.stage(ChangeKind::Delete, model.into_active_model());
    }

    pub fn remove_range<I>(&self, models: I)
    where
        I: IntoIterator,
        I::Item: IntoActiveModel<E::ActiveModel>,
    {
        for model in models {
            self.remove(model);
        }
    }

    /// Stage a delete: soft when the entity has a soft delete column, hard otherwise.
    ///
    /// Fails without staging anything when the soft delete column cannot hold
    /// a UTC timestamp.
    pub fn delete<M>(&self, model: M) -> AppResult<()>
    where
        M: IntoActiveModel<E::ActiveModel>,
    {
        match E::soft_delete_column() {
            Some(column) => {
                let mut active = model.into_active_model();
                active.try_set(column, Utc::now().into())?;
                self.stage(ChangeKind::Update, active);
            }
            None => self.remove(model),
        }
        Ok(())
    }

    /// Stage deletes for every model; stops at the first that cannot be staged
    pub fn delete_range<I>(&self, models: I) -> AppResult<()>
    where
        I: IntoIterator,
        I::Item: IntoActiveModel<E::ActiveModel>,
    {
        for model in models {
            self.delete(model)?;
        }
        Ok(())
    }

    /// Stage a delete of every row matching `filter` at commit time.
    ///
    /// The rows are selected inside the commit transaction, so rows written
    /// by the same commit before this change are included. Soft-deleted rows
    /// are left untouched. Counts as one change.
    pub fn delete_where<F>(&self, filter: F)
    where
        F: IntoCondition,
    {
        self.context.stage(Box::new(StagedBulkDelete::<E>::new(
            filter.into_condition(),
            E::soft_delete_column(),
        )));
    }

    // =========================================================================
    // Immediate commits
    // =========================================================================

    /// Insert and commit right away, together with anything already staged.
    ///
    /// Returns the stored model, including generated keys.
    pub async fn add_and_save<M>(&self, model: M) -> AppResult<E::Model>
    where
        M: IntoActiveModel<E::ActiveModel>,
    {
        let active = model.into_active_model();
        let (model, _): (E::Model, usize) = self
            .context
            .save_changes_with(move |txn| Box::pin(async move { active.insert(txn).await }))
            .await?;
        Ok(model)
    }

    /// Update and commit right away, together with anything already staged.
    pub async fn update_and_save<M>(&self, model: M) -> AppResult<E::Model>
    where
        M: IntoActiveModel<E::ActiveModel>,
    {
        let active = model.into_active_model().reset_all();
        let (model, _): (E::Model, usize) = self
            .context
            .save_changes_with(move |txn| Box::pin(async move { active.update(txn).await }))
            .await?;
        Ok(model)
    }

    fn stage(&self, kind: ChangeKind, model: E::ActiveModel) {
        self.context.stage(Box::new(StagedChange::new(kind, model)));
    }
}
