//! Token persistence for the banking gateway.
//!
//! Every call runs in its own unit of work. Saving a token revokes the
//! subject's previous tokens in the same commit, so a subject normally holds
//! one active token. Two saves for one subject committed concurrently can
//! still both leave their token active; `current` then returns the newest.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, Condition, NotSet, Set};

use common::{AppError, AppResult};

use crate::entities::access_token::{self, ActiveModel, Column, Entity as AccessToken};
use crate::types::{OrderBy, PageRequest, PagedResult};
use crate::unit_of_work::UnitOfWorkFactory;
use crate::with_unit_of_work;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Token issued by a bank, ready to be stored.
#[derive(Debug, Clone)]
pub struct NewAccessToken {
    pub subject: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

impl NewAccessToken {
    fn into_active_model(self) -> ActiveModel {
        ActiveModel {
            id: NotSet,
            subject: Set(self.subject),
            access_token: Set(self.access_token),
            refresh_token: Set(self.refresh_token),
            token_type: Set(self.token_type),
            expires_at: Set(self.expires_at),
            created_at: Set(Utc::now()),
            deleted_at: Set(None),
        }
    }
}

/// Token store trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Store a token, revoking the subject's previous ones
    async fn save(&self, token: NewAccessToken) -> AppResult<access_token::Model>;

    /// Newest active token that has not expired
    async fn current(&self, subject: &str) -> AppResult<Option<access_token::Model>>;

    /// Revoke every active token of `subject`, returning how many were revoked
    async fn revoke(&self, subject: &str) -> AppResult<usize>;

    /// Active tokens of `subject`, newest first
    async fn history(
        &self,
        subject: &str,
        request: PageRequest,
    ) -> AppResult<PagedResult<access_token::Model>>;
}

/// Token store backed by units of work.
pub struct TokenManager {
    factory: Arc<UnitOfWorkFactory>,
}

impl TokenManager {
    pub fn new(factory: Arc<UnitOfWorkFactory>) -> Self {
        Self { factory }
    }
}

fn by_subject(subject: &str) -> Condition {
    Condition::all().add(Column::Subject.eq(subject))
}

#[async_trait]
impl TokenStore for TokenManager {
    async fn save(&self, token: NewAccessToken) -> AppResult<access_token::Model> {
        if token.subject.trim().is_empty() {
            return Err(AppError::validation("Token subject must not be empty"));
        }
        if token.access_token.is_empty() {
            return Err(AppError::validation("Access token must not be empty"));
        }

        with_unit_of_work!(self.factory, |uow| {
            let tokens = uow.repository::<AccessToken>()?;
            tokens.delete_where(by_subject(&token.subject));

            let stored = tokens.add_and_save(token.into_active_model()).await?;
            tracing::info!(subject = %stored.subject, id = stored.id, "Access token stored");
            Ok(stored)
        })
    }

    async fn current(&self, subject: &str) -> AppResult<Option<access_token::Model>> {
        let filter = by_subject(subject).add(Column::ExpiresAt.gt(Utc::now()));

        with_unit_of_work!(self.factory, |uow| {
            uow.repository::<AccessToken>()?.last_or_none(filter).await
        })
    }

    async fn revoke(&self, subject: &str) -> AppResult<usize> {
        let filter = by_subject(subject);

        let revoked = with_unit_of_work!(self.factory, |uow| {
            let tokens = uow.repository::<AccessToken>()?;
            tokens.delete_range(tokens.find(filter).await?)?;
            uow.save_changes().await
        })?;

        if revoked > 0 {
            tracing::info!(subject, revoked, "Access tokens revoked");
        }
        Ok(revoked)
    }

    async fn history(
        &self,
        subject: &str,
        request: PageRequest,
    ) -> AppResult<PagedResult<access_token::Model>> {
        let filter = by_subject(subject);

        with_unit_of_work!(self.factory, |uow| {
            uow.repository::<AccessToken>()?
                .get_paged(&request, filter, Some(OrderBy::new(Column::Id)))
                .await
        })
    }
}
