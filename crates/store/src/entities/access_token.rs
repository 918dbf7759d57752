//! Gateway access token entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::repository::RepositoryEntity;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "access_tokens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Account or client the token was issued for
    pub subject: String,
    #[sea_orm(column_type = "Text")]
    pub access_token: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
    /// Soft delete timestamp (NULL = active, set = revoked)
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

impl Model {
    /// Whether the token is still usable at `now`
    pub fn is_valid_at(&self, now: DateTimeUtc) -> bool {
        self.deleted_at.is_none() && self.expires_at > now
    }
}
