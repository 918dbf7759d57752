//! Capabilities an entity opts into to be served by [`Repository`](super::Repository).

use sea_orm::EntityTrait;

/// Marker for entities that can be managed through a repository.
///
/// Entities with a soft delete column are hidden from every repository read
/// once the column is set, except `get_entity_ignore_filter`, and `delete`
/// sets the column instead of removing the row. The column must be an
/// `Option<DateTimeUtc>`.
pub trait RepositoryEntity: EntityTrait {
    /// Column holding the soft delete timestamp, if the entity has one
    fn soft_delete_column() -> Option<Self::Column> {
        None
    }
}
