//! Repository layer - generic data access over sea-orm entities.
//!
//! Repositories are handed out by a [`UnitOfWork`](crate::unit_of_work::UnitOfWork)
//! and share its persistence context: reads go straight to the store,
//! mutations are staged until the unit of work saves its changes.

mod base;
mod entity;

pub use base::Repository;
pub use entity::RepositoryEntity;
