//! Shared types.

mod pagination;

pub use pagination::{paginate, OrderBy, PageRequest, PagedResult, SortDirection, MAX_ROW_LIMIT};
