//! Page windows over filtered, optionally ordered entity queries.

use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, Order, PaginatorTrait, QueryOrder, QuerySelect,
    Select,
};
use serde::{Deserialize, Serialize};

use common::{AppResult, DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE};

/// Largest row count a `LIMIT` can carry; SQL binds limits as signed 64-bit
pub const MAX_ROW_LIMIT: u64 = i64::MAX as u64;

/// Requested page (1-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct PageRequest {
    #[serde(default = "default_page")]
    pub page_number: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

fn default_page() -> u64 {
    DEFAULT_PAGE_NUMBER
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl PageRequest {
    pub fn new(page_number: u64, page_size: u64) -> Self {
        Self {
            page_number,
            page_size,
        }
    }

    /// Resolve the page actually served for `total_count` matching rows.
    ///
    /// A zero page size becomes [`DEFAULT_PAGE_SIZE`] and sizes above
    /// [`MAX_ROW_LIMIT`] are capped. Page 0, or any page starting at or past
    /// `total_count`, becomes page 1.
    pub fn normalize(&self, total_count: u64) -> Self {
        let page_size = match self.page_size {
            0 => DEFAULT_PAGE_SIZE,
            size => size.min(MAX_ROW_LIMIT),
        };

        let skip = self.page_number.saturating_sub(1).saturating_mul(page_size);
        let page_number = if self.page_number < 1 || skip >= total_count {
            DEFAULT_PAGE_NUMBER
        } else {
            self.page_number
        };

        Self {
            page_number,
            page_size,
        }
    }

    /// Rows skipped before this page
    pub fn offset(&self) -> u64 {
        self.page_number.saturating_sub(1).saturating_mul(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_number: DEFAULT_PAGE_NUMBER,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Sort direction; descending unless asked otherwise
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl From<SortDirection> for Order {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Ascending => Order::Asc,
            SortDirection::Descending => Order::Desc,
        }
    }
}

/// Order key for a page: one column and a direction
#[derive(Debug, Clone, Copy)]
pub struct OrderBy<C> {
    pub column: C,
    pub direction: SortDirection,
}

impl<C: ColumnTrait> OrderBy<C> {
    /// Order by `column` with the default (descending) direction
    pub fn new(column: C) -> Self {
        Self {
            column,
            direction: SortDirection::default(),
        }
    }

    pub fn ascending(column: C) -> Self {
        Self {
            column,
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(column: C) -> Self {
        Self {
            column,
            direction: SortDirection::Descending,
        }
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub page_number: u64,
    pub page_size: u64,
    pub total_count: u64,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, page_number: u64, page_size: u64, total_count: u64) -> Self {
        Self {
            items,
            page_number,
            page_size,
            total_count,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.page_size > 0 {
            self.total_count.div_ceil(self.page_size)
        } else {
            0
        }
    }

    pub fn has_next_page(&self) -> bool {
        self.page_number < self.total_pages()
    }

    /// Convert the items, keeping the page metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            total_count: self.total_count,
        }
    }
}

/// Count `select`, then fetch the requested window of it.
pub async fn paginate<E, C>(
    select: Select<E>,
    db: &C,
    request: &PageRequest,
    order: Option<OrderBy<E::Column>>,
) -> AppResult<PagedResult<E::Model>>
where
    E: EntityTrait,
    E::Model: Sync + 'static,
    C: ConnectionTrait,
{
    let total_count = select.clone().count(db).await?;
    let page = request.normalize(total_count);

    let select = match order {
        Some(order) => select.order_by(order.column, order.direction.into()),
        None => select,
    };

    let items = select
        .offset(page.offset())
        .limit(page.page_size)
        .all(db)
        .await?;

    Ok(PagedResult::new(
        items,
        page.page_number,
        page.page_size,
        total_count,
    ))
}
