//! Page bound resolution and paginated fetching

use futures::future::try_join;

use super::page::{Page, PageBounds, PaginationMeta};
use crate::domain::query::{PageRequest, SortDirection, UserFilter};
use crate::domain::user::{User, UserStore};
use crate::domain::DomainError;

/// Page size limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    /// Size used when the request carries none
    pub default_page_size: u64,
    /// Upper clamp for requested sizes
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

impl PaginationConfig {
    pub fn with_default_page_size(mut self, size: u64) -> Self {
        self.default_page_size = size;
        self
    }

    pub fn with_max_page_size(mut self, size: u64) -> Self {
        self.max_page_size = size;
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.max_page_size == 0 {
            return Err(DomainError::configuration("max_page_size must be at least 1"));
        }

        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(DomainError::configuration(format!(
                "default_page_size must be between 1 and {}",
                self.max_page_size
            )));
        }

        Ok(())
    }
}

/// Pagination engine
#[derive(Debug, Clone, Copy, Default)]
pub struct Paginator {
    config: PaginationConfig,
}

impl Paginator {
    pub fn new(config: PaginationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PaginationConfig {
        &self.config
    }

    /// Resolves bounds from raw page number and size
    ///
    /// Absent values take the defaults; the size is clamped to
    /// `[1, max_page_size]` and the page number to at least 1.
    pub fn bounds(&self, page: Option<i64>, page_size: Option<i64>) -> PageBounds {
        let max = self.config.max_page_size.max(1);
        let default = self.config.default_page_size.clamp(1, max);

        let limit = match page_size {
            Some(size) if size < 1 => 1,
            Some(size) => (size as u64).min(max),
            None => default,
        };

        let page = match page {
            Some(page) if page >= 1 => page as u64,
            _ => 1,
        };

        PageBounds {
            page,
            limit,
            offset: (page - 1).saturating_mul(limit),
        }
    }

    pub fn bounds_for(&self, request: &PageRequest) -> PageBounds {
        self.bounds(request.page(), request.page_size())
    }

    /// Counts and fetches against the same filter
    ///
    /// A page past the end yields no rows but still reports the real totals.
    pub async fn paginate<S>(
        &self,
        store: &S,
        filter: &UserFilter,
        sort: SortDirection,
        bounds: PageBounds,
    ) -> Result<Page<User>, DomainError>
    where
        S: UserStore + ?Sized,
    {
        let (total_items, rows) =
            try_join(store.count(filter), store.fetch(filter, sort, bounds)).await?;

        Ok(Page::new(rows, PaginationMeta::new(bounds, total_items)))
    }
}
