//! Pagination - page bounds, metadata and the paginated fetch

mod engine;
mod page;

pub use engine::{PaginationConfig, Paginator};
pub use page::{Page, PageBounds, PaginationMeta};
