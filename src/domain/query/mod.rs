//! Query building - list parameters, filter predicates and sort order

mod filter;
mod params;
mod request;
mod sort;

pub use filter::{BindValue, SqlFragment, UserFilter};
pub use params::ListParams;
pub use request::{
    PageRequest, PARAM_PAGE, PARAM_PAGE_SIZE, PARAM_SEARCH, PARAM_SORT, PARAM_STATUS,
};
pub use sort::SortDirection;
