//! Page requests built on top of the raw parameter set

use super::filter::UserFilter;
use super::params::ListParams;
use super::sort::SortDirection;
use crate::domain::DomainError;

pub const PARAM_SEARCH: &str = "search";
pub const PARAM_STATUS: &str = "status";
pub const PARAM_SORT: &str = "sort";
pub const PARAM_PAGE: &str = "page";
pub const PARAM_PAGE_SIZE: &str = "page_size";

/// A list request
///
/// The raw [`ListParams`] are the source of truth: they decide the cache key,
/// and the recognized parameters are read from them on demand. Malformed
/// recognized values read as absent so the defaults apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    params: ListParams,
}

impl PageRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_params(params: ListParams) -> Self {
        Self { params }
    }

    /// Builds a request from a raw query string such as `search=al&page=2`
    pub fn from_query(query: &str) -> Result<Self, DomainError> {
        ListParams::parse(query).map(Self::from_params)
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.params.set(PARAM_SEARCH, search);
        self
    }

    pub fn with_status(mut self, status: bool) -> Self {
        self.params.set(PARAM_STATUS, status.to_string());
        self
    }

    pub fn with_sort(mut self, sort: SortDirection) -> Self {
        self.params.set(PARAM_SORT, sort.as_str());
        self
    }

    pub fn with_page(mut self, page: u64) -> Self {
        self.params.set(PARAM_PAGE, page.to_string());
        self
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.params.set(PARAM_PAGE_SIZE, page_size.to_string());
        self
    }

    /// Adds an arbitrary parameter; unrecognized ones only affect the cache key
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.append(key, value);
        self
    }

    pub fn params(&self) -> &ListParams {
        &self.params
    }

    /// Search term exactly as given, or `None` when absent or empty
    pub fn search(&self) -> Option<&str> {
        self.params
            .first(PARAM_SEARCH)
            .filter(|term| !term.is_empty())
    }

    /// Status filter, or `None` when absent or not a boolean
    pub fn status(&self) -> Option<bool> {
        self.params.first(PARAM_STATUS).and_then(parse_bool)
    }

    /// Sort direction, defaulting to descending when absent or unknown
    pub fn sort(&self) -> SortDirection {
        self.params
            .first(PARAM_SORT)
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }

    /// Requested page number, or `None` when absent or non-numeric
    pub fn page(&self) -> Option<i64> {
        self.params.first(PARAM_PAGE).and_then(parse_int)
    }

    /// Requested page size, or `None` when absent or non-numeric
    pub fn page_size(&self) -> Option<i64> {
        self.params.first(PARAM_PAGE_SIZE).and_then(parse_int)
    }

    /// The filter predicate for this request
    pub fn filter(&self) -> UserFilter {
        UserFilter {
            search: self.search().map(str::to_string),
            status: self.status(),
        }
    }
}

/// Accepts the boolean spellings PostgreSQL accepts for `boolean` input
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" | "on" => Some(true),
        "false" | "f" | "0" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn parse_int(value: &str) -> Option<i64> {
    value.trim().parse().ok()
}
