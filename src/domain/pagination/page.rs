use serde::{Deserialize, Serialize};

/// Limit and offset for one page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageBounds {
    /// 1-based page number
    pub page: u64,
    /// Rows per page; never zero
    pub limit: u64,
    pub offset: u64,
}

impl PageBounds {
    /// Offset as a SQL bind value
    pub fn offset_i64(&self) -> i64 {
        i64::try_from(self.offset).unwrap_or(i64::MAX)
    }

    /// Limit as a SQL bind value
    pub fn limit_i64(&self) -> i64 {
        i64::try_from(self.limit).unwrap_or(i64::MAX)
    }
}

/// Pagination metadata reported with every page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub current_page: u64,
    pub page_size: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl PaginationMeta {
    pub fn new(bounds: PageBounds, total_items: u64) -> Self {
        Self {
            current_page: bounds.page,
            page_size: bounds.limit,
            total_items,
            total_pages: total_items.div_ceil(bounds.limit.max(1)),
        }
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, pagination: PaginationMeta) -> Self {
        Self { data, pagination }
    }

    /// Projects every row, keeping the metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(page: u64, limit: u64) -> PageBounds {
        PageBounds {
            page,
            limit,
            offset: (page - 1) * limit,
        }
    }

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(PaginationMeta::new(bounds(1, 10), 25).total_pages, 3);
        assert_eq!(PaginationMeta::new(bounds(1, 10), 30).total_pages, 3);
        assert_eq!(PaginationMeta::new(bounds(1, 10), 31).total_pages, 4);
        assert_eq!(PaginationMeta::new(bounds(1, 10), 0).total_pages, 0);
    }

    #[test]
    fn test_has_next() {
        assert!(PaginationMeta::new(bounds(2, 10), 25).has_next());
        assert!(!PaginationMeta::new(bounds(3, 10), 25).has_next());
    }

    #[test]
    fn test_map_keeps_metadata() {
        let page = Page::new(vec![1, 2, 3], PaginationMeta::new(bounds(1, 3), 7));
        let mapped = page.map(|n| n * 10);

        assert_eq!(mapped.data, vec![10, 20, 30]);
        assert_eq!(mapped.pagination.total_pages, 3);
    }

    #[test]
    fn test_serialized_metadata_field_names() {
        let json = serde_json::to_value(PaginationMeta::new(bounds(2, 5), 12)).unwrap();

        assert_eq!(json["current_page"], 2);
        assert_eq!(json["page_size"], 5);
        assert_eq!(json["total_items"], 12);
        assert_eq!(json["total_pages"], 3);
    }

    #[test]
    fn test_huge_offset_saturates_bind_value() {
        let bounds = PageBounds {
            page: u64::MAX,
            limit: 10,
            offset: u64::MAX,
        };
        assert_eq!(bounds.offset_i64(), i64::MAX);
    }
}
