//! Search filters and page shapes.
//!
//! The same filter set drives the search index, the primary-store fallback,
//! and cache key derivation, so it lives here rather than in any one crate.

use serde::{Deserialize, Serialize};

use crate::event::Timestamp;

/// Default page size when the caller does not specify one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Inclusive time window filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl DateRange {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    /// Whether a timestamp falls inside the window (inclusive on both ends).
    pub fn contains(&self, ts: Timestamp) -> bool {
        ts >= self.start && ts <= self.end
    }
}

/// Sortable event fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Timestamp,
    CreatedAt,
    SubjectId,
    Category,
}

impl SortField {
    /// Canonical field name, used in cache keys and query payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Timestamp => "timestamp",
            SortField::CreatedAt => "created_at",
            SortField::SubjectId => "subject_id",
            SortField::Category => "category",
        }
    }
}

/// Sort direction; recency-descending is the default everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Filter set accepted by search and stats operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Time window on the event timestamp.
    pub date_range: Option<DateRange>,
    /// Exact subject match.
    pub subject_id: Option<String>,
    /// Exact category match.
    pub category: Option<String>,
    /// Case-insensitive substring match on the source URL.
    pub url_substring: Option<String>,
    /// Free-text query over message/trace/subject/category/url.
    pub free_text: Option<String>,
    pub page: u32,
    pub page_size: u32,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            date_range: None,
            subject_id: None,
            category: None,
            url_substring: None,
            free_text: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort_field: SortField::default(),
            sort_direction: SortDirection::default(),
        }
    }
}

impl SearchFilters {
    /// Clamp degenerate paging values (page 0, empty page size).
    pub fn normalized(mut self) -> Self {
        if self.page == 0 {
            self.page = 1;
        }
        if self.page_size == 0 {
            self.page_size = DEFAULT_PAGE_SIZE;
        }
        self
    }

    /// Offset of the first item on the requested page.
    pub fn offset(&self) -> usize {
        ((self.page.max(1) - 1) as usize) * (self.page_size as usize)
    }

    /// True when no filter clause at all is present (paging aside).
    pub fn is_unfiltered(&self) -> bool {
        self.date_range.is_none()
            && self.subject_id.is_none()
            && self.category.is_none()
            && self.url_substring.is_none()
            && self.free_text.is_none()
    }
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T> PageResult<T> {
    /// Build a page, deriving `total_pages` from the total count.
    pub fn new(items: Vec<T>, total: u64, page: u32, page_size: u32) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            total.div_ceil(page_size as u64) as u32
        };
        Self {
            items,
            total,
            page,
            page_size,
            total_pages,
        }
    }

    /// An empty page for the given paging parameters.
    pub fn empty(page: u32, page_size: u32) -> Self {
        Self::new(Vec::new(), 0, page, page_size)
    }
}
