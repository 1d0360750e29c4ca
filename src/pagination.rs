use serde::Deserialize;

use crate::config::BlogConfig;
use crate::validation::ValidationErrors;

/// A validated zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Builds a request from raw client values. `limit` is clamped to the configured maximum.
    pub fn new(page: i64, limit: i64, config: &BlogConfig) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if page < 0 {
            errors.add("page", "page must be 0 or greater");
        }
        if limit < 1 {
            errors.add("limit", "limit must be at least 1");
        }
        errors.into_result()?;

        Ok(Self {
            page: u32::try_from(page).unwrap_or(u32::MAX),
            limit: limit.min(i64::from(config.max_page_size)) as u32,
        })
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.limit)
    }
}

/// Query string shape used by the HTML pages (`?page=&search=`).
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub search: Option<String>,
}

impl PageQuery {
    pub fn request(&self, config: &BlogConfig) -> PageRequest {
        PageRequest {
            page: self.page.unwrap_or(0),
            limit: config.page_size.min(config.max_page_size).max(1),
        }
    }

    pub fn search_term(&self) -> &str {
        self.search.as_deref().map(str::trim).unwrap_or("")
    }
}

pub fn pages_count(total: i64, limit: u32) -> u32 {
    if total <= 0 || limit == 0 {
        return 0;
    }
    let limit = i64::from(limit);
    ((total + limit - 1) / limit) as u32
}

/// Previous/next navigation for a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager {
    pub page: u32,
    pub pages_count: u32,
}

impl Pager {
    pub fn new(page: u32, total: i64, limit: u32) -> Self {
        Self {
            page,
            pages_count: pages_count(total, limit),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pages_count == 0
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        self.page.saturating_add(1) < self.pages_count
    }

    pub fn previous(&self) -> u32 {
        self.page.saturating_sub(1)
    }

    pub fn next(&self) -> u32 {
        if self.has_next() {
            self.page + 1
        } else {
            self.page
        }
    }

    /// One-based "current / total" label.
    pub fn label(&self) -> String {
        format!("{} / {}", u64::from(self.page) + 1, self.pages_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BlogConfig {
        BlogConfig {
            page_size: 10,
            max_page_size: 50,
        }
    }

    #[test]
    fn offset_is_page_times_limit() {
        let req = PageRequest::new(3, 10, &config()).unwrap();
        assert_eq!(req.offset(), 30);
        assert_eq!(PageRequest::new(0, 10, &config()).unwrap().offset(), 0);
    }

    #[test]
    fn limit_is_clamped() {
        let req = PageRequest::new(0, 1000, &config()).unwrap();
        assert_eq!(req.limit, 50);
    }

    #[test]
    fn negative_page_and_zero_limit_are_rejected() {
        let errors = PageRequest::new(-1, 0, &config()).unwrap_err();
        assert!(errors.field("page").is_some());
        assert!(errors.field("limit").is_some());
    }

    #[test]
    fn pages_count_rounds_up() {
        assert_eq!(pages_count(0, 10), 0);
        assert_eq!(pages_count(10, 10), 1);
        assert_eq!(pages_count(11, 10), 2);
    }

    #[test]
    fn pager_saturates_at_edges() {
        let first = Pager::new(0, 25, 10);
        assert!(!first.has_previous());
        assert_eq!(first.previous(), 0);
        assert_eq!(first.next(), 1);
        assert_eq!(first.label(), "1 / 3");

        let last = Pager::new(2, 25, 10);
        assert!(!last.has_next());
        assert_eq!(last.next(), 2);
        assert_eq!(last.previous(), 1);
    }

    #[test]
    fn last_representable_page_does_not_overflow() {
        let pager = Pager::new(u32::MAX, 5, 10);
        assert!(!pager.has_next());
        assert_eq!(pager.next(), u32::MAX);
        assert_eq!(pager.label(), "4294967296 / 1");
    }

    #[test]
    fn page_query_uses_configured_size() {
        let query = PageQuery {
            page: Some(2),
            search: Some("  rust ".into()),
        };
        let req = query.request(&config());
        assert_eq!(req, PageRequest { page: 2, limit: 10 });
        assert_eq!(query.search_term(), "rust");
    }
}
