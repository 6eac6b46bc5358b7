//! Query Parameter Sets
//!
//! A `ListQuery` is the immutable description of what a list view wants to
//! see. It is both the HTTP query string sent to the backend and (serialized)
//! the cache key under which the response is stored.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::Debug;
use std::hash::Hash;

use super::models::{LogType, Rating, TaskStatus};

/// Default page size for list views
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// A categorical filter a list endpoint understands
pub trait CategoryFilter:
    Copy + Eq + Hash + Debug + Serialize + Send + Sync + 'static
{
    /// Query-string parameter the backend filters on
    const PARAM: &'static str;

    /// Value sent for [`Self::PARAM`]
    fn param_value(&self) -> String;
}

impl CategoryFilter for LogType {
    const PARAM: &'static str = "logType";

    fn param_value(&self) -> String {
        self.as_str().to_string()
    }
}

impl CategoryFilter for TaskStatus {
    const PARAM: &'static str = "status";

    fn param_value(&self) -> String {
        self.as_str().to_string()
    }
}

impl CategoryFilter for Rating {
    const PARAM: &'static str = "rating";

    fn param_value(&self) -> String {
        self.value().to_string()
    }
}

/// Inclusive creation-date window
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Filters plus pagination for one list request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery<C> {
    pub search: Option<String>,
    pub category: Option<C>,
    pub app_id: Option<String>,
    pub date_range: DateRange,
    pub page: u32,
    pub page_size: u32,
}

impl<C> Default for ListQuery<C> {
    fn default() -> Self {
        Self {
            search: None,
            category: None,
            app_id: None,
            date_range: DateRange::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl<C: CategoryFilter> ListQuery<C> {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
            ..Self::default()
        }
    }

    /// Surrounding whitespace is dropped, so it never splits a cache key
    pub fn search(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        let text = text.trim();
        self.search = (!text.is_empty()).then(|| text.to_string());
        self
    }

    pub fn category(mut self, category: C) -> Self {
        self.category = Some(category);
        self
    }

    pub fn app(mut self, app_id: impl Into<String>) -> Self {
        let app_id = app_id.into();
        self.app_id = (!app_id.is_empty()).then_some(app_id);
        self
    }

    pub fn dates(mut self, range: DateRange) -> Self {
        self.date_range = range;
        self
    }

    /// Query-string pairs, omitting every empty filter
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();

        if let Some(app_id) = self.app_id.as_deref().filter(|a| !a.is_empty()) {
            pairs.push(("appId".to_string(), app_id.to_string()));
        }
        if let Some(category) = &self.category {
            pairs.push((C::PARAM.to_string(), category.param_value()));
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            pairs.push(("search".to_string(), search.to_string()));
        }
        if let Some(start) = self.date_range.start {
            pairs.push(("startDate".to_string(), start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = self.date_range.end {
            pairs.push(("endDate".to_string(), end.format("%Y-%m-%d").to_string()));
        }
        pairs.push(("limit".to_string(), self.page_size.to_string()));
        pairs.push(("page".to_string(), self.page.to_string()));

        pairs
    }
}
