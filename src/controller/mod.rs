//! List View State
//!
//! One [`ListController`] per list view owns the filters, the page, and the
//! row selection, and derives the [`ListQuery`] the view fetches. Every
//! transition reports whether the query changed so callers know when to
//! refetch.
//!
//! Rules:
//! - any filter or page-size change resets to page 1
//! - a page change leaves filters untouched
//! - the selection is cleared whenever the page changes or filters are cleared

mod view;

pub use view::{ListSource, ListView};

use std::collections::BTreeSet;

use crate::api::models::{Log, LogType, Rating, Review, Task, TaskStatus};
use crate::api::{CategoryFilter, DateRange, ListQuery, Pagination, DEFAULT_PAGE_SIZE};

/// Filter criteria of one list view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilters<C> {
    pub search: String,
    pub category: Option<C>,
    pub app_id: Option<String>,
    pub date_range: DateRange,
}

impl<C> Default for ListFilters<C> {
    fn default() -> Self {
        Self {
            search: String::new(),
            category: None,
            app_id: None,
            date_range: DateRange::default(),
        }
    }
}

impl<C> ListFilters<C> {
    pub fn for_app(app_id: impl Into<String>) -> Self {
        Self {
            app_id: Some(app_id.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty()
            && self.category.is_none()
            && self.app_id.is_none()
            && self.date_range.is_empty()
    }
}

/// Effect of a controller transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changed
    Unchanged,
    /// Only the page moved
    PageChanged,
    /// Filters (or page size) changed and the page was reset to 1
    FiltersChanged,
}

impl Transition {
    pub fn needs_refetch(&self) -> bool {
        !matches!(self, Transition::Unchanged)
    }
}

/// Totals reported by the backend for the last fetched page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub total: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl From<&Pagination> for PageInfo {
    fn from(pagination: &Pagination) -> Self {
        Self {
            total: pagination.total,
            total_pages: pagination.total_pages,
            has_next: pagination.has_next(),
            has_prev: pagination.has_prev(),
        }
    }
}

/// Filter, pagination, and selection state for one list view
#[derive(Debug, Clone)]
pub struct ListController<C> {
    initial: ListFilters<C>,
    filters: ListFilters<C>,
    page: u32,
    page_size: u32,
    page_info: Option<PageInfo>,
    selection: BTreeSet<String>,
}

impl<C: CategoryFilter> Default for ListController<C> {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl<C: CategoryFilter> ListController<C> {
    pub fn new(page_size: u32) -> Self {
        Self::with_filters(ListFilters::default(), page_size)
    }

    /// Start from (and clear back to) a preset filter set, e.g. one app
    pub fn with_filters(initial: ListFilters<C>, page_size: u32) -> Self {
        Self {
            filters: initial.clone(),
            initial,
            page: 1,
            page_size: page_size.max(1),
            page_info: None,
            selection: BTreeSet::new(),
        }
    }

    pub fn filters(&self) -> &ListFilters<C> {
        &self.filters
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn page_info(&self) -> Option<PageInfo> {
        self.page_info
    }

    fn change_filters(&mut self, change: impl FnOnce(&mut ListFilters<C>)) -> Transition {
        let mut next = self.filters.clone();
        change(&mut next);
        if next == self.filters {
            return Transition::Unchanged;
        }
        self.filters = next;
        self.go_to(1);
        Transition::FiltersChanged
    }

    fn go_to(&mut self, page: u32) {
        if page != self.page {
            self.page = page;
            self.selection.clear();
        }
    }

    /// Whitespace-only edits keep the text without moving page or refetching
    pub fn set_search(&mut self, text: impl Into<String>) -> Transition {
        let text = text.into();
        if text.trim() == self.filters.search.trim() {
            self.filters.search = text;
            return Transition::Unchanged;
        }
        self.change_filters(|filters| filters.search = text)
    }

    pub fn set_category(&mut self, category: Option<C>) -> Transition {
        self.change_filters(|filters| filters.category = category)
    }

    /// Select a quick filter, or turn it off if it is already active
    pub fn toggle_quick_filter(&mut self, category: C) -> Transition {
        self.change_filters(|filters| {
            filters.category = if filters.category == Some(category) {
                None
            } else {
                Some(category)
            };
        })
    }

    pub fn set_application(&mut self, app_id: Option<String>) -> Transition {
        let app_id = app_id.filter(|id| !id.is_empty());
        self.change_filters(|filters| filters.app_id = app_id)
    }

    pub fn set_date_range(&mut self, range: DateRange) -> Transition {
        self.change_filters(|filters| filters.date_range = range)
    }

    pub fn set_page_size(&mut self, page_size: u32) -> Transition {
        let page_size = page_size.max(1);
        if page_size == self.page_size {
            return Transition::Unchanged;
        }
        self.page_size = page_size;
        self.go_to(1);
        Transition::FiltersChanged
    }

    /// Move to `page` (at least 1). Not clamped to the last known page count.
    pub fn set_page(&mut self, page: u32) -> Transition {
        let page = page.max(1);
        if page == self.page {
            return Transition::Unchanged;
        }
        self.go_to(page);
        Transition::PageChanged
    }

    pub fn next_page(&mut self) -> Transition {
        match self.page_info {
            Some(info) if !info.has_next => Transition::Unchanged,
            _ => self.set_page(self.page.saturating_add(1)),
        }
    }

    pub fn prev_page(&mut self) -> Transition {
        self.set_page(self.page.saturating_sub(1))
    }

    /// Back to the initial filters and page 1, with no selection
    pub fn clear_filters(&mut self) -> Transition {
        self.selection.clear();
        if self.filters == self.initial && self.page == 1 {
            return Transition::Unchanged;
        }
        self.filters = self.initial.clone();
        self.page = 1;
        Transition::FiltersChanged
    }

    /// The parameter set for the current state
    pub fn query(&self) -> ListQuery<C> {
        let mut query = ListQuery::new(self.page, self.page_size)
            .search(self.filters.search.clone())
            .dates(self.filters.date_range.clone());
        if let Some(category) = self.filters.category {
            query = query.category(category);
        }
        if let Some(app_id) = &self.filters.app_id {
            query = query.app(app_id.clone());
        }
        query
    }

    /// Record the totals the backend reported for the current page
    pub fn apply_pagination(&mut self, pagination: &Pagination) {
        self.page_info = Some(PageInfo::from(pagination));
    }

    // ============ Selection ============

    pub fn select(&mut self, id: impl Into<String>, selected: bool) {
        let id = id.into();
        if selected {
            self.selection.insert(id);
        } else {
            self.selection.remove(&id);
        }
    }

    /// Select every id on the current page, or none
    pub fn select_all<I, S>(&mut self, ids: I, selected: bool)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if selected {
            self.selection = ids.into_iter().map(Into::into).collect();
        } else {
            self.selection.clear();
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.contains(id)
    }

    pub fn selected(&self) -> Vec<String> {
        self.selection.iter().cloned().collect()
    }

    pub fn selection_len(&self) -> usize {
        self.selection.len()
    }

    /// Client-side filtering of an already fetched page
    pub fn filter_local<'a, T: ListItem<C>>(&self, items: &'a [T]) -> Vec<&'a T> {
        let needle = self.filters.search.trim().to_lowercase();
        items
            .iter()
            .filter(|item| needle.is_empty() || item.matches_search(&needle))
            .filter(|item| match self.filters.category {
                Some(category) => item.category() == category,
                None => true,
            })
            .collect()
    }
}

/// A row that can be filtered locally by a [`ListController`]
pub trait ListItem<C> {
    fn id(&self) -> &str;

    fn category(&self) -> C;

    /// `needle` is already lower-cased and non-empty
    fn matches_search(&self, needle: &str) -> bool;
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

impl ListItem<LogType> for Log {
    fn id(&self) -> &str {
        &self.id
    }

    fn category(&self) -> LogType {
        self.log_type
    }

    fn matches_search(&self, needle: &str) -> bool {
        contains(&self.message, needle)
            || contains(&self.app_name, needle)
            || self.endpoint.as_deref().is_some_and(|e| contains(e, needle))
    }
}

impl ListItem<TaskStatus> for Task {
    fn id(&self) -> &str {
        &self.id
    }

    fn category(&self) -> TaskStatus {
        self.status
    }

    fn matches_search(&self, needle: &str) -> bool {
        contains(&self.description, needle)
    }
}

impl ListItem<Rating> for Review {
    fn id(&self) -> &str {
        &self.id
    }

    fn category(&self) -> Rating {
        self.rating
    }

    fn matches_search(&self, needle: &str) -> bool {
        contains(&self.comment, needle)
            || contains(&self.reviewer, needle)
            || contains(&self.app_name, needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn pagination(page: u32, total: u64, total_pages: u32) -> Pagination {
        Pagination {
            page,
            limit: 50,
            total,
            total_pages,
        }
    }

    fn task(id: &str, description: &str, status: TaskStatus) -> Task {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "appId": "a",
            "description": description,
            "status": status,
        }))
        .unwrap()
    }

    #[test]
    fn test_filter_change_resets_page() {
        let mut controller = ListController::<LogType>::default();
        controller.set_page(4);

        assert_eq!(controller.set_search("timeout"), Transition::FiltersChanged);
        assert_eq!(controller.page(), 1);
        assert_eq!(controller.query().search.as_deref(), Some("timeout"));

        controller.set_page(3);
        controller.set_date_range(DateRange::new(NaiveDate::from_ymd_opt(2024, 1, 1), None));
        assert_eq!(controller.page(), 1);

        controller.set_page(2);
        controller.set_application(Some("app-1".to_string()));
        assert_eq!(controller.page(), 1);

        controller.set_page(2);
        controller.set_page_size(20);
        assert_eq!(controller.page(), 1);
        assert_eq!(controller.query().page_size, 20);
    }

    #[test]
    fn test_page_change_keeps_filters() {
        let mut controller = ListController::<LogType>::default();
        controller.set_category(Some(LogType::Warning));
        controller.set_search("db");
        let before = controller.filters().clone();

        assert_eq!(controller.set_page(3), Transition::PageChanged);
        assert_eq!(controller.filters(), &before);
        assert_eq!(controller.query().page, 3);
    }

    #[test]
    fn test_same_value_is_unchanged() {
        let mut controller = ListController::<TaskStatus>::default();
        controller.set_search("x");
        assert_eq!(controller.set_search("x"), Transition::Unchanged);
        assert_eq!(controller.set_page(1), Transition::Unchanged);
        assert!(!Transition::Unchanged.needs_refetch());
    }

    #[test]
    fn test_trailing_space_keeps_page() {
        let mut controller = ListController::<LogType>::default();
        controller.set_search("timeout");
        controller.set_page(4);

        assert_eq!(controller.set_search("timeout "), Transition::Unchanged);
        assert_eq!(controller.page(), 4);
        assert_eq!(controller.filters().search, "timeout ");
        assert_eq!(controller.query().search.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_quick_filter_toggles_off() {
        let mut controller = ListController::<LogType>::default();

        controller.toggle_quick_filter(LogType::Error);
        assert_eq!(controller.filters().category, Some(LogType::Error));

        controller.toggle_quick_filter(LogType::Warning);
        assert_eq!(controller.filters().category, Some(LogType::Warning));

        controller.toggle_quick_filter(LogType::Warning);
        assert_eq!(controller.filters().category, None);
        assert!(controller.filters().is_empty());
    }

    #[test]
    fn test_clear_filters_restores_initial_state() {
        let mut controller =
            ListController::<LogType>::with_filters(ListFilters::for_app("app-9"), 50);
        controller.set_search("slow");
        controller.toggle_quick_filter(LogType::Info);
        controller.set_page(2);
        controller.select("l1", true);

        assert_eq!(controller.clear_filters(), Transition::FiltersChanged);
        assert_eq!(controller.page(), 1);
        assert_eq!(controller.filters().app_id.as_deref(), Some("app-9"));
        assert!(controller.filters().search.is_empty());
        assert_eq!(controller.selection_len(), 0);
    }

    #[test]
    fn test_selection_cleared_on_page_change() {
        let mut controller = ListController::<LogType>::default();
        controller.select_all(["1", "2", "3"], true);
        controller.select("2", false);
        assert_eq!(controller.selected(), vec!["1", "3"]);

        controller.set_page(2);
        assert_eq!(controller.selection_len(), 0);
    }

    #[test]
    fn test_pagination_is_recorded_not_clamped() {
        let mut controller = ListController::<LogType>::default();
        controller.set_page(5);
        controller.apply_pagination(&pagination(5, 30, 1));

        let info = controller.page_info().unwrap();
        assert_eq!(controller.page(), 5);
        assert_eq!(info.total, 30);
        assert!(!info.has_next);
        assert!(info.has_prev);

        assert_eq!(controller.next_page(), Transition::Unchanged);
        assert_eq!(controller.prev_page(), Transition::PageChanged);
        assert_eq!(controller.page(), 4);
    }

    #[test]
    fn test_local_filtering() {
        let tasks = vec![
            task("1", "Fix login bug", TaskStatus::Pending),
            task("2", "Write docs", TaskStatus::Done),
            task("3", "Fix deploy", TaskStatus::Done),
        ];

        let mut controller = ListController::<TaskStatus>::default();
        controller.set_search("FIX");
        let ids: Vec<&str> = controller
            .filter_local(&tasks)
            .into_iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["1", "3"]);

        controller.set_category(Some(TaskStatus::Done));
        let ids: Vec<&str> = controller
            .filter_local(&tasks)
            .into_iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["3"]);
    }
}
