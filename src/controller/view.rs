use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use super::{ListController, Transition};
use crate::api::{ApiError, CategoryFilter, ListQuery, Page};
use crate::query::QueryResult;

/// Where a list view reads its pages from (normally the query cache)
#[async_trait]
pub trait ListSource<C: CategoryFilter>: Send + Sync {
    type Item: Send + Sync + 'static;
    type Counts: Send + Sync + 'static;

    async fn load(&self, query: &ListQuery<C>) -> QueryResult<Page<Self::Item, Self::Counts>>;
}

/// A list view: controller state plus the last page shown.
///
/// A failed load keeps the previous page visible next to the error, even
/// when the failed load was for a different page or filter set.
pub struct ListView<C: CategoryFilter, S: ListSource<C>> {
    controller: ListController<C>,
    source: S,
    page: Option<Arc<Page<S::Item, S::Counts>>>,
    error: Option<ApiError>,
}

impl<C: CategoryFilter, S: ListSource<C>> ListView<C, S> {
    pub fn new(source: S, controller: ListController<C>) -> Self {
        Self {
            controller,
            source,
            page: None,
            error: None,
        }
    }

    pub fn controller(&self) -> &ListController<C> {
        &self.controller
    }

    /// Mutate the controller; follow with [`ListView::apply`]
    pub fn controller_mut(&mut self) -> &mut ListController<C> {
        &mut self.controller
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Load the page for the controller's current query
    pub async fn refresh(&mut self) {
        let query = self.controller.query();
        let result = self.source.load(&query).await;

        if let Some(page) = result.data {
            self.controller.apply_pagination(&page.pagination);
            self.page = Some(page);
        }
        if let Some(error) = &result.error {
            warn!(page = query.page, error = %error, "List load failed");
        }
        self.error = result.error;
    }

    /// Refetch when the transition changed the query; returns whether it did
    pub async fn apply(&mut self, transition: Transition) -> bool {
        if transition.needs_refetch() {
            self.refresh().await;
            true
        } else {
            false
        }
    }

    /// Retry after an error
    pub async fn retry(&mut self) {
        self.refresh().await;
    }

    pub fn page(&self) -> Option<&Page<S::Item, S::Counts>> {
        self.page.as_deref()
    }

    pub fn items(&self) -> &[S::Item] {
        self.page.as_deref().map(|page| page.items.as_slice()).unwrap_or(&[])
    }

    pub fn counts(&self) -> Option<&S::Counts> {
        self.page.as_deref().map(|page| &page.counts)
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.page.is_some()
    }
}
