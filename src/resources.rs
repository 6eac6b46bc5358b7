//! Resource Reads and Mutations
//!
//! The dashboard's read paths (cached, keyed by resource and parameters) and
//! its writes, each declaring which resource families it invalidates.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::api::models::{
    AppStatus, Application, HealthStatus, Log, LogAnalytics, LogCounts, LogTrends, LogType, Rating,
    Review, ReviewStats, SystemStats, Task, TaskCounts, TaskStatus,
};
use crate::api::{
    ApiError, ApiResult, ApplicationForm, ApplicationPatch, DashboardApi, ListQuery, LogPage,
    NewTask, ReviewPage, TaskPage, ValidationErrors,
};
use crate::controller::{ListController, ListSource};
use crate::query::{QueryCache, QueryKey, QueryOptions, QueryResult};

/// Cache key roots, one per resource family
pub mod keys {
    pub const APPLICATIONS: &str = "applications";
    pub const LOGS: &str = "logs";
    pub const LOG_ANALYTICS: &str = "log-analytics";
    pub const LOG_TRENDS: &str = "log-trends";
    pub const TASKS: &str = "tasks";
    pub const REVIEWS: &str = "reviews";
    pub const SYSTEM_STATS: &str = "system-stats";
    pub const HEALTH: &str = "health";
}

fn roots(names: &[&str]) -> Vec<QueryKey> {
    names.iter().map(|name| QueryKey::new(*name)).collect()
}

/// Everything a log deletion can change
fn log_family() -> Vec<QueryKey> {
    roots(&[
        keys::LOGS,
        keys::LOG_ANALYTICS,
        keys::LOG_TRENDS,
        keys::SYSTEM_STATS,
    ])
}

/// Cached access to the backend
#[derive(Clone)]
pub struct Resources {
    api: Arc<dyn DashboardApi>,
    cache: QueryCache,
}

impl Resources {
    pub fn new(api: Arc<dyn DashboardApi>, cache: QueryCache) -> Self {
        Self { api, cache }
    }

    pub fn api(&self) -> &Arc<dyn DashboardApi> {
        &self.api
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    fn options(&self) -> QueryOptions {
        self.cache.defaults()
    }

    /// List pages refetch on every read
    fn list_options(&self) -> QueryOptions {
        self.options().always_stale()
    }

    async fn read<T, F, Fut>(&self, key: QueryKey, options: QueryOptions, call: F) -> QueryResult<T>
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<dyn DashboardApi>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
    {
        let api = self.api.clone();
        self.cache.query(key, options, move || call(api.clone())).await
    }

    // ============ Reads ============

    pub async fn applications(&self) -> QueryResult<Vec<Application>> {
        self.read(QueryKey::new(keys::APPLICATIONS), self.options(), |api| async move {
            api.list_applications().await
        })
        .await
    }

    pub async fn application(&self, id: &str) -> QueryResult<Application> {
        let key = QueryKey::new(keys::APPLICATIONS).segment(id);
        let id = id.to_string();
        self.read(key, self.options(), move |api| {
            let id = id.clone();
            async move { api.get_application(&id).await }
        })
        .await
    }

    pub async fn logs(&self, query: &ListQuery<LogType>) -> QueryResult<LogPage> {
        let key = QueryKey::new(keys::LOGS).with_params(query);
        let query = query.clone();
        self.read(key, self.list_options(), move |api| {
            let query = query.clone();
            async move { api.list_logs(&query).await }
        })
        .await
    }

    pub async fn tasks(&self, query: &ListQuery<TaskStatus>) -> QueryResult<TaskPage> {
        let key = QueryKey::new(keys::TASKS).with_params(query);
        let query = query.clone();
        self.read(key, self.list_options(), move |api| {
            let query = query.clone();
            async move { api.list_tasks(&query).await }
        })
        .await
    }

    pub async fn reviews(&self, query: &ListQuery<Rating>) -> QueryResult<ReviewPage> {
        let key = QueryKey::new(keys::REVIEWS).with_params(query);
        let query = query.clone();
        self.read(key, self.list_options(), move |api| {
            let query = query.clone();
            async move { api.list_reviews(&query).await }
        })
        .await
    }

    /// Global counters. A failed refetch keeps the last counters next to
    /// the error.
    pub async fn system_stats(&self) -> QueryResult<SystemStats> {
        self.read(QueryKey::new(keys::SYSTEM_STATS), self.options(), |api| async move {
            api.get_system_stats().await
        })
        .await
    }

    /// Log analytics over the trailing `days`; feeds both the dashboard
    /// totals and its trend chart
    pub async fn log_analytics(&self, days: u32) -> QueryResult<LogAnalytics> {
        let key = QueryKey::new(keys::LOG_ANALYTICS).segment(days);
        self.read(key, self.options(), move |api| async move {
            api.get_log_analytics(days).await
        })
        .await
    }

    pub async fn log_trends(&self, days: u32) -> QueryResult<LogTrends> {
        let key = QueryKey::new(keys::LOG_TRENDS).segment(days);
        self.read(key, self.options(), move |api| async move {
            api.get_log_trends(days).await
        })
        .await
    }

    /// Backend health, retried harder and kept for 30 seconds
    pub async fn health(&self) -> QueryResult<HealthStatus> {
        let options = self
            .options()
            .with_retry(3)
            .with_stale_time(Duration::from_secs(30));
        self.read(QueryKey::new(keys::HEALTH), options, |api| async move {
            api.health_check().await
        })
        .await
    }

    // ============ Mutations ============

    pub async fn create_application(&self, form: &ApplicationForm) -> ApiResult<Application> {
        info!(name = %form.name, "Creating application");
        self.cache
            .mutate(&roots(&[keys::APPLICATIONS, keys::SYSTEM_STATS]), self.api.create_application(form))
            .await
    }

    pub async fn update_application(&self, id: &str, form: &ApplicationForm) -> ApiResult<Application> {
        info!(id, "Updating application");
        self.cache
            .mutate(&roots(&[keys::APPLICATIONS]), self.api.update_application(id, form))
            .await
    }

    pub async fn update_application_json(
        &self,
        id: &str,
        patch: &ApplicationPatch,
    ) -> ApiResult<Application> {
        info!(id, "Patching application");
        self.cache
            .mutate(&roots(&[keys::APPLICATIONS]), self.api.update_application_json(id, patch))
            .await
    }

    pub async fn delete_application(&self, id: &str) -> ApiResult<()> {
        info!(id, "Deleting application");
        self.cache
            .mutate(&roots(&[keys::APPLICATIONS, keys::SYSTEM_STATS]), self.api.delete_application(id))
            .await
    }

    pub async fn set_application_status(&self, id: &str, status: AppStatus) -> ApiResult<()> {
        info!(id, status = %status, "Changing application status");
        self.cache
            .mutate(&roots(&[keys::APPLICATIONS]), self.api.set_application_status(id, status))
            .await
    }

    pub async fn ping_application(&self, id: &str) -> ApiResult<serde_json::Value> {
        self.cache
            .mutate(&roots(&[keys::APPLICATIONS]), self.api.ping_application(id))
            .await
    }

    pub async fn delete_log(&self, id: &str) -> ApiResult<()> {
        info!(id, "Deleting log");
        self.cache.mutate(&log_family(), self.api.delete_log(id)).await
    }

    pub async fn delete_logs(&self, ids: &[String]) -> ApiResult<()> {
        if ids.is_empty() {
            let mut errors = ValidationErrors::new();
            errors.add("selection", "Please select logs to delete.");
            return Err(ApiError::Validation(errors));
        }
        info!(count = ids.len(), "Deleting logs");
        self.cache.mutate(&log_family(), self.api.delete_logs(ids)).await
    }

    /// Delete the rows selected in `controller`; the selection is cleared
    /// on success and kept on failure
    pub async fn delete_selected_logs(&self, controller: &mut ListController<LogType>) -> ApiResult<usize> {
        let ids = controller.selected();
        self.delete_logs(&ids).await?;
        controller.clear_selection();
        Ok(ids.len())
    }

    pub async fn delete_all_logs(&self) -> ApiResult<()> {
        info!("Deleting all logs");
        self.cache.mutate(&log_family(), self.api.delete_all_logs()).await
    }

    pub async fn create_task(&self, task: &NewTask) -> ApiResult<Task> {
        info!(app_id = %task.app_id, "Creating task");
        self.cache
            .mutate(&roots(&[keys::TASKS, keys::SYSTEM_STATS]), self.api.create_task(task))
            .await
    }

    pub async fn delete_task(&self, id: &str) -> ApiResult<()> {
        info!(id, "Deleting task");
        self.cache
            .mutate(&roots(&[keys::TASKS, keys::SYSTEM_STATS]), self.api.delete_task(id))
            .await
    }

    pub async fn delete_review(&self, id: &str) -> ApiResult<()> {
        info!(id, "Deleting review");
        self.cache
            .mutate(&roots(&[keys::REVIEWS, keys::SYSTEM_STATS]), self.api.delete_review(id))
            .await
    }
}

#[async_trait]
impl ListSource<LogType> for Resources {
    type Item = Log;
    type Counts = LogCounts;

    async fn load(&self, query: &ListQuery<LogType>) -> QueryResult<LogPage> {
        self.logs(query).await
    }
}

#[async_trait]
impl ListSource<TaskStatus> for Resources {
    type Item = Task;
    type Counts = TaskCounts;

    async fn load(&self, query: &ListQuery<TaskStatus>) -> QueryResult<TaskPage> {
        self.tasks(query).await
    }
}

#[async_trait]
impl ListSource<Rating> for Resources {
    type Item = Review;
    type Counts = ReviewStats;

    async fn load(&self, query: &ListQuery<Rating>) -> QueryResult<ReviewPage> {
        self.reviews(query).await
    }
}
