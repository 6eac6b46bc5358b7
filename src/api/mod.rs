//! AppHub REST API
//!
//! Typed access to the AppHub backend. Responses are normalized into fixed
//! shapes at this boundary so the layers above never see envelope variants.
//!
//! # Endpoints
//!
//! ## Applications
//! - `GET /application` - List applications
//! - `GET /application/:id` - Get an application
//! - `POST /application` - Create (multipart, with images)
//! - `PUT /application/:id` - Update (multipart or JSON)
//! - `DELETE /application/:id` - Delete
//! - `PATCH /application/:id/status` - Change status
//! - `POST /application/:id/ping` - Ping
//!
//! ## Logs
//! - `GET /log` - Paginated, filterable list with per-type counts
//! - `DELETE /log/:id`, `DELETE /log/bulk`, `DELETE /log/all`
//! - `GET /log/analytics?days=N`, `GET /log/trends?days=N`
//!
//! ## Tasks and Reviews
//! - `GET /task`, `POST /task`, `DELETE /task/:id`
//! - `GET /review`, `DELETE /review/:id`
//!
//! ## System
//! - `GET /system/stats`
//! - `GET /health` (outside the versioned prefix)

mod client;
pub mod envelope;
mod error;
pub mod forms;
pub mod models;
pub mod params;
pub mod wire;

pub use client::{ApiClient, ApiClientConfig};
pub use envelope::{Page, Pagination};
pub use error::{ApiError, ApiResult, ValidationErrors};
pub use forms::{ApplicationForm, ApplicationPatch, FormPart, ImageUpload, NewTask};
pub use params::{CategoryFilter, DateRange, ListQuery, DEFAULT_PAGE_SIZE};

use async_trait::async_trait;
use serde_json::Value;

use models::{
    AppStatus, Application, HealthStatus, Log, LogAnalytics, LogCounts, LogTrends, LogType, Rating,
    Review, ReviewStats, SystemStats, Task, TaskCounts, TaskStatus,
};

pub type LogPage = Page<Log, LogCounts>;
pub type TaskPage = Page<Task, TaskCounts>;
pub type ReviewPage = Page<Review, ReviewStats>;

/// Operations the dashboard performs against the backend
#[async_trait]
pub trait DashboardApi: Send + Sync {
    async fn list_applications(&self) -> ApiResult<Vec<Application>>;

    async fn get_application(&self, id: &str) -> ApiResult<Application>;

    /// Create an application from the add form (multipart with images)
    async fn create_application(&self, form: &ApplicationForm) -> ApiResult<Application>;

    /// Update an application from the edit form (multipart with images)
    async fn update_application(&self, id: &str, form: &ApplicationForm) -> ApiResult<Application>;

    /// Partial JSON update without images
    async fn update_application_json(
        &self,
        id: &str,
        patch: &ApplicationPatch,
    ) -> ApiResult<Application>;

    async fn delete_application(&self, id: &str) -> ApiResult<()>;

    async fn set_application_status(&self, id: &str, status: AppStatus) -> ApiResult<()>;

    /// Trigger a liveness ping; the payload is passed through untouched
    async fn ping_application(&self, id: &str) -> ApiResult<Value>;

    async fn list_logs(&self, query: &ListQuery<LogType>) -> ApiResult<LogPage>;

    async fn delete_log(&self, id: &str) -> ApiResult<()>;

    async fn delete_logs(&self, ids: &[String]) -> ApiResult<()>;

    async fn delete_all_logs(&self) -> ApiResult<()>;

    async fn list_tasks(&self, query: &ListQuery<TaskStatus>) -> ApiResult<TaskPage>;

    async fn create_task(&self, task: &NewTask) -> ApiResult<Task>;

    async fn delete_task(&self, id: &str) -> ApiResult<()>;

    async fn list_reviews(&self, query: &ListQuery<Rating>) -> ApiResult<ReviewPage>;

    async fn delete_review(&self, id: &str) -> ApiResult<()>;

    async fn get_system_stats(&self) -> ApiResult<SystemStats>;

    async fn get_log_analytics(&self, days: u32) -> ApiResult<LogAnalytics>;

    async fn get_log_trends(&self, days: u32) -> ApiResult<LogTrends>;

    async fn health_check(&self) -> ApiResult<HealthStatus>;
}
