//! AppHub REST API Client
//!
//! HTTP client for the AppHub backend. Every call maps to exactly one
//! request; retries belong to the query cache, not to this layer.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::envelope::{self, Page};
use super::error::{ApiError, ApiResult};
use super::forms::{
    into_multipart, ApplicationForm, ApplicationPatch, BulkDelete, NewTask, StatusUpdate,
};
use super::models::{
    AppStatus, Application, HealthStatus, Log, LogAnalytics, LogCounts, LogTrends, LogType,
    Rating, Review, ReviewStats, SystemStats, Task, TaskCounts, TaskStatus,
};
use super::params::{CategoryFilter, ListQuery};
use super::{DashboardApi, LogPage, ReviewPage, TaskPage};
use crate::config::ApiConfig;

/// Connection settings for [`ApiClient`]
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Versioned API root, e.g. `https://host/api/v1`
    pub base_url: String,
    /// Absolute URL of the unversioned health endpoint
    pub health_url: String,
    pub request_timeout: Duration,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self::from(&ApiConfig::default())
    }
}

impl From<&ApiConfig> for ApiClientConfig {
    fn from(config: &ApiConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            health_url: config.health_url.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

/// reqwest-backed implementation of [`DashboardApi`]
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    config: ApiClientConfig,
}

impl ApiClient {
    pub fn new(config: ApiClientConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    /// Send a request and read the JSON body, mapping non-2xx to `Http`
    async fn send(&self, request: RequestBuilder) -> ApiResult<(u16, Value)> {
        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "request failed before a response arrived");
            if e.is_decode() {
                ApiError::Decode(e.to_string())
            } else {
                ApiError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let url = response.url().path().to_string();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(text);
            warn!(status = status.as_u16(), path = %url, "backend returned an error status");
            return Err(ApiError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await.map_err(ApiError::from)?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        debug!(status = status.as_u16(), path = %url, "response received");
        Ok((status.as_u16(), body))
    }

    async fn get_data<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let (status, body) = self.send(self.request(Method::GET, path)).await?;
        envelope::data(body, status)
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> ApiResult<(u16, Value)> {
        self.send(self.request(method, path).json(body)).await
    }

    async fn list<T, C, F>(
        &self,
        path: &str,
        query: &ListQuery<F>,
        counts_key: &str,
    ) -> ApiResult<Page<T, C>>
    where
        T: DeserializeOwned,
        C: DeserializeOwned + Default,
        F: CategoryFilter,
    {
        let request = self
            .request(Method::GET, path)
            .query(&query.to_query_pairs());
        let (status, body) = self.send(request).await?;
        envelope::page(body, status, query.page, query.page_size, counts_key)
    }

    async fn delete(&self, path: &str) -> ApiResult<()> {
        let (status, body) = self.send(self.request(Method::DELETE, path)).await?;
        envelope::ack(body, status)
    }
}

fn id_path(prefix: &str, id: &str) -> String {
    format!("{}/{}", prefix, urlencoding::encode(id))
}

#[async_trait]
impl DashboardApi for ApiClient {
    async fn list_applications(&self) -> ApiResult<Vec<Application>> {
        self.get_data("/application").await
    }

    async fn get_application(&self, id: &str) -> ApiResult<Application> {
        self.get_data(&id_path("/application", id)).await
    }

    async fn create_application(&self, form: &ApplicationForm) -> ApiResult<Application> {
        form.validate()?;
        let multipart = into_multipart(form.create_parts(chrono::Utc::now()))?;
        let request = self
            .request(Method::POST, "/application")
            .multipart(multipart);
        let (status, body) = self.send(request).await?;
        envelope::data(body, status)
    }

    async fn update_application(&self, id: &str, form: &ApplicationForm) -> ApiResult<Application> {
        form.validate()?;
        let multipart = into_multipart(form.update_parts()?)?;
        let request = self
            .request(Method::PUT, &id_path("/application", id))
            .multipart(multipart);
        let (status, body) = self.send(request).await?;
        envelope::data(body, status)
    }

    async fn update_application_json(
        &self,
        id: &str,
        patch: &ApplicationPatch,
    ) -> ApiResult<Application> {
        let (status, body) = self
            .send_json(Method::PUT, &id_path("/application", id), patch)
            .await?;
        envelope::data(body, status)
    }

    async fn delete_application(&self, id: &str) -> ApiResult<()> {
        self.delete(&id_path("/application", id)).await
    }

    async fn set_application_status(&self, id: &str, status: AppStatus) -> ApiResult<()> {
        let path = format!("{}/status", id_path("/application", id));
        let (code, body) = self
            .send_json(Method::PATCH, &path, &StatusUpdate { status })
            .await?;
        envelope::ack(body, code)
    }

    async fn ping_application(&self, id: &str) -> ApiResult<Value> {
        let path = format!("{}/ping", id_path("/application", id));
        let (status, body) = self.send(self.request(Method::POST, &path)).await?;
        let data = body.get("data").cloned().unwrap_or(Value::Null);
        envelope::ack(body, status)?;
        Ok(data)
    }

    async fn list_logs(&self, query: &ListQuery<LogType>) -> ApiResult<LogPage> {
        self.list::<Log, LogCounts, _>("/log", query, "counts").await
    }

    async fn delete_log(&self, id: &str) -> ApiResult<()> {
        self.delete(&id_path("/log", id)).await
    }

    async fn delete_logs(&self, ids: &[String]) -> ApiResult<()> {
        let (status, body) = self
            .send_json(Method::DELETE, "/log/bulk", &BulkDelete { ids })
            .await?;
        envelope::ack(body, status)
    }

    async fn delete_all_logs(&self) -> ApiResult<()> {
        self.delete("/log/all").await
    }

    async fn list_tasks(&self, query: &ListQuery<TaskStatus>) -> ApiResult<TaskPage> {
        self.list::<Task, TaskCounts, _>("/task", query, "counts").await
    }

    async fn create_task(&self, task: &NewTask) -> ApiResult<Task> {
        let (status, body) = self.send_json(Method::POST, "/task", task).await?;
        envelope::data(body, status)
    }

    async fn delete_task(&self, id: &str) -> ApiResult<()> {
        self.delete(&id_path("/task", id)).await
    }

    async fn list_reviews(&self, query: &ListQuery<Rating>) -> ApiResult<ReviewPage> {
        self.list::<Review, ReviewStats, _>("/review", query, "ratingStats")
            .await
    }

    async fn delete_review(&self, id: &str) -> ApiResult<()> {
        self.delete(&id_path("/review", id)).await
    }

    async fn get_system_stats(&self) -> ApiResult<SystemStats> {
        self.get_data("/system/stats").await
    }

    async fn get_log_analytics(&self, days: u32) -> ApiResult<LogAnalytics> {
        let request = self
            .request(Method::GET, "/log/analytics")
            .query(&[("days", days)]);
        let (status, body) = self.send(request).await?;
        envelope::nested_data(body, status)
    }

    async fn get_log_trends(&self, days: u32) -> ApiResult<LogTrends> {
        let request = self
            .request(Method::GET, "/log/trends")
            .query(&[("days", days)]);
        let (status, body) = self.send(request).await?;
        envelope::nested_data(body, status)
    }

    async fn health_check(&self) -> ApiResult<HealthStatus> {
        let request = self.client.get(&self.config.health_url);
        let (_, body) = self.send(request).await?;
        serde_json::from_value(body).map_err(ApiError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_path_encoded() {
        assert_eq!(id_path("/log", "a b/c"), "/log/a%20b%2Fc");
        assert_eq!(id_path("/application", "42"), "/application/42");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = ApiConfig {
            base_url: "http://localhost:4000/api/v1/".to_string(),
            ..ApiConfig::default()
        };
        let client = ApiClient::new(ApiClientConfig::from(&config)).unwrap();
        assert_eq!(client.url("/log"), "http://localhost:4000/api/v1/log");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        let config = ApiClientConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            health_url: "http://127.0.0.1:1/health".to_string(),
            request_timeout: Duration::from_secs(2),
        };
        let client = ApiClient::new(config).unwrap();
        let err = client.list_applications().await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_invalid_form_is_rejected_before_sending() {
        let client = ApiClient::new(ApiClientConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            health_url: String::new(),
            request_timeout: Duration::from_secs(1),
        })
        .unwrap();
        let err = client
            .create_application(&ApplicationForm::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
