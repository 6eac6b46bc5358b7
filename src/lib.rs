//! # AppHub Console
//!
//! Data layer and command-line front-end for the AppHub admin dashboard,
//! which tracks applications together with their logs, tasks and reviews
//! through a remote REST API.
//!
//! ## Modules
//!
//! - [`api`]: typed REST client and envelope normalization
//! - [`query`]: keyed query cache with de-duplication, staleness and invalidation
//! - [`controller`]: filter/pagination/selection state per list view
//! - [`resources`]: cached reads and invalidating mutations per resource
//! - [`presentation`]: status visuals, dashboard aggregates, forms, alerts, routes
//! - [`config`]: TOML configuration with environment overrides
//! - [`cli`]: the `apphub` command-line interface
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use apphub::api::{ApiClient, ApiClientConfig, ListQuery};
//! use apphub::api::models::LogType;
//! use apphub::query::{QueryCache, QueryOptions};
//! use apphub::resources::Resources;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::new(ApiClientConfig::default())?;
//!     let resources = Resources::new(Arc::new(client), QueryCache::new(QueryOptions::default()));
//!
//!     // Page 1 of error logs
//!     let query = ListQuery::new(1, 50).category(LogType::Error);
//!     let page = resources.logs(&query).await.into_result()?;
//!     println!("{} of {} error logs", page.items.len(), page.pagination.total);
//!
//!     // Deleting refetches every log-derived read on next access
//!     if let Some(log) = page.items.first() {
//!         resources.delete_log(&log.id).await?;
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod controller;
pub mod presentation;
pub mod query;
pub mod resources;

// Re-export top-level types for convenience
pub use api::{ApiClient, ApiClientConfig, ApiError, ApiResult, DashboardApi, ListQuery, Page, Pagination};

pub use query::{QueryCache, QueryKey, QueryOptions, QueryResult, QueryStatus, Subscription};

pub use controller::{ListController, ListFilters, ListView, Transition};

pub use resources::Resources;

pub use config::{Config, ConfigError};
