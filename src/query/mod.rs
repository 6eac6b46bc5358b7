//! AppHub Query Cache
//!
//! Client-side cache for backend reads:
//!
//! - **QueryKey**: hierarchical key (`["logs", <params>]`), prefix-matched
//! - **QueryOptions**: stale time and retry policy per read
//! - **QueryCache**: de-duplicated fetches, invalidation, mutations
//! - **Subscription**: change notifications for one key
//!
//! # Example
//!
//! ```rust,ignore
//! let cache = QueryCache::new(QueryOptions::default());
//! let key = QueryKey::new("applications");
//!
//! let apps = cache
//!     .query(key.clone(), cache.defaults(), move || {
//!         let api = api.clone();
//!         async move { api.list_applications().await }
//!     })
//!     .await;
//!
//! // After a write, every read under the prefix refetches
//! cache.mutate(&[key], api.delete_application("42")).await?;
//! ```

mod cache;
mod entry;
mod key;
mod options;

pub use cache::QueryCache;
pub use entry::{QueryResult, QueryStatus, Subscription};
pub use key::QueryKey;
pub use options::QueryOptions;
