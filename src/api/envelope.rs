//! Response Envelope Normalization
//!
//! The backend wraps everything in `{success, data, message?}`, but list
//! endpoints are inconsistent about where the rows, pagination, and counts
//! live: sometimes `data` is the row array and `pagination` sits next to it,
//! sometimes `data` is itself `{data, pagination, counts}`. Everything is
//! folded into one internal shape here so nothing downstream branches on it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{ApiError, ApiResult};

/// Pagination metadata for a list response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl Pagination {
    /// Derive pagination for a backend that returned a bare row array
    pub fn derived(item_count: usize, page: u32, page_size: u32) -> Self {
        let page_size = page_size.max(1);
        let total = item_count as u64;
        let total_pages = total.div_ceil(page_size as u64) as u32;
        Self {
            page: page.max(1),
            limit: page_size,
            total,
            total_pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

/// One normalized page of a list endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T, C> {
    pub items: Vec<T>,
    pub pagination: Pagination,
    pub counts: C,
}

fn message_of(body: &Value) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .unwrap_or("request was not successful")
        .to_string()
}

/// Reject `{success: false}` bodies delivered with a 2xx status
fn check_success(body: &Value, status: u16) -> ApiResult<()> {
    match body.get("success").and_then(Value::as_bool) {
        Some(false) => Err(ApiError::Http {
            status,
            message: message_of(body),
        }),
        _ => Ok(()),
    }
}

fn take_data(mut body: Value, status: u16) -> ApiResult<Value> {
    check_success(&body, status)?;
    match body.get_mut("data") {
        Some(data) => Ok(data.take()),
        None => Err(ApiError::Decode("response envelope has no data field".to_string())),
    }
}

/// Decode the `data` field of an envelope
pub fn data<T: DeserializeOwned>(body: Value, status: u16) -> ApiResult<T> {
    let data = take_data(body, status)?;
    serde_json::from_value(data).map_err(ApiError::from)
}

/// Decode `data.data` when the payload is nested one level, else `data`
pub fn nested_data<T: DeserializeOwned>(body: Value, status: u16) -> ApiResult<T> {
    let mut data = take_data(body, status)?;
    let inner = match data.get_mut("data") {
        Some(inner) if inner.is_object() => inner.take(),
        _ => data,
    };
    serde_json::from_value(inner).map_err(ApiError::from)
}

/// Accept any successful envelope, ignoring its payload
pub fn ack(body: Value, status: u16) -> ApiResult<()> {
    check_success(&body, status)
}

/// Normalize a list response into a [`Page`].
///
/// `counts_key` names the per-category totals object (`counts` for logs and
/// tasks, `ratingStats` for reviews). Missing pagination is derived from the
/// row count and the requested page; missing counts default to zero.
pub fn page<T, C>(
    body: Value,
    status: u16,
    requested_page: u32,
    requested_size: u32,
    counts_key: &str,
) -> ApiResult<Page<T, C>>
where
    T: DeserializeOwned,
    C: DeserializeOwned + Default,
{
    check_success(&body, status)?;

    let data = body
        .get("data")
        .ok_or_else(|| ApiError::Decode("response envelope has no data field".to_string()))?;

    let (rows, meta) = match data {
        Value::Array(_) => (data, &body),
        Value::Object(map) => match map.get("data") {
            Some(rows @ Value::Array(_)) => (rows, data),
            _ => {
                return Err(ApiError::Decode(
                    "list payload has no row array".to_string(),
                ))
            }
        },
        other => {
            return Err(ApiError::Decode(format!(
                "unexpected list payload: {}",
                other
            )))
        }
    };

    let items: Vec<T> = serde_json::from_value(rows.clone())?;

    let lookup = |key: &str| meta.get(key).or_else(|| body.get(key)).filter(|v| !v.is_null());

    let pagination = match lookup("pagination") {
        Some(value) => serde_json::from_value(value.clone())?,
        None => Pagination::derived(items.len(), requested_page, requested_size),
    };

    let counts = match lookup(counts_key) {
        Some(value) => serde_json::from_value(value.clone())?,
        None => C::default(),
    };

    Ok(Page {
        items,
        pagination,
        counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{Log, LogCounts, SystemStats};
    use serde_json::json;

    fn log_row(id: u32) -> Value {
        json!({"id": id, "logType": "info", "message": "ok", "appId": "a", "appName": "A"})
    }

    #[test]
    fn test_nested_list_payload() {
        let body = json!({
            "success": true,
            "data": {
                "message": "Logs retrieved",
                "data": [log_row(1), log_row(2)],
                "pagination": {"page": 2, "limit": 2, "total": 7, "totalPages": 4},
                "counts": {"total": 7, "success": 1, "error": 2, "warning": 3, "info": 1}
            }
        });

        let page: Page<Log, LogCounts> = page(body, 200, 2, 2, "counts").unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.pagination.total, 7);
        assert!(page.pagination.has_next());
        assert!(page.pagination.has_prev());
        assert_eq!(page.counts.warning, 3);
    }

    #[test]
    fn test_flat_list_payload_derives_pagination() {
        let body = json!({"success": true, "data": [log_row(1), log_row(2), log_row(3)]});

        let page: Page<Log, LogCounts> = page(body, 200, 1, 2, "counts").unwrap();
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.pagination.total, 3);
        assert_eq!(page.pagination.total_pages, 2);
        assert_eq!(page.counts, LogCounts::default());
    }

    #[test]
    fn test_top_level_pagination_next_to_rows() {
        let body = json!({
            "success": true,
            "data": [log_row(1)],
            "pagination": {"page": 1, "limit": 50, "total": 1, "totalPages": 1}
        });

        let page: Page<Log, LogCounts> = page(body, 200, 1, 50, "counts").unwrap();
        assert_eq!(page.pagination.total_pages, 1);
        assert!(!page.pagination.has_next());
    }

    #[test]
    fn test_unsuccessful_envelope() {
        let body = json!({"success": false, "message": "nope", "data": null});
        let err = data::<SystemStats>(body, 200).unwrap_err();
        assert_eq!(
            err,
            ApiError::Http {
                status: 200,
                message: "nope".to_string()
            }
        );
    }

    #[test]
    fn test_missing_rows_is_decode_error() {
        let body = json!({"success": true, "data": {"pagination": {}}});
        let result: ApiResult<Page<Log, LogCounts>> = page(body, 200, 1, 10, "counts");
        assert!(matches!(result, Err(ApiError::Decode(_))));
    }

    #[test]
    fn test_nested_data_unwraps_one_level() {
        let body = json!({"success": true, "data": {"data": {"applications": 4}}});
        let stats: SystemStats = nested_data(body, 200).unwrap();
        assert_eq!(stats.applications, 4);

        let body = json!({"success": true, "data": {"applications": 2}});
        let stats: SystemStats = nested_data(body, 200).unwrap();
        assert_eq!(stats.applications, 2);
    }
}
