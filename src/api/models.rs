//! AppHub Domain Types
//!
//! Entities exchanged with the AppHub REST API. Status domains are closed
//! enums; anything the backend sends outside them is a decode error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::wire;

// ============ Status Domains ============

/// Operational state of a tracked application
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppStatus {
    #[default]
    Running,
    Stopped,
    Maintenance,
}

impl AppStatus {
    pub const ALL: [AppStatus; 3] = [AppStatus::Running, AppStatus::Stopped, AppStatus::Maintenance];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppStatus::Running => "running",
            AppStatus::Stopped => "stopped",
            AppStatus::Maintenance => "maintenance",
        }
    }
}

/// Classification of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    Success,
    Error,
    Warning,
    Info,
}

impl LogType {
    pub const ALL: [LogType; 4] = [LogType::Success, LogType::Error, LogType::Warning, LogType::Info];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogType::Success => "success",
            LogType::Error => "error",
            LogType::Warning => "warning",
            LogType::Info => "info",
        }
    }
}

/// Progress state of a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Pending, TaskStatus::InProgress, TaskStatus::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "inprogress",
            TaskStatus::Done => "done",
        }
    }
}

/// Task urgency
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::Low, Priority::Medium, Priority::High, Priority::Urgent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

macro_rules! text_enum {
    ($ty:ty, $label:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let needle = s.trim().to_lowercase();
                <$ty>::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == needle)
                    .ok_or_else(|| {
                        let valid: Vec<&str> = <$ty>::ALL.iter().map(|v| v.as_str()).collect();
                        format!("unknown {} {:?} (expected one of: {})", $label, s, valid.join(", "))
                    })
            }
        }
    };
}

text_enum!(AppStatus, "status");
text_enum!(LogType, "log type");
text_enum!(TaskStatus, "task status");
text_enum!(Priority, "priority");

/// Star rating, always within 1..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rating::new(value).ok_or_else(|| format!("rating must be between 1 and 5, got {}", value))
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> u8 {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Rating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u8 = s
            .trim()
            .parse()
            .map_err(|_| format!("invalid rating {:?}", s))?;
        Rating::try_from(value)
    }
}

// ============ Applications ============

/// Image URL sets attached to an application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageSet {
    pub small: Vec<String>,
    pub large: Vec<String>,
}

impl ImageSet {
    pub fn is_empty(&self) -> bool {
        self.small.is_empty() && self.large.is_empty()
    }

    pub fn len(&self) -> usize {
        self.small.len() + self.large.len()
    }
}

#[derive(Deserialize)]
struct RawImageSet {
    #[serde(default)]
    small: Vec<String>,
    #[serde(default)]
    large: Vec<String>,
}

impl From<RawImageSet> for ImageSet {
    fn from(raw: RawImageSet) -> Self {
        Self {
            small: raw.small,
            large: raw.large,
        }
    }
}

// The backend stores images as an object, as a JSON-encoded string of that
// object, or as a single bare URL (treated as one large image).
impl<'de> Deserialize<'de> for ImageSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        match Value::deserialize(deserializer)? {
            Value::Null => Ok(ImageSet::default()),
            value @ Value::Object(_) => serde_json::from_value::<RawImageSet>(value)
                .map(ImageSet::from)
                .map_err(D::Error::custom),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(ImageSet::default());
                }
                match serde_json::from_str::<RawImageSet>(trimmed) {
                    Ok(raw) => Ok(raw.into()),
                    Err(_) => Ok(ImageSet {
                        small: Vec::new(),
                        large: vec![trimmed.to_string()],
                    }),
                }
            }
            other => Err(D::Error::custom(format!("unexpected images value: {}", other))),
        }
    }
}

/// A tracked application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(default, deserialize_with = "wire::string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "wire::string_or_number")]
    pub app_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub bg: String,
    #[serde(default)]
    pub link: String,
    #[serde(default, deserialize_with = "wire::comma_list")]
    pub stacks: Vec<String>,
    #[serde(default)]
    pub on_going: bool,
    pub status: AppStatus,
    #[serde(default, deserialize_with = "wire::f64_lenient")]
    pub uptime: f64,
    #[serde(default, deserialize_with = "wire::f64_lenient")]
    pub downtime: f64,
    #[serde(default, deserialize_with = "wire::flexible_datetime")]
    pub last_checked: Option<DateTime<Utc>>,
    #[serde(default)]
    pub backend_url: String,
    #[serde(default)]
    pub frontend_url: String,
    #[serde(default)]
    pub github_url: String,
    #[serde(default)]
    pub images: ImageSet,
    #[serde(default, deserialize_with = "wire::flexible_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "wire::flexible_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Application {
    /// Share of tracked time the application was up, in percent.
    ///
    /// Defined as 100 when nothing has been tracked yet.
    pub fn uptime_percentage(&self) -> f64 {
        uptime_percentage(self.uptime, self.downtime)
    }
}

/// `uptime / (uptime + downtime) * 100`, or 100 when both are zero
pub fn uptime_percentage(uptime: f64, downtime: f64) -> f64 {
    let total = uptime + downtime;
    if total <= 0.0 {
        100.0
    } else {
        uptime / total * 100.0
    }
}

// ============ Logs, Tasks, Reviews ============

/// A request/event log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    #[serde(deserialize_with = "wire::string_or_number")]
    pub id: String,
    pub log_type: LogType,
    #[serde(default)]
    pub message: String,
    #[serde(default, deserialize_with = "wire::string_or_number")]
    pub app_id: String,
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default, deserialize_with = "wire::opt_f64_lenient")]
    pub response_time: Option<f64>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default, deserialize_with = "wire::flexible_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "wire::flexible_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub additional_data: Option<serde_json::Map<String, Value>>,
}

/// A to-do item attached to an application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(deserialize_with = "wire::string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "wire::string_or_number")]
    pub app_id: String,
    #[serde(default)]
    pub app_name: Option<String>,
    pub description: String,
    pub status: TaskStatus,
    #[serde(default, deserialize_with = "wire::flexible_datetime")]
    pub date_to_finish: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, deserialize_with = "wire::flexible_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "wire::flexible_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// User feedback for an application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(deserialize_with = "wire::string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "wire::string_or_number")]
    pub app_id: String,
    #[serde(default)]
    pub app_name: String,
    pub rating: Rating,
    #[serde(default)]
    pub reviewer: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default, deserialize_with = "wire::flexible_datetime")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub helpful: u32,
    #[serde(default)]
    pub verified: bool,
    #[serde(default, deserialize_with = "wire::flexible_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "wire::flexible_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

// ============ Per-category Counts ============

/// Log totals per classification, as returned alongside a log page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogCounts {
    #[serde(default, deserialize_with = "wire::u64_lenient")]
    pub total: u64,
    #[serde(default, deserialize_with = "wire::u64_lenient")]
    pub success: u64,
    #[serde(default, deserialize_with = "wire::u64_lenient")]
    pub error: u64,
    #[serde(default, deserialize_with = "wire::u64_lenient")]
    pub warning: u64,
    #[serde(default, deserialize_with = "wire::u64_lenient")]
    pub info: u64,
}

impl LogCounts {
    pub fn of(&self, log_type: LogType) -> u64 {
        match log_type {
            LogType::Success => self.success,
            LogType::Error => self.error,
            LogType::Warning => self.warning,
            LogType::Info => self.info,
        }
    }
}

/// Task totals per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    #[serde(default, deserialize_with = "wire::u64_lenient")]
    pub total: u64,
    #[serde(default, deserialize_with = "wire::u64_lenient")]
    pub pending: u64,
    #[serde(default, deserialize_with = "wire::u64_lenient")]
    pub inprogress: u64,
    #[serde(default, deserialize_with = "wire::u64_lenient")]
    pub done: u64,
}

impl TaskCounts {
    pub fn of(&self, status: TaskStatus) -> u64 {
        match status {
            TaskStatus::Pending => self.pending,
            TaskStatus::InProgress => self.inprogress,
            TaskStatus::Done => self.done,
        }
    }
}

/// Rating statistics returned with a review page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewStats {
    /// Review count keyed by star value (`"1"`..`"5"`)
    #[serde(default)]
    pub distribution: BTreeMap<String, u64>,
    #[serde(default)]
    pub summary: RatingSummary,
}

impl ReviewStats {
    pub fn count(&self, stars: u8) -> u64 {
        self.distribution.get(&stars.to_string()).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    #[serde(default, deserialize_with = "wire::u64_lenient")]
    pub total_reviews: u64,
    #[serde(default, deserialize_with = "wire::f64_lenient")]
    pub average_rating: f64,
    #[serde(default, deserialize_with = "wire::u64_lenient")]
    pub five_star_reviews: u64,
    #[serde(default, deserialize_with = "wire::u64_lenient")]
    pub low_ratings: u64,
}

// ============ System & Analytics ============

/// Global record counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStats {
    #[serde(default, deserialize_with = "wire::u64_lenient")]
    pub applications: u64,
    #[serde(default, deserialize_with = "wire::u64_lenient")]
    pub logs: u64,
    #[serde(default, deserialize_with = "wire::u64_lenient")]
    pub tasks: u64,
    #[serde(default, deserialize_with = "wire::u64_lenient")]
    pub reviews: u64,
}

/// Per-type log counts for one day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyLogCounts {
    #[serde(default, deserialize_with = "wire::u64_lenient")]
    pub success: u64,
    #[serde(default, deserialize_with = "wire::u64_lenient")]
    pub error: u64,
    #[serde(default, deserialize_with = "wire::u64_lenient")]
    pub warning: u64,
    #[serde(default, deserialize_with = "wire::u64_lenient")]
    pub info: u64,
}

/// Log analytics over a trailing window of days
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogAnalytics {
    #[serde(default, deserialize_with = "wire::u64_lenient")]
    pub total_logs: u64,
    /// Keyed by ISO date; ordered chronologically by the map
    #[serde(default)]
    pub daily_breakdown: BTreeMap<String, DailyLogCounts>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendDateRange {
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default, deserialize_with = "wire::u64_lenient")]
    pub days: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDistribution {
    #[serde(default, deserialize_with = "wire::u64_lenient")]
    pub count: u64,
    #[serde(default, deserialize_with = "wire::f64_lenient")]
    pub avg_response_time: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSummary {
    #[serde(default, deserialize_with = "wire::u64_lenient")]
    pub total_logs: u64,
    #[serde(default)]
    pub date_range: TrendDateRange,
    #[serde(default)]
    pub log_type_distribution: BTreeMap<String, TypeDistribution>,
    #[serde(default, deserialize_with = "wire::f64_lenient")]
    pub average_logs_per_day: f64,
}

/// One (date, log type) bucket of the trends report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyTrend {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub log_type: String,
    #[serde(default, deserialize_with = "wire::u64_lenient")]
    pub count: u64,
    #[serde(default, deserialize_with = "wire::f64_lenient")]
    pub avg_response_time: f64,
    #[serde(default, deserialize_with = "wire::f64_lenient")]
    pub max_response_time: f64,
    #[serde(default, deserialize_with = "wire::f64_lenient")]
    pub min_response_time: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorRatePoint {
    #[serde(default)]
    pub date: String,
    #[serde(default, deserialize_with = "wire::u64_lenient")]
    pub error_count: u64,
    #[serde(default, deserialize_with = "wire::u64_lenient")]
    pub total_count: u64,
    #[serde(default, deserialize_with = "wire::f64_lenient")]
    pub error_rate: f64,
}

/// Log trends report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogTrends {
    #[serde(default)]
    pub summary: TrendSummary,
    #[serde(default)]
    pub daily_trends: Vec<DailyTrend>,
    #[serde(default)]
    pub error_rate_trend: Vec<ErrorRatePoint>,
}

/// Response of the separate `/health` endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uptime_percentage() {
        assert_eq!(uptime_percentage(0.0, 0.0), 100.0);
        assert_eq!(uptime_percentage(80.0, 20.0), 80.0);
        assert_eq!(uptime_percentage(0.0, 50.0), 0.0);
    }

    #[test]
    fn test_application_wire_shape() {
        let json = r#"{
            "id": 3,
            "appId": 1001,
            "name": "Storefront",
            "stacks": "React, Node",
            "status": "maintenance",
            "uptime": "80",
            "downtime": 20,
            "images": "{\"small\":[\"s1.png\"],\"large\":[\"l1.png\"]}",
            "lastChecked": "2024-05-01T10:00:00.000Z"
        }"#;

        let app: Application = serde_json::from_str(json).unwrap();
        assert_eq!(app.id, "3");
        assert_eq!(app.app_id, "1001");
        assert_eq!(app.status, AppStatus::Maintenance);
        assert_eq!(app.stacks, vec!["React", "Node"]);
        assert_eq!(app.images.small, vec!["s1.png"]);
        assert_eq!(app.images.large, vec!["l1.png"]);
        assert_eq!(app.uptime_percentage(), 80.0);
        assert!(app.last_checked.is_some());
    }

    #[test]
    fn test_bare_image_url_becomes_large_image() {
        let images: ImageSet = serde_json::from_str(r#""https://cdn.example/hero.png""#).unwrap();
        assert!(images.small.is_empty());
        assert_eq!(images.large, vec!["https://cdn.example/hero.png"]);

        let images: ImageSet = serde_json::from_str(r#""""#).unwrap();
        assert!(images.is_empty());
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let json = r#"{"appId": "a", "name": "x", "status": "exploded"}"#;
        assert!(serde_json::from_str::<Application>(json).is_err());
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0).is_none());
        assert!(Rating::new(6).is_none());
        assert_eq!(Rating::new(5).map(|r| r.value()), Some(5));

        let json = r#"{"id": 1, "rating": 7, "reviewer": "sam"}"#;
        assert!(serde_json::from_str::<Review>(json).is_err());
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("InProgress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!("ERROR".parse::<LogType>().unwrap(), LogType::Error);
        assert!("later".parse::<Priority>().is_err());
        assert_eq!(TaskStatus::InProgress.to_string(), "inprogress");
    }

    #[test]
    fn test_task_defaults_priority() {
        let json = r#"{"id": 9, "appId": "a", "description": "ship", "status": "inprogress", "dateToFinish": "2024-06-01"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(task.date_to_finish.is_some());
    }

    #[test]
    fn test_trend_numeric_strings() {
        let json = r#"{
            "summary": {"totalLogs": 12},
            "dailyTrends": [{"date": "2024-05-01", "log_type": "error", "count": 2, "avg_response_time": "120.5"}],
            "errorRateTrend": [{"date": "2024-05-01", "error_count": "2", "total_count": 10, "error_rate": "20.00"}]
        }"#;
        let trends: LogTrends = serde_json::from_str(json).unwrap();
        assert_eq!(trends.summary.total_logs, 12);
        assert_eq!(trends.daily_trends[0].avg_response_time, 120.5);
        assert_eq!(trends.error_rate_trend[0].error_count, 2);
        assert_eq!(trends.error_rate_trend[0].error_rate, 20.0);
    }
}
