//! Dashboard aggregates and chart data

use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

use crate::api::models::{AppStatus, Application, LogAnalytics, ReviewStats, SystemStats, TaskStatus};
use crate::api::{ApiError, ListQuery};
use crate::resources::Resources;

use super::status::Visual;

/// Trend points kept for the chart
const TREND_WINDOW: usize = 7;

/// Applications listed under "recent"
const RECENT_APPLICATIONS: usize = 5;

/// Every source the headline counters can come from
#[derive(Debug, Clone, Default)]
pub struct StatsSources {
    pub system: SystemStats,
    pub applications_listed: Option<usize>,
    pub analytics_total_logs: u64,
    pub tasks_total: Option<u64>,
    pub reviews_total: Option<u64>,
}

fn first_non_zero(candidates: &[u64]) -> u64 {
    candidates.iter().copied().find(|n| *n > 0).unwrap_or(0)
}

impl StatsSources {
    /// Headline counters; for each one the first non-zero source wins
    pub fn merge(&self) -> SystemStats {
        SystemStats {
            applications: first_non_zero(&[
                self.system.applications,
                self.applications_listed.unwrap_or(0) as u64,
            ]),
            logs: first_non_zero(&[self.analytics_total_logs, self.system.logs]),
            tasks: first_non_zero(&[self.tasks_total.unwrap_or(0), self.system.tasks]),
            reviews: first_non_zero(&[self.reviews_total.unwrap_or(0), self.system.reviews]),
        }
    }
}

/// One slice of the application status pie
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSlice {
    pub name: &'static str,
    pub value: u64,
    pub color: &'static str,
}

/// Status distribution; statuses with no applications are left out
pub fn status_slices(apps: &[Application]) -> Vec<StatusSlice> {
    AppStatus::ALL
        .iter()
        .map(|status| {
            let visual = status.visual();
            StatusSlice {
                name: visual.label,
                value: apps.iter().filter(|app| app.status == *status).count() as u64,
                color: visual.tone.hex(),
            }
        })
        .filter(|slice| slice.value > 0)
        .collect()
}

/// Mean uptime percentage across applications, 0 when there are none
pub fn average_uptime(apps: &[Application]) -> f64 {
    if apps.is_empty() {
        return 0.0;
    }
    apps.iter().map(Application::uptime_percentage).sum::<f64>() / apps.len() as f64
}

pub fn count_with_status(apps: &[Application], status: AppStatus) -> usize {
    apps.iter().filter(|app| app.status == status).count()
}

/// One day of the log trend chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    /// Weekday short name (`Mon`)
    pub day: String,
    pub date: String,
    pub success: u64,
    pub error: u64,
    pub warning: u64,
    pub info: u64,
}

/// The last seven days of the analytics breakdown, oldest first
pub fn trend_points(analytics: &LogAnalytics) -> Vec<TrendPoint> {
    let points: Vec<TrendPoint> = analytics
        .daily_breakdown
        .iter()
        .map(|(date, counts)| TrendPoint {
            day: weekday_name(date),
            date: date.clone(),
            success: counts.success,
            error: counts.error,
            warning: counts.warning,
            info: counts.info,
        })
        .collect();

    let skip = points.len().saturating_sub(TREND_WINDOW);
    points.into_iter().skip(skip).collect()
}

/// `2024-05-06` → `Mon`; anything unparsable is shown as is
fn weekday_name(date: &str) -> String {
    let day = date.get(..10).unwrap_or(date);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map(|d| d.format("%a").to_string())
        .unwrap_or_else(|_| date.to_string())
}

/// Review header numbers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewSummary {
    pub total: u64,
    /// Counts for 5, 4, 3, 2 and 1 stars
    pub by_stars: [u64; 5],
    pub average_rating: f64,
    pub five_star: u64,
    pub low: u64,
}

impl ReviewSummary {
    pub fn from_stats(stats: &ReviewStats) -> Self {
        let by_stars = [5, 4, 3, 2, 1].map(|stars| stats.count(stars));
        Self {
            total: stats.summary.total_reviews,
            by_stars,
            average_rating: stats.summary.average_rating,
            five_star: stats.summary.five_star_reviews,
            low: stats.summary.low_ratings,
        }
    }

    /// Average to one decimal place
    pub fn average_label(&self) -> String {
        format!("{:.1}", self.average_rating)
    }
}

/// Everything the dashboard view shows
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    pub stats: SystemStats,
    pub slices: Vec<StatusSlice>,
    pub average_uptime: f64,
    pub running: usize,
    pub total_applications: usize,
    pub trend: Vec<TrendPoint>,
    pub recent: Vec<Application>,
    /// Reads that failed; the rest of the dashboard is still filled in
    pub errors: Vec<ApiError>,
}

/// Load every dashboard read concurrently and shape the result
pub async fn load_dashboard(resources: &Resources, days: u32) -> Dashboard {
    // list totals only need the pagination block
    let tasks_query = ListQuery::<TaskStatus>::new(1, 1);
    let reviews_query = ListQuery::new(1, 1);

    let (apps, system, analytics, tasks, reviews) = tokio::join!(
        resources.applications(),
        resources.system_stats(),
        resources.log_analytics(days),
        resources.tasks(&tasks_query),
        resources.reviews(&reviews_query),
    );

    let mut errors = Vec::new();
    let mut note = |error: &Option<ApiError>| {
        if let Some(error) = error {
            errors.push(error.clone());
        }
    };
    note(&apps.error);
    note(&system.error);
    note(&analytics.error);
    note(&tasks.error);
    note(&reviews.error);

    // counters and charts fall back to zeros when nothing was ever fetched
    let apps: Arc<Vec<Application>> = apps.data.unwrap_or_default();
    let analytics: Arc<LogAnalytics> = analytics.data.unwrap_or_default();
    let sources = StatsSources {
        system: system.data.map(|s| *s).unwrap_or_default(),
        applications_listed: Some(apps.len()),
        analytics_total_logs: analytics.total_logs,
        tasks_total: tasks.data.map(|page| page.pagination.total),
        reviews_total: reviews.data.map(|page| page.pagination.total),
    };

    Dashboard {
        stats: sources.merge(),
        slices: status_slices(&apps),
        average_uptime: average_uptime(&apps),
        running: count_with_status(&apps, AppStatus::Running),
        total_applications: apps.len(),
        trend: trend_points(&analytics),
        recent: apps.iter().take(RECENT_APPLICATIONS).cloned().collect(),
        errors,
    }
}
