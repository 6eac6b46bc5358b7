//! Transient alerts and delayed navigation
//!
//! Every mutation ends in an [`Outcome`]: an alert for the user and, on
//! success, an optional route to move to once the alert has been seen.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::api::models::AppStatus;
use crate::api::{ApiError, ApiResult};

use super::routes::Route;
use super::status::Tone;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Success,
    Error,
    Warning,
    Info,
}

impl AlertKind {
    pub fn tone(&self) -> Tone {
        match self {
            AlertKind::Success => Tone::Positive,
            AlertKind::Error => Tone::Negative,
            AlertKind::Warning => Tone::Caution,
            AlertKind::Info => Tone::Informative,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub title: Option<String>,
    pub message: String,
}

impl Alert {
    fn new(kind: AlertKind, message: impl Into<String>, title: Option<&str>) -> Self {
        Self {
            kind,
            title: title.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>, title: Option<&str>) -> Self {
        Self::new(AlertKind::Success, message, title)
    }

    pub fn error(message: impl Into<String>, title: Option<&str>) -> Self {
        Self::new(AlertKind::Error, message, title)
    }

    pub fn warning(message: impl Into<String>, title: Option<&str>) -> Self {
        Self::new(AlertKind::Warning, message, title)
    }

    pub fn info(message: impl Into<String>, title: Option<&str>) -> Self {
        Self::new(AlertKind::Info, message, title)
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.title {
            Some(title) => write!(f, "{}: {}", title, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Result of a mutation as the user sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub alert: Alert,
    pub navigate: Option<Route>,
}

impl Outcome {
    fn of<T>(result: &ApiResult<T>, success: Alert, navigate: Option<Route>, failure: Alert) -> Self {
        match result {
            Ok(_) => Outcome {
                alert: success,
                navigate,
            },
            // validation failures name the problem themselves
            Err(ApiError::Validation(errors)) => Outcome {
                alert: Alert::warning(
                    errors
                        .iter()
                        .next()
                        .map(|(_, message)| message.to_string())
                        .unwrap_or_else(|| "Please fill in all required fields correctly.".to_string()),
                    Some("Validation Error"),
                ),
                navigate: None,
            },
            Err(_) => Outcome {
                alert: failure,
                navigate: None,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.alert.kind == AlertKind::Success
    }

    pub fn application_created<T>(result: &ApiResult<T>, name: &str) -> Self {
        Self::of(
            result,
            Alert::success(
                format!("Application \"{}\" has been created successfully!", name),
                Some("Application Created"),
            ),
            Some(Route::Applications),
            Alert::error(
                "Failed to create application. Please check your input and try again.",
                Some("Creation Failed"),
            ),
        )
    }

    pub fn application_updated<T>(result: &ApiResult<T>, id: &str) -> Self {
        Self::of(
            result,
            Alert::success("Application updated successfully!", Some("Update Successful")),
            Some(Route::Application(id.to_string())),
            Alert::error(
                "Failed to update application. Please check your input and try again.",
                Some("Update Failed"),
            ),
        )
    }

    pub fn application_deleted<T>(result: &ApiResult<T>) -> Self {
        Self::of(
            result,
            Alert::success("Application deleted successfully!", Some("Application Deleted")),
            Some(Route::Applications),
            Alert::error("Failed to delete application.", Some("Delete Failed")),
        )
    }

    pub fn status_changed<T>(result: &ApiResult<T>, status: AppStatus) -> Self {
        let (message, verb) = match status {
            AppStatus::Running => ("Application started successfully!", "start"),
            AppStatus::Stopped => ("Application stopped successfully!", "stop"),
            AppStatus::Maintenance => ("Application set to maintenance mode!", "maintenance"),
        };
        Self::of(
            result,
            Alert::success(message, Some("Status Updated")),
            None,
            Alert::error(format!("Failed to {} application", verb), Some("Update Failed")),
        )
    }

    pub fn task_created<T>(result: &ApiResult<T>, description: &str) -> Self {
        Self::of(
            result,
            Alert::success(
                format!("Task \"{}\" has been created successfully!", description.trim()),
                Some("Task Created"),
            ),
            Some(Route::Tasks),
            Alert::error(
                "Failed to create task. Please check your input and try again.",
                Some("Creation Failed"),
            ),
        )
    }

    pub fn logs_deleted<T>(result: &ApiResult<T>, scope: LogDeletion) -> Self {
        let message = match scope {
            LogDeletion::One => "Log deleted successfully!".to_string(),
            LogDeletion::Selected(count) => format!("{} logs deleted successfully!", count),
            LogDeletion::All => "All logs deleted successfully!".to_string(),
        };
        let failure = match scope {
            LogDeletion::One => "Failed to delete log.",
            _ => "Failed to delete logs.",
        };
        Self::of(
            result,
            Alert::success(message, None),
            None,
            Alert::error(failure, Some("Delete Failed")),
        )
    }
}

/// Which logs a delete covered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDeletion {
    One,
    Selected(usize),
    All,
}

/// The single alert slot of a view; each alert hides itself after a delay
/// unless a newer one replaced it first
#[derive(Clone)]
pub struct AlertSlot {
    tx: watch::Sender<Option<Alert>>,
    shown: Arc<AtomicU64>,
    dismiss_after: Duration,
}

impl AlertSlot {
    pub fn new(dismiss_after: Duration) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            tx,
            shown: Arc::new(AtomicU64::new(0)),
            dismiss_after,
        }
    }

    pub fn current(&self) -> Option<Alert> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Alert>> {
        self.tx.subscribe()
    }

    pub fn show(&self, alert: Alert) -> JoinHandle<()> {
        let ticket = self.shown.fetch_add(1, Ordering::SeqCst) + 1;
        self.tx.send_replace(Some(alert));

        let tx = self.tx.clone();
        let shown = self.shown.clone();
        let delay = self.dismiss_after;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if shown.load(Ordering::SeqCst) == ticket {
                tx.send_replace(None);
            }
        })
    }

    pub fn hide(&self) {
        self.shown.fetch_add(1, Ordering::SeqCst);
        self.tx.send_replace(None);
    }
}

/// Delivers routes to the view after a fixed delay
#[derive(Clone)]
pub struct Navigator {
    tx: mpsc::UnboundedSender<Route>,
    delay: Duration,
}

impl Navigator {
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<Route>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, delay }, rx)
    }

    pub fn navigate_after(&self, route: Route) -> JoinHandle<()> {
        let tx = self.tx.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(route).is_err() {
                debug!("Navigation dropped, view is gone");
            }
        })
    }

    /// Show the outcome's alert and schedule its navigation, if any
    pub fn follow(&self, slot: &AlertSlot, outcome: Outcome) -> Option<JoinHandle<()>> {
        slot.show(outcome.alert);
        outcome.navigate.map(|route| self.navigate_after(route))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ValidationErrors;

    fn failed() -> ApiResult<()> {
        Err(ApiError::Http {
            status: 500,
            message: "boom".to_string(),
        })
    }

    #[test]
    fn test_created_messages() {
        let ok = Outcome::application_created(&Ok(()), "Storefront");
        assert!(ok.is_success());
        assert_eq!(ok.alert.message, "Application \"Storefront\" has been created successfully!");
        assert_eq!(ok.navigate, Some(Route::Applications));

        let err = Outcome::application_created(&failed(), "Storefront");
        assert_eq!(err.alert.kind, AlertKind::Error);
        assert_eq!(err.alert.title.as_deref(), Some("Creation Failed"));
        assert_eq!(err.navigate, None);
    }

    #[test]
    fn test_update_navigates_to_detail() {
        let ok = Outcome::application_updated(&Ok(()), "12");
        assert_eq!(ok.navigate.map(|r| r.path()), Some("/applications/12".to_string()));
    }

    #[test]
    fn test_log_delete_messages() {
        assert_eq!(
            Outcome::logs_deleted(&Ok(()), LogDeletion::Selected(3)).alert.message,
            "3 logs deleted successfully!"
        );
        assert_eq!(
            Outcome::logs_deleted(&Ok(()), LogDeletion::All).alert.message,
            "All logs deleted successfully!"
        );
        assert_eq!(
            Outcome::logs_deleted(&failed(), LogDeletion::One).alert.message,
            "Failed to delete log."
        );
    }

    #[test]
    fn test_validation_failure_becomes_warning() {
        let mut errors = ValidationErrors::new();
        errors.add("selection", "Please select logs to delete.");
        let result: ApiResult<()> = Err(ApiError::Validation(errors));

        let outcome = Outcome::logs_deleted(&result, LogDeletion::Selected(0));
        assert_eq!(outcome.alert.kind, AlertKind::Warning);
        assert_eq!(outcome.alert.message, "Please select logs to delete.");
    }

    #[tokio::test]
    async fn test_alert_hides_itself() {
        let slot = AlertSlot::new(Duration::from_millis(20));
        let handle = slot.show(Alert::info("Saved", None));
        assert!(slot.current().is_some());

        handle.await.unwrap();
        assert!(slot.current().is_none());
    }

    #[tokio::test]
    async fn test_newer_alert_outlives_older_timer() {
        let slot = AlertSlot::new(Duration::from_millis(30));
        let first = slot.show(Alert::info("first", None));
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = slot.show(Alert::info("second", None));

        first.await.unwrap();
        assert_eq!(slot.current().map(|a| a.message), Some("second".to_string()));
        second.await.unwrap();
        assert!(slot.current().is_none());
    }

    #[tokio::test]
    async fn test_navigation_is_delayed() {
        let (navigator, mut routes) = Navigator::new(Duration::from_millis(30));
        let slot = AlertSlot::new(Duration::from_secs(5));

        let started = tokio::time::Instant::now();
        let handle = navigator
            .follow(&slot, Outcome::task_created(&Ok(()), "Write docs"))
            .unwrap();
        assert!(routes.try_recv().is_err());

        handle.await.unwrap();
        assert_eq!(routes.recv().await, Some(Route::Tasks));
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert_eq!(slot.current().map(|a| a.kind), Some(AlertKind::Success));
    }

    #[tokio::test]
    async fn test_failed_outcome_does_not_navigate() {
        let (navigator, _routes) = Navigator::new(Duration::from_millis(1));
        let slot = AlertSlot::new(Duration::from_secs(5));
        assert!(navigator.follow(&slot, Outcome::task_created(&failed(), "x")).is_none());
    }
}
