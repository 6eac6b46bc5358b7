//! Presentation models
//!
//! Everything a view needs besides raw data:
//!
//! - **status**: status → label, tone and icon
//! - **dashboard**: headline counters, status slices, trend points
//! - **forms**: task and login drafts with validation
//! - **alert**: mutation outcomes, self-dismissing alerts, delayed navigation
//! - **routes**: the route table with its redirects

pub mod alert;
pub mod dashboard;
pub mod forms;
pub mod routes;
pub mod status;

pub use alert::{Alert, AlertKind, AlertSlot, LogDeletion, Navigator, Outcome};
pub use dashboard::{load_dashboard, Dashboard, ReviewSummary, StatusSlice, TrendPoint};
pub use forms::{LoginForm, TaskDraft};
pub use routes::Route;
pub use status::{StatusVisual, Tone, UptimeHealth, Visual};
