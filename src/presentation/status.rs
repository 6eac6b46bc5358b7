//! Status → visual mappings
//!
//! One pure mapping per status domain. Views pick colours and icons from
//! here and never branch on raw status strings.

use serde::Serialize;

use crate::api::models::{AppStatus, LogType, Priority, Rating, TaskStatus};

/// Colour family shared by badges, icons and chart series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Positive,
    Negative,
    Caution,
    Informative,
    Neutral,
}

impl Tone {
    /// Chart colour
    pub fn hex(&self) -> &'static str {
        match self {
            Tone::Positive => "#10b981",
            Tone::Negative => "#ef4444",
            Tone::Caution => "#f59e0b",
            Tone::Informative => "#3b82f6",
            Tone::Neutral => "#6b7280",
        }
    }

    /// ANSI foreground colour code for terminal output
    pub fn ansi(&self) -> u8 {
        match self {
            Tone::Positive => 32,
            Tone::Negative => 31,
            Tone::Caution => 33,
            Tone::Informative => 34,
            Tone::Neutral => 90,
        }
    }

    pub fn paint(&self, text: &str) -> String {
        format!("\x1b[{}m{}\x1b[0m", self.ansi(), text)
    }
}

/// How a status value is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusVisual {
    pub label: &'static str,
    pub tone: Tone,
    pub icon: &'static str,
}

impl StatusVisual {
    const fn new(label: &'static str, tone: Tone, icon: &'static str) -> Self {
        Self { label, tone, icon }
    }
}

/// A status domain with a fixed visual per value
pub trait Visual {
    fn visual(&self) -> StatusVisual;
}

impl Visual for AppStatus {
    fn visual(&self) -> StatusVisual {
        match self {
            AppStatus::Running => StatusVisual::new("Running", Tone::Positive, "▲"),
            AppStatus::Stopped => StatusVisual::new("Stopped", Tone::Negative, "●"),
            AppStatus::Maintenance => StatusVisual::new("Maintenance", Tone::Caution, "◷"),
        }
    }
}

impl Visual for LogType {
    fn visual(&self) -> StatusVisual {
        match self {
            LogType::Success => StatusVisual::new("Success", Tone::Positive, "✓"),
            LogType::Error => StatusVisual::new("Error", Tone::Negative, "✗"),
            LogType::Warning => StatusVisual::new("Warning", Tone::Caution, "!"),
            LogType::Info => StatusVisual::new("Info", Tone::Informative, "i"),
        }
    }
}

impl Visual for TaskStatus {
    fn visual(&self) -> StatusVisual {
        match self {
            TaskStatus::Pending => StatusVisual::new("Pending", Tone::Neutral, "⏸"),
            TaskStatus::InProgress => StatusVisual::new("In Progress", Tone::Informative, "⏳"),
            TaskStatus::Done => StatusVisual::new("Completed", Tone::Positive, "✓"),
        }
    }
}

impl Visual for Priority {
    fn visual(&self) -> StatusVisual {
        match self {
            Priority::Low => StatusVisual::new("Low", Tone::Neutral, "↓"),
            Priority::Medium => StatusVisual::new("Medium", Tone::Informative, "→"),
            Priority::High => StatusVisual::new("High", Tone::Caution, "↑"),
            Priority::Urgent => StatusVisual::new("Urgent", Tone::Negative, "‼"),
        }
    }
}

impl Visual for Rating {
    fn visual(&self) -> StatusVisual {
        match self.value() {
            5 => StatusVisual::new("Excellent", Tone::Positive, "★"),
            4 => StatusVisual::new("Good", Tone::Positive, "★"),
            3 => StatusVisual::new("Average", Tone::Caution, "★"),
            2 => StatusVisual::new("Poor", Tone::Negative, "★"),
            _ => StatusVisual::new("Terrible", Tone::Negative, "★"),
        }
    }
}

/// Five-character star bar, e.g. `★★★☆☆`
pub fn stars(rating: Rating) -> String {
    let filled = rating.value() as usize;
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

/// Uptime band of an application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UptimeHealth {
    Healthy,
    Degraded,
    Critical,
}

impl UptimeHealth {
    /// ≥ 99 healthy, ≥ 95 degraded, anything lower critical
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 99.0 {
            UptimeHealth::Healthy
        } else if percentage >= 95.0 {
            UptimeHealth::Degraded
        } else {
            UptimeHealth::Critical
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            UptimeHealth::Healthy => Tone::Positive,
            UptimeHealth::Degraded => Tone::Caution,
            UptimeHealth::Critical => Tone::Negative,
        }
    }
}

/// Colour for an HTTP method badge
pub fn method_tone(method: &str) -> Tone {
    match method.to_ascii_uppercase().as_str() {
        "GET" => Tone::Positive,
        "POST" => Tone::Informative,
        "PUT" | "PATCH" => Tone::Caution,
        "DELETE" => Tone::Negative,
        _ => Tone::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_status_has_a_label() {
        for status in AppStatus::ALL {
            assert!(!status.visual().label.is_empty());
        }
        for log_type in LogType::ALL {
            assert!(!log_type.visual().label.is_empty());
        }
        assert_eq!(TaskStatus::InProgress.visual().label, "In Progress");
        assert_eq!(TaskStatus::Done.visual().tone, Tone::Positive);
    }

    #[test]
    fn test_app_status_colours_match_chart_slices() {
        assert_eq!(AppStatus::Running.visual().tone.hex(), "#10b981");
        assert_eq!(AppStatus::Stopped.visual().tone.hex(), "#ef4444");
        assert_eq!(AppStatus::Maintenance.visual().tone.hex(), "#f59e0b");
    }

    #[test]
    fn test_uptime_thresholds() {
        assert_eq!(UptimeHealth::from_percentage(100.0), UptimeHealth::Healthy);
        assert_eq!(UptimeHealth::from_percentage(99.0), UptimeHealth::Healthy);
        assert_eq!(UptimeHealth::from_percentage(98.9), UptimeHealth::Degraded);
        assert_eq!(UptimeHealth::from_percentage(95.0), UptimeHealth::Degraded);
        assert_eq!(UptimeHealth::from_percentage(94.9), UptimeHealth::Critical);
    }

    #[test]
    fn test_stars() {
        assert_eq!(stars(Rating::new(3).unwrap()), "★★★☆☆");
        assert_eq!(stars(Rating::new(5).unwrap()), "★★★★★");
    }

    #[test]
    fn test_method_tone() {
        assert_eq!(method_tone("get"), Tone::Positive);
        assert_eq!(method_tone("DELETE"), Tone::Negative);
        assert_eq!(method_tone("OPTIONS"), Tone::Neutral);
    }
}
