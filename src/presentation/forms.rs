//! Form drafts and their validation
//!
//! A draft holds what the user typed; `validate` either produces the
//! request body or a per-field error map that blocks submission.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

use crate::api::models::{Priority, TaskStatus};
use crate::api::{NewTask, ValidationErrors};

/// The add-task form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub app_id: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub date_to_finish: Option<NaiveDate>,
}

impl TaskDraft {
    pub fn validate(&self) -> Result<NewTask, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.app_id.trim().is_empty() {
            errors.add("appId", "Please select an application");
        }
        if self.description.trim().is_empty() {
            errors.add("description", "Task description is required");
        }
        let Some(date_to_finish) = self.date_to_finish else {
            errors.add("dateToFinish", "Deadline is required");
            return Err(errors);
        };
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(NewTask {
            app_id: self.app_id.trim().to_string(),
            description: self.description.trim().to_string(),
            status: self.status,
            date_to_finish,
            priority: self.priority,
        })
    }
}

fn looks_like_email(text: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"\S+@\S+\.\S+").ok())
        .as_ref()
        .map_or(false, |re| re.is_match(text))
}

/// Minimum password length accepted by the login form
pub const MIN_PASSWORD_LEN: usize = 6;

/// The login form. Validation only; nothing is authenticated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.email.trim().is_empty() {
            errors.add("email", "Email is required");
        } else if !looks_like_email(&self.email) {
            errors.add("email", "Please enter a valid email address");
        }

        if self.password.is_empty() {
            errors.add("password", "Password is required");
        } else if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.add("password", "Password must be at least 6 characters long");
        }

        errors.into_result(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> TaskDraft {
        TaskDraft {
            app_id: "a1".to_string(),
            description: "  Renew TLS certificate ".to_string(),
            date_to_finish: NaiveDate::from_ymd_opt(2024, 9, 1),
            ..TaskDraft::default()
        }
    }

    #[test]
    fn test_valid_task_draft() {
        let task = draft().validate().unwrap();
        assert_eq!(task.description, "Renew TLS certificate");
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, Priority::Medium);
    }

    #[test]
    fn test_task_draft_reports_every_missing_field() {
        let errors = TaskDraft::default().validate().unwrap_err();
        assert_eq!(errors.get("appId"), Some("Please select an application"));
        assert_eq!(errors.get("description"), Some("Task description is required"));
        assert_eq!(errors.get("dateToFinish"), Some("Deadline is required"));
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_blank_description_rejected() {
        let mut task = draft();
        task.description = "   ".to_string();
        let errors = task.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.get("description").is_some());
    }

    #[test]
    fn test_login_validation() {
        let empty = LoginForm::default().validate().unwrap_err();
        assert_eq!(empty.get("email"), Some("Email is required"));
        assert_eq!(empty.get("password"), Some("Password is required"));

        let bad = LoginForm {
            email: "admin@localhost".to_string(),
            password: "12345".to_string(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(bad.get("email"), Some("Please enter a valid email address"));
        assert_eq!(bad.get("password"), Some("Password must be at least 6 characters long"));

        let good = LoginForm {
            email: "admin@apphub.dev".to_string(),
            password: "hunter22".to_string(),
        };
        assert!(good.validate().is_ok());
    }
}
