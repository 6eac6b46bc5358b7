//! AppHub CLI
//!
//! Command-line front-end for the dashboard:
//! - Dashboard summary
//! - Applications, logs, tasks and reviews
//! - System stats and backend health
//! - Config file generation

mod commands;
pub mod output;

pub use commands::run;
pub use output::OutputFormat;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::api::models::{AppStatus, LogType, Priority, TaskStatus};

#[derive(Debug, Parser)]
#[command(name = "apphub")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Admin console for AppHub applications, logs, tasks and reviews")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.config/apphub/config.toml, then ./apphub.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// API base URL, overriding the config file
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,

    /// Disable coloured table output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// After a successful change, wait for the navigation delay and show the next view
    #[arg(long, global = true)]
    pub follow: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Headline counters, status distribution and log trend
    Dashboard {
        /// Trailing window in days (default from config)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Manage applications
    Apps {
        #[command(subcommand)]
        command: AppsCommand,
    },

    /// Browse and delete logs
    Logs {
        #[command(subcommand)]
        command: LogsCommand,
    },

    /// List and add tasks
    Tasks {
        #[command(subcommand)]
        command: TasksCommand,
    },

    /// Browse reviews
    Reviews {
        #[command(subcommand)]
        command: ReviewsCommand,
    },

    /// System stats, log analytics and trends
    System {
        #[arg(long)]
        days: Option<u32>,
    },

    /// Check backend health
    Health,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum AppsCommand {
    /// List applications
    List {
        /// Only applications in this status
        #[arg(long)]
        status: Option<AppStatus>,
    },

    /// Show one application
    Show { id: String },

    /// Change an application's status (running, stopped, maintenance)
    Status { id: String, status: AppStatus },

    /// Ping an application
    Ping { id: String },

    /// Delete an application
    Delete { id: String },

    /// Create an application
    Create {
        #[command(flatten)]
        fields: ApplicationArgs,
    },

    /// Update an application
    Update {
        id: String,

        #[command(flatten)]
        fields: ApplicationArgs,

        /// Send a JSON patch of the given fields instead of the full form
        #[arg(long)]
        patch: bool,
    },
}

/// Application form fields; unset fields keep their current value on update
#[derive(Debug, Clone, Default, Args)]
pub struct ApplicationArgs {
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Card background
    #[arg(long)]
    pub bg: Option<String>,

    #[arg(long)]
    pub link: Option<String>,

    /// Comma-separated tech stack
    #[arg(long, value_delimiter = ',')]
    pub stacks: Option<Vec<String>>,

    #[arg(long)]
    pub on_going: Option<bool>,

    #[arg(long)]
    pub status: Option<AppStatus>,

    #[arg(long)]
    pub backend_url: Option<String>,

    #[arg(long)]
    pub frontend_url: Option<String>,

    #[arg(long)]
    pub github_url: Option<String>,

    /// Small image to upload (repeatable)
    #[arg(long = "small-image")]
    pub small_images: Vec<PathBuf>,

    /// Large image to upload (repeatable)
    #[arg(long = "large-image")]
    pub large_images: Vec<PathBuf>,
}

/// Paging flags shared by list commands
#[derive(Debug, Clone, Args)]
pub struct PageArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Rows per page (default from config)
    #[arg(long)]
    pub page_size: Option<u32>,
}

#[derive(Debug, Subcommand)]
pub enum LogsCommand {
    /// List logs
    List {
        /// Free-text search
        #[arg(short, long)]
        search: Option<String>,

        /// success, error, warning or info
        #[arg(short = 't', long = "type")]
        log_type: Option<LogType>,

        /// Application id
        #[arg(long)]
        app: Option<String>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        #[command(flatten)]
        paging: PageArgs,
    },

    /// Delete one log
    Delete { id: String },

    /// Delete several logs
    DeleteBulk {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Delete every log
    DeleteAll {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum TasksCommand {
    /// List tasks
    List {
        /// Search task descriptions on the fetched page
        #[arg(short, long)]
        search: Option<String>,

        /// pending, inprogress or done
        #[arg(long)]
        status: Option<TaskStatus>,

        #[arg(long)]
        app: Option<String>,

        #[command(flatten)]
        paging: PageArgs,
    },

    /// Add a task
    Add {
        /// Application id
        #[arg(long)]
        app: String,

        #[arg(long)]
        description: String,

        /// Deadline (YYYY-MM-DD)
        #[arg(long)]
        deadline: Option<NaiveDate>,

        #[arg(long, default_value_t = TaskStatus::Pending)]
        status: TaskStatus,

        #[arg(long, default_value_t = Priority::Medium)]
        priority: Priority,
    },
}

#[derive(Debug, Subcommand)]
pub enum ReviewsCommand {
    /// List reviews
    List {
        #[arg(short, long)]
        search: Option<String>,

        /// Star rating, 1 to 5
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        rating: Option<u8>,

        #[arg(long)]
        app: Option<String>,

        #[command(flatten)]
        paging: PageArgs,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_log_list() {
        let cli = Cli::try_parse_from([
            "apphub", "logs", "list", "--type", "error", "--page", "3", "--from", "2024-05-01", "-f", "csv",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Csv);
        match cli.command {
            Commands::Logs {
                command: LogsCommand::List { log_type, paging, from, .. },
            } => {
                assert_eq!(log_type, Some(LogType::Error));
                assert_eq!(paging.page, 3);
                assert_eq!(from, NaiveDate::from_ymd_opt(2024, 5, 1));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_create_with_images() {
        let cli = Cli::try_parse_from([
            "apphub", "apps", "create", "--name", "Shop", "--stacks", "rust,axum",
            "--small-image", "a.png", "--small-image", "b.png", "--large-image", "c.png",
        ])
        .unwrap();

        match cli.command {
            Commands::Apps {
                command: AppsCommand::Create { fields },
            } => {
                assert_eq!(fields.stacks, Some(vec!["rust".to_string(), "axum".to_string()]));
                assert_eq!(fields.small_images.len(), 2);
                assert_eq!(fields.large_images.len(), 1);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_status() {
        assert!(Cli::try_parse_from(["apphub", "apps", "status", "1", "paused"]).is_err());
        assert!(Cli::try_parse_from(["apphub", "reviews", "list", "--rating", "6"]).is_err());
    }
}
