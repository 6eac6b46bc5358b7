use anyhow::{bail, Context as _};
use std::io::{IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

use super::output::{page_footer, render, render_value, OutputFormat, Tabular};
use super::{
    AppsCommand, ApplicationArgs, Cli, Commands, LogsCommand, PageArgs, ReviewsCommand, TasksCommand,
};
use crate::api::models::{AppStatus, Application, LogType, Rating, TaskStatus};
use crate::api::{
    ApiClient, ApiClientConfig, ApiResult, ApplicationForm, ApplicationPatch, CategoryFilter,
    DateRange, ImageUpload, Page,
};
use crate::config::{generate_default_config, Config, UiConfig};
use crate::controller::{ListController, ListFilters, ListSource, ListView};
use crate::presentation::status::{Tone, UptimeHealth, Visual};
use crate::presentation::{
    load_dashboard, Alert, AlertKind, AlertSlot, LogDeletion, Navigator, Outcome, ReviewSummary,
    Route, TaskDraft,
};
use crate::query::{QueryCache, QueryOptions};
use crate::resources::Resources;

/// Run one CLI invocation against the backend named in `config`
pub async fn run(cli: Cli, mut config: Config) -> anyhow::Result<()> {
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }

    if let Commands::Config { output } = &cli.command {
        return write_config(output.as_deref());
    }

    let color = !cli.no_color && cli.format == OutputFormat::Table && std::io::stdout().is_terminal();
    let mut ctx = Console::new(&config, cli.format, color, cli.follow)?;

    match cli.command {
        Commands::Dashboard { days } => ctx.dashboard(days.unwrap_or(config.ui.analytics_days)).await,
        Commands::Apps { command } => ctx.apps(command).await,
        Commands::Logs { command } => ctx.logs(command).await,
        Commands::Tasks { command } => ctx.tasks(command).await,
        Commands::Reviews { command } => ctx.reviews(command).await,
        Commands::System { days } => ctx.system(days.unwrap_or(config.ui.analytics_days)).await,
        Commands::Health => ctx.health().await,
        Commands::Config { .. } => Ok(()),
    }
}

fn write_config(path: Option<&std::path::Path>) -> anyhow::Result<()> {
    let config = generate_default_config();
    match path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &config)?;
            println!("Config written to {:?}", path);
        }
        None => print!("{}", config),
    }
    Ok(())
}

struct Console {
    resources: Resources,
    ui: UiConfig,
    format: OutputFormat,
    color: bool,
    follow: bool,
    alerts: AlertSlot,
    navigator: Navigator,
    routes: UnboundedReceiver<Route>,
}

impl Console {
    fn new(config: &Config, format: OutputFormat, color: bool, follow: bool) -> anyhow::Result<Self> {
        let client = ApiClient::new(ApiClientConfig::from(&config.api))
            .context("Failed to build HTTP client")?;
        let cache = QueryCache::new(QueryOptions::from(&config.cache));
        let (navigator, routes) = Navigator::new(Duration::from_millis(config.ui.navigate_delay_ms));

        Ok(Self {
            resources: Resources::new(Arc::new(client), cache),
            ui: config.ui.clone(),
            format,
            color,
            follow,
            alerts: AlertSlot::new(Duration::from_millis(config.ui.alert_dismiss_ms)),
            navigator,
            routes,
        })
    }

    fn paint(&self, text: &str, tone: Tone) -> String {
        if self.color {
            tone.paint(text)
        } else {
            text.to_string()
        }
    }

    fn print_rows<T: Tabular>(&self, rows: &[T]) -> anyhow::Result<()> {
        let mut out = std::io::stdout().lock();
        render(&mut out, rows, self.format, self.color)?;
        Ok(())
    }

    fn print_value<T: serde::Serialize>(&self, value: &T) -> anyhow::Result<()> {
        let mut out = std::io::stdout().lock();
        render_value(&mut out, value)?;
        Ok(())
    }

    fn print_alert(&self, alert: &Alert) {
        let text = self.paint(&alert.to_string(), alert.kind.tone());
        if alert.kind == AlertKind::Success {
            println!("{}", text);
        } else {
            eprintln!("{}", text);
        }
    }

    /// Show the mutation's alert, then with `--follow` open the next view
    /// once the navigation delay has passed
    async fn conclude<T>(&mut self, outcome: Outcome, result: ApiResult<T>) -> anyhow::Result<T> {
        let navigation = self.navigator.follow(&self.alerts, outcome);
        if let Some(alert) = self.alerts.current() {
            self.print_alert(&alert);
        }
        let value = result?;

        if let Some(handle) = navigation {
            if self.follow {
                handle.await?;
                if let Some(route) = self.routes.recv().await {
                    self.open(route).await?;
                }
            } else {
                debug!("Skipping navigation, --follow not set");
                handle.abort();
            }
        }
        Ok(value)
    }

    async fn open(&mut self, route: Route) -> anyhow::Result<()> {
        println!();
        println!("{}", route.title());
        match route {
            Route::Applications => self.list_apps(None).await,
            Route::Application(id) => self.show_app(&id).await,
            Route::Tasks => {
                let paging = PageArgs {
                    page: 1,
                    page_size: None,
                };
                self.list_tasks(None, None, None, paging).await
            }
            other => {
                println!("{}", other.path());
                Ok(())
            }
        }
    }

    // ============ Dashboard ============

    async fn dashboard(&mut self, days: u32) -> anyhow::Result<()> {
        let dashboard = load_dashboard(&self.resources, days).await;

        if self.format == OutputFormat::Json {
            return self.print_value(&serde_json::json!({
                "stats": dashboard.stats,
                "statusDistribution": dashboard.slices,
                "averageUptime": dashboard.average_uptime,
                "running": dashboard.running,
                "totalApplications": dashboard.total_applications,
                "trend": dashboard.trend,
                "recent": dashboard.recent,
                "errors": dashboard.errors.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
            }));
        }

        let stats = &dashboard.stats;
        println!(
            "Applications {}   Logs {}   Tasks {}   Reviews {}",
            stats.applications, stats.logs, stats.tasks, stats.reviews
        );
        let uptime = UptimeHealth::from_percentage(dashboard.average_uptime);
        println!(
            "Running {} of {}   Average uptime {}",
            dashboard.running,
            dashboard.total_applications,
            self.paint(&format!("{:.1}%", dashboard.average_uptime), uptime.tone())
        );

        if !dashboard.slices.is_empty() {
            println!();
            println!("Status");
            let total: u64 = dashboard.slices.iter().map(|s| s.value).sum();
            for slice in &dashboard.slices {
                let share = slice.value as f64 * 100.0 / total.max(1) as f64;
                println!("  {:<12} {:>4}  {:>3.0}%", slice.name, slice.value, share);
            }
        }

        println!();
        println!("Log trend (last {} days)", days);
        if dashboard.trend.is_empty() {
            println!("  No log activity recorded.");
        } else {
            println!("  {:<4} {:<10} {:>8} {:>6} {:>8} {:>6}", "Day", "Date", "Success", "Error", "Warning", "Info");
            for point in &dashboard.trend {
                println!(
                    "  {:<4} {:<10} {:>8} {:>6} {:>8} {:>6}",
                    point.day, point.date, point.success, point.error, point.warning, point.info
                );
            }
        }

        if !dashboard.recent.is_empty() {
            println!();
            println!("Recent applications");
            self.print_rows(&dashboard.recent)?;
        }

        for error in &dashboard.errors {
            eprintln!("{}", self.paint(&format!("warning: {}", error), Tone::Caution));
        }
        Ok(())
    }

    // ============ Applications ============

    async fn apps(&mut self, command: AppsCommand) -> anyhow::Result<()> {
        match command {
            AppsCommand::List { status } => self.list_apps(status).await,
            AppsCommand::Show { id } => self.show_app(&id).await,
            AppsCommand::Status { id, status } => {
                let result = self.resources.set_application_status(&id, status).await;
                self.conclude(Outcome::status_changed(&result, status), result).await
            }
            AppsCommand::Ping { id } => {
                let reply = self.resources.ping_application(&id).await?;
                self.print_value(&reply)
            }
            AppsCommand::Delete { id } => {
                let result = self.resources.delete_application(&id).await;
                self.conclude(Outcome::application_deleted(&result), result).await
            }
            AppsCommand::Create { fields } => {
                let mut form = ApplicationForm::default();
                apply_fields(&mut form, &fields).await?;
                let result = self.resources.create_application(&form).await;
                let created = self
                    .conclude(Outcome::application_created(&result, &form.name), result)
                    .await?;
                if self.format == OutputFormat::Json {
                    self.print_value(&created)?;
                }
                Ok(())
            }
            AppsCommand::Update { id, fields, patch } => {
                let result = if patch {
                    self.resources
                        .update_application_json(&id, &patch_from(&fields))
                        .await
                } else {
                    let current = self.resources.application(&id).await.into_result()?;
                    let mut form = ApplicationForm::from_application(&current);
                    apply_fields(&mut form, &fields).await?;
                    self.resources.update_application(&id, &form).await
                };
                self.conclude(Outcome::application_updated(&result, &id), result).await?;
                Ok(())
            }
        }
    }

    async fn list_apps(&mut self, status: Option<AppStatus>) -> anyhow::Result<()> {
        let apps = self.resources.applications().await.into_result()?;
        let rows: Vec<Application> = apps
            .iter()
            .filter(|app| status.map_or(true, |s| app.status == s))
            .cloned()
            .collect();
        self.print_rows(&rows)
    }

    async fn show_app(&mut self, id: &str) -> anyhow::Result<()> {
        let app = self.resources.application(id).await.into_result()?;
        if self.format != OutputFormat::Table {
            return self.print_value(&*app);
        }

        let status = app.status.visual();
        let uptime = app.uptime_percentage();
        let health = UptimeHealth::from_percentage(uptime);
        let field = |label: &str, value: &str| {
            println!("{:<14}{}", format!("{}:", label), if value.is_empty() { "-" } else { value });
        };

        field("Name", &app.name);
        field("App ID", &app.app_id);
        field("Status", &self.paint(&format!("{} {}", status.icon, status.label), status.tone));
        field("Uptime", &self.paint(&format!("{:.1}%", uptime), health.tone()));
        field("Ongoing", if app.on_going { "yes" } else { "no" });
        field("Description", &app.description);
        field("Stacks", &app.stacks.join(", "));
        field("Link", &app.link);
        field("Frontend", &app.frontend_url);
        field("Backend", &app.backend_url);
        field("GitHub", &app.github_url);
        field(
            "Images",
            &format!("{} small, {} large", app.images.small.len(), app.images.large.len()),
        );
        field(
            "Last checked",
            &app.last_checked
                .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
                .unwrap_or_default(),
        );
        Ok(())
    }

    // ============ Logs ============

    async fn logs(&mut self, command: LogsCommand) -> anyhow::Result<()> {
        match command {
            LogsCommand::List {
                search,
                log_type,
                app,
                from,
                to,
                paging,
            } => {
                let mut controller = self.controller(paging.page_size, self.ui.logs_page_size, app);
                if let Some(search) = search {
                    controller.set_search(search);
                }
                controller.set_category(log_type);
                if from.is_some() || to.is_some() {
                    controller.set_date_range(DateRange::new(from, to));
                }
                controller.set_page(paging.page);

                let view = self.load(controller).await?;
                self.print_rows(view.items())?;
                if self.format == OutputFormat::Table {
                    if let Some(counts) = view.counts() {
                        let summary: Vec<String> = LogType::ALL
                            .iter()
                            .map(|t| {
                                let visual = t.visual();
                                self.paint(&format!("{} {}", visual.label, counts.of(*t)), visual.tone)
                            })
                            .collect();
                        println!("{}", summary.join("  "));
                    }
                    self.print_footer(view.page())?;
                }
                Ok(())
            }
            LogsCommand::Delete { id } => {
                let result = self.resources.delete_log(&id).await;
                self.conclude(Outcome::logs_deleted(&result, LogDeletion::One), result).await
            }
            LogsCommand::DeleteBulk { ids } => {
                let mut controller = ListController::<LogType>::new(self.ui.logs_page_size);
                controller.select_all(ids.iter().map(String::as_str), true);
                let count = controller.selection_len();
                let result = self.resources.delete_selected_logs(&mut controller).await;
                self.conclude(Outcome::logs_deleted(&result, LogDeletion::Selected(count)), result)
                    .await?;
                Ok(())
            }
            LogsCommand::DeleteAll { yes } => {
                if !yes {
                    bail!("Refusing to delete every log without --yes");
                }
                let result = self.resources.delete_all_logs().await;
                self.conclude(Outcome::logs_deleted(&result, LogDeletion::All), result).await
            }
        }
    }

    // ============ Tasks ============

    async fn tasks(&mut self, command: TasksCommand) -> anyhow::Result<()> {
        match command {
            TasksCommand::List {
                search,
                status,
                app,
                paging,
            } => self.list_tasks(search, status, app, paging).await,
            TasksCommand::Add {
                app,
                description,
                deadline,
                status,
                priority,
            } => {
                let draft = TaskDraft {
                    app_id: app,
                    description,
                    status,
                    priority,
                    date_to_finish: deadline,
                };
                let result = match draft.validate() {
                    Ok(task) => self.resources.create_task(&task).await,
                    Err(errors) => Err(errors.into()),
                };
                let created = self
                    .conclude(Outcome::task_created(&result, &draft.description), result)
                    .await?;
                if self.format == OutputFormat::Json {
                    self.print_value(&created)?;
                }
                Ok(())
            }
        }
    }

    async fn list_tasks(
        &mut self,
        search: Option<String>,
        status: Option<TaskStatus>,
        app: Option<String>,
        paging: PageArgs,
    ) -> anyhow::Result<()> {
        let mut controller = self.controller(paging.page_size, self.ui.tasks_page_size, app);
        controller.set_category(status);
        controller.set_page(paging.page);

        let view = self.load(controller).await?;
        // task search runs over the fetched page only
        let mut local = view.controller().clone();
        if let Some(search) = search {
            local.set_search(search);
        }
        let rows: Vec<_> = local.filter_local(view.items()).into_iter().cloned().collect();
        self.print_rows(&rows)?;

        if self.format == OutputFormat::Table {
            if let Some(counts) = view.counts() {
                let summary: Vec<String> = TaskStatus::ALL
                    .iter()
                    .map(|s| format!("{} {}", s.visual().label, counts.of(*s)))
                    .collect();
                println!("{}", summary.join("  "));
            }
            self.print_footer(view.page())?;
        }
        Ok(())
    }

    // ============ Reviews ============

    async fn reviews(&mut self, command: ReviewsCommand) -> anyhow::Result<()> {
        let ReviewsCommand::List {
            search,
            rating,
            app,
            paging,
        } = command;

        let mut controller = self.controller(paging.page_size, self.ui.reviews_page_size, app);
        if let Some(search) = search {
            controller.set_search(search);
        }
        controller.set_category(rating.and_then(Rating::new));
        controller.set_page(paging.page);

        let view = self.load(controller).await?;
        self.print_rows(view.items())?;
        if self.format == OutputFormat::Table {
            if let Some(stats) = view.counts() {
                let summary = ReviewSummary::from_stats(stats);
                println!(
                    "★ {} average   {} reviews   {} five-star   {} low",
                    summary.average_label(),
                    summary.total,
                    summary.five_star,
                    summary.low
                );
            }
            self.print_footer(view.page())?;
        }
        Ok(())
    }

    // ============ System ============

    async fn system(&mut self, days: u32) -> anyhow::Result<()> {
        let (stats, analytics, trends) = tokio::join!(
            self.resources.system_stats(),
            self.resources.log_analytics(days),
            self.resources.log_trends(days),
        );
        for error in [&stats.error, &analytics.error].into_iter().flatten() {
            eprintln!("{}", self.paint(&format!("warning: {}", error), Tone::Caution));
        }
        let stats = stats.data.unwrap_or_default();
        let analytics = analytics.data.unwrap_or_default();

        if self.format == OutputFormat::Json {
            return self.print_value(&serde_json::json!({
                "stats": *stats,
                "analytics": *analytics,
                "trends": trends.data.as_deref(),
            }));
        }

        println!("Applications {}", stats.applications);
        println!("Logs         {}", stats.logs);
        println!("Tasks        {}", stats.tasks);
        println!("Reviews      {}", stats.reviews);
        println!();
        println!("Logs in the last {} days: {}", days, analytics.total_logs);

        match (trends.data, trends.error) {
            (Some(trends), _) => {
                println!("Average per day: {:.1}", trends.summary.average_logs_per_day);
                for point in &trends.error_rate_trend {
                    println!(
                        "  {:<10} {:>5} errors / {:>6} total  ({:.1}%)",
                        point.date, point.error_count, point.total_count, point.error_rate
                    );
                }
            }
            (None, Some(error)) => eprintln!("{}", self.paint(&format!("warning: {}", error), Tone::Caution)),
            (None, None) => {}
        }
        Ok(())
    }

    async fn health(&mut self) -> anyhow::Result<()> {
        let health = self.resources.health().await.into_result()?;
        if self.format == OutputFormat::Json {
            return self.print_value(&*health);
        }
        let tone = if health.status.eq_ignore_ascii_case("ok") || health.status.eq_ignore_ascii_case("healthy") {
            Tone::Positive
        } else {
            Tone::Caution
        };
        println!("API Status: {}", self.paint(&health.status, tone));
        if let Some(timestamp) = &health.timestamp {
            println!("Checked at: {}", timestamp);
        }
        Ok(())
    }

    // ============ Helpers ============

    fn controller<C: CategoryFilter>(
        &self,
        page_size: Option<u32>,
        default_size: u32,
        app: Option<String>,
    ) -> ListController<C> {
        let filters = match app {
            Some(app) => ListFilters::for_app(app),
            None => ListFilters::default(),
        };
        ListController::with_filters(filters, page_size.unwrap_or(default_size))
    }

    /// Load the controller's page; an error with nothing to show fails the command
    async fn load<C>(&self, controller: ListController<C>) -> anyhow::Result<ListView<C, Resources>>
    where
        C: CategoryFilter,
        Resources: ListSource<C>,
    {
        let mut view = ListView::new(self.resources.clone(), controller);
        view.refresh().await;
        if let Some(error) = view.error() {
            if !view.is_loaded() {
                return Err(error.clone().into());
            }
            eprintln!("{}", self.paint(&format!("warning: showing cached page: {}", error), Tone::Caution));
        }
        Ok(view)
    }

    fn print_footer<T, C>(&self, page: Option<&Page<T, C>>) -> anyhow::Result<()> {
        if let Some(page) = page {
            let mut out = std::io::stdout().lock();
            writeln!(out, "{}", page_footer(&page.pagination))?;
        }
        Ok(())
    }
}

/// Copy the flags that were given onto the form and read any images
async fn apply_fields(form: &mut ApplicationForm, fields: &ApplicationArgs) -> anyhow::Result<()> {
    if let Some(name) = &fields.name {
        form.name = name.clone();
    }
    if let Some(description) = &fields.description {
        form.description = description.clone();
    }
    if let Some(bg) = &fields.bg {
        form.bg = bg.clone();
    }
    if let Some(link) = &fields.link {
        form.link = link.clone();
    }
    if let Some(stacks) = &fields.stacks {
        form.stacks = stacks.iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
    }
    if let Some(on_going) = fields.on_going {
        form.on_going = on_going;
    }
    if let Some(status) = fields.status {
        form.status = status;
    }
    if let Some(url) = &fields.backend_url {
        form.backend_url = url.clone();
    }
    if let Some(url) = &fields.frontend_url {
        form.frontend_url = url.clone();
    }
    if let Some(url) = &fields.github_url {
        form.github_url = url.clone();
    }

    for path in &fields.small_images {
        let image = ImageUpload::load(path)
            .await
            .with_context(|| format!("Failed to read image {:?}", path))?;
        form.small_images.push(image);
    }
    for path in &fields.large_images {
        let image = ImageUpload::load(path)
            .await
            .with_context(|| format!("Failed to read image {:?}", path))?;
        form.large_images.push(image);
    }
    Ok(())
}

fn patch_from(fields: &ApplicationArgs) -> ApplicationPatch {
    ApplicationPatch {
        name: fields.name.clone(),
        description: fields.description.clone(),
        link: fields.link.clone(),
        stacks: fields.stacks.as_ref().map(|s| s.join(", ")),
        on_going: fields.on_going,
        status: fields.status,
        backend_url: fields.backend_url.clone(),
        frontend_url: fields.frontend_url.clone(),
        github_url: fields.github_url.clone(),
    }
}
