//! Route table
//!
//! `/` redirects to the dashboard and unknown paths redirect to the login
//! page.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Dashboard,
    Applications,
    AddApplication,
    Application(String),
    EditApplication(String),
    Logs,
    Tasks,
    AddTask,
    Reviews,
    System,
    Login,
}

impl Route {
    /// Exact match against the table, no redirects
    pub fn match_path(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let route = match segments.as_slice() {
            ["dashboard"] => Route::Dashboard,
            ["applications"] => Route::Applications,
            ["applications", "add"] => Route::AddApplication,
            ["applications", id] => Route::Application(id.to_string()),
            ["applications", id, "edit"] => Route::EditApplication(id.to_string()),
            ["logs"] => Route::Logs,
            ["tasks"] => Route::Tasks,
            ["tasks", "add"] => Route::AddTask,
            ["reviews"] => Route::Reviews,
            ["system"] => Route::System,
            ["login"] => Route::Login,
            _ => return None,
        };
        Some(route)
    }

    /// Where a path ends up after redirects
    pub fn resolve(path: &str) -> Route {
        if path.trim_matches('/').is_empty() {
            return Route::Dashboard;
        }
        Self::match_path(path).unwrap_or(Route::Login)
    }

    pub fn path(&self) -> String {
        match self {
            Route::Dashboard => "/dashboard".to_string(),
            Route::Applications => "/applications".to_string(),
            Route::AddApplication => "/applications/add".to_string(),
            Route::Application(id) => format!("/applications/{}", id),
            Route::EditApplication(id) => format!("/applications/{}/edit", id),
            Route::Logs => "/logs".to_string(),
            Route::Tasks => "/tasks".to_string(),
            Route::AddTask => "/tasks/add".to_string(),
            Route::Reviews => "/reviews".to_string(),
            Route::System => "/system".to_string(),
            Route::Login => "/login".to_string(),
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Dashboard => "Dashboard",
            Route::Applications => "Applications",
            Route::AddApplication => "Add Application",
            Route::Application(_) => "Application Details",
            Route::EditApplication(_) => "Edit Application",
            Route::Logs => "Logs",
            Route::Tasks => "Tasks",
            Route::AddTask => "Add Task",
            Route::Reviews => "Reviews",
            Route::System => "System",
            Route::Login => "Login",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_paths() {
        assert_eq!(Route::resolve("/applications/add"), Route::AddApplication);
        assert_eq!(Route::resolve("/applications/42"), Route::Application("42".to_string()));
        assert_eq!(
            Route::resolve("/applications/42/edit/"),
            Route::EditApplication("42".to_string())
        );
        assert_eq!(Route::resolve("/tasks/add"), Route::AddTask);
        assert_eq!(Route::resolve("/logs?page=2"), Route::Logs);
    }

    #[test]
    fn test_redirects() {
        assert_eq!(Route::resolve("/"), Route::Dashboard);
        assert_eq!(Route::resolve(""), Route::Dashboard);
        assert_eq!(Route::resolve("/settings"), Route::Login);
        assert_eq!(Route::resolve("/tasks/add/extra"), Route::Login);
        assert_eq!(Route::match_path("/settings"), None);
    }

    #[test]
    fn test_path_inverts_resolve() {
        let routes = [
            Route::Dashboard,
            Route::Application("7".to_string()),
            Route::EditApplication("7".to_string()),
            Route::AddTask,
            Route::System,
        ];
        for route in routes {
            assert_eq!(Route::resolve(&route.path()), route);
        }
    }
}
