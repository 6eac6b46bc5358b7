use serde::Serialize;
use std::fmt;

/// Hierarchical cache key, e.g. `["logs", "{\"page\":2,...}"]`.
///
/// Prefix matching is segment-wise: `["logs"]` covers every log query but
/// not `["log-analytics"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new(root: impl Into<String>) -> Self {
        Self(vec![root.into()])
    }

    pub fn segment(mut self, segment: impl fmt::Display) -> Self {
        self.0.push(segment.to_string());
        self
    }

    /// Append a parameter set as one canonical JSON segment
    pub fn with_params<P: Serialize>(self, params: &P) -> Self {
        let encoded = serde_json::to_value(params)
            .map(|value| value.to_string())
            .unwrap_or_else(|e| format!("!{}", e));
        self.segment(encoded)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn root(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or_default()
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl From<&str> for QueryKey {
    fn from(root: &str) -> Self {
        QueryKey::new(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_is_segment_wise() {
        let logs = QueryKey::new("logs");
        let page = QueryKey::new("logs").segment(2);
        let analytics = QueryKey::new("log-analytics").segment(7);

        assert!(page.starts_with(&logs));
        assert!(logs.starts_with(&logs));
        assert!(!analytics.starts_with(&QueryKey::new("log")));
        assert!(!logs.starts_with(&page));
    }

    #[test]
    fn test_params_segment_is_stable() {
        #[derive(Serialize)]
        struct Params {
            page: u32,
            search: Option<String>,
        }

        let a = QueryKey::new("tasks").with_params(&Params { page: 1, search: None });
        let b = QueryKey::new("tasks").with_params(&Params { page: 1, search: None });
        let c = QueryKey::new("tasks").with_params(&Params { page: 2, search: None });

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), r#"tasks/{"page":1,"search":null}"#);
    }
}
