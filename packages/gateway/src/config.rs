//! Backend location and endpoint paths.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default backend the dashboard talks to.
pub const DEFAULT_API_BASE_URL: &str = "https://amanai-1.onrender.com";

/// Paths of each backend operation, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// `GET` dashboard counters.
    pub stats: String,
    /// `GET` incident list, `POST` new incident.
    pub incidents: String,
    /// `POST` `{"id": n}` to delete one incident.
    pub delete_incident: String,
    /// `POST` to delete all incidents.
    pub clear_incidents: String,
    /// `GET` traffic hotspots.
    pub traffic: String,
    /// `GET` patrol forecast.
    pub patrols: String,
    /// `GET` heatmap points.
    pub heatmap: String,
    /// `GET` to trigger AI traffic detection.
    pub detect_traffic: String,
    /// `GET` report document.
    pub export_report: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            stats: "/dashboard-stats".to_string(),
            incidents: "/incidents".to_string(),
            delete_incident: "/delete-incident".to_string(),
            clear_incidents: "/clear-incidents".to_string(),
            traffic: "/traffic-hotspots".to_string(),
            patrols: "/patrol-forecast".to_string(),
            heatmap: "/heatmap".to_string(),
            detect_traffic: "/detect-traffic".to_string(),
            export_report: "/export-report".to_string(),
        }
    }
}

/// Connection settings for [`crate::HttpGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Scheme and host of the backend, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Endpoint paths.
    pub endpoints: Endpoints,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: None,
            endpoints: Endpoints::default(),
        }
    }
}

impl GatewayConfig {
    /// Creates a configuration for the given base URL with default paths.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Joins an endpoint path onto the base URL.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_paths_without_double_slashes() {
        let config = GatewayConfig::new("http://localhost:8000/");
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(
            config.url(&config.endpoints.incidents),
            "http://localhost:8000/incidents"
        );
        assert_eq!(config.url("heatmap"), "http://localhost:8000/heatmap");
    }

    #[test]
    fn default_points_at_hosted_backend() {
        let config = GatewayConfig::default();
        assert_eq!(
            config.url(&config.endpoints.stats),
            "https://amanai-1.onrender.com/dashboard-stats"
        );
        assert_eq!(config.timeout, None);
    }
}
