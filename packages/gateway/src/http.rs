//! `reqwest`-backed [`Gateway`] implementation.

use amanai_incident_models::{
    DashboardStats, HeatPoint, Incident, NewIncident, PatrolZone, TrafficHotspot,
};
use async_trait::async_trait;

use crate::decode::{decode_list, decode_record, decode_wrapped_list};
use crate::send::{send_ack, send_bytes, send_json};
use crate::{Gateway, GatewayConfig, GatewayError, Report};

/// Gateway talking JSON over HTTP to the incident backend.
pub struct HttpGateway {
    config: GatewayConfig,
    client: reqwest::Client,
}

impl HttpGateway {
    /// Creates a gateway for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Http`] if the HTTP client cannot be built
    /// (e.g. the TLS backend fails to initialise).
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    /// The configuration this gateway was built with.
    #[must_use]
    pub const fn config(&self) -> &GatewayConfig {
        &self.config
    }

    async fn get_json(&self, path: &str) -> Result<(String, serde_json::Value), GatewayError> {
        let url = self.config.url(path);
        log::debug!("GET {url}");
        let value = send_json(self.client.get(&url)).await?;
        Ok((url, value))
    }
}

#[async_trait(?Send)]
impl Gateway for HttpGateway {
    async fn fetch_stats(&self) -> Result<DashboardStats, GatewayError> {
        let (url, value) = self.get_json(&self.config.endpoints.stats).await?;
        decode_record(&url, value)
    }

    async fn fetch_incidents(&self) -> Result<Vec<Incident>, GatewayError> {
        let (url, value) = self.get_json(&self.config.endpoints.incidents).await?;
        let incidents = decode_list(&url, value)?;
        log::debug!("Fetched {} incidents", incidents.len());
        Ok(incidents)
    }

    async fn submit_incident(&self, incident: &NewIncident) -> Result<(), GatewayError> {
        let url = self.config.url(&self.config.endpoints.incidents);
        log::debug!("POST {url}");
        send_ack(self.client.post(&url).json(incident)).await
    }

    async fn delete_incident(&self, id: i64) -> Result<(), GatewayError> {
        let url = self.config.url(&self.config.endpoints.delete_incident);
        log::debug!("POST {url} (id={id})");
        send_ack(
            self.client
                .post(&url)
                .json(&serde_json::json!({ "id": id })),
        )
        .await
    }

    async fn clear_incidents(&self) -> Result<(), GatewayError> {
        let url = self.config.url(&self.config.endpoints.clear_incidents);
        log::debug!("POST {url}");
        send_ack(self.client.post(&url)).await
    }

    async fn fetch_traffic(&self) -> Result<Vec<TrafficHotspot>, GatewayError> {
        let (url, value) = self.get_json(&self.config.endpoints.traffic).await?;
        decode_list(&url, value)
    }

    async fn fetch_patrols(&self) -> Result<Vec<PatrolZone>, GatewayError> {
        let (url, value) = self.get_json(&self.config.endpoints.patrols).await?;
        decode_list(&url, value)
    }

    async fn fetch_heatmap(&self) -> Result<Vec<HeatPoint>, GatewayError> {
        let (url, value) = self.get_json(&self.config.endpoints.heatmap).await?;
        decode_wrapped_list(&url, "points", value)
    }

    async fn detect_traffic(&self) -> Result<(), GatewayError> {
        let url = self.config.url(&self.config.endpoints.detect_traffic);
        log::debug!("GET {url}");
        send_ack(self.client.get(&url)).await
    }

    async fn export_report(&self) -> Result<Report, GatewayError> {
        let url = self.config.url(&self.config.endpoints.export_report);
        log::debug!("GET {url}");
        let (content_type, bytes) = send_bytes(self.client.get(&url)).await?;
        log::info!("Downloaded report ({} bytes)", bytes.len());
        Ok(Report {
            content_type,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn refused_connection_is_http_error() {
        let gateway = HttpGateway::new(GatewayConfig::new("http://127.0.0.1:1")).unwrap();
        let err = gateway.fetch_incidents().await.unwrap_err();
        assert!(matches!(err, GatewayError::Http(_)));
        assert!(!err.is_decode());
    }

    #[tokio::test]
    async fn write_failures_surface_as_errors() {
        let gateway = HttpGateway::new(GatewayConfig::new("http://127.0.0.1:1")).unwrap();
        assert!(gateway.clear_incidents().await.is_err());
        assert!(gateway.delete_incident(4).await.is_err());
    }
}
