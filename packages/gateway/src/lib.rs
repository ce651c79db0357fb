#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Remote data gateway for the incident-reporting backend.
//!
//! One request per call, no caching and no automatic retry. Read
//! operations return parsed collections; write operations return only
//! success or failure, and the caller is expected to treat its cached
//! state as stale afterwards. Calls are independent: two concurrent calls
//! carry no ordering guarantee.

pub mod config;
mod decode;
pub mod http;
mod send;

use amanai_incident_models::{
    DashboardStats, HeatPoint, Incident, NewIncident, PatrolZone, TrafficHotspot,
};
use async_trait::async_trait;
use thiserror::Error;

pub use config::{Endpoints, GatewayConfig};
pub use http::HttpGateway;

/// Errors that can occur while talking to the backend.
///
/// Callers treat every variant as a network failure; [`Self::is_decode`]
/// only exists so the decode case can be logged differently.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Connection failed, timed out, or the body could not be read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// Response status.
        status: reqwest::StatusCode,
    },

    /// The payload did not have the expected shape.
    #[error("Unexpected payload from {url}: {message}")]
    Decode {
        /// Requested URL.
        url: String,
        /// Description of what went wrong.
        message: String,
    },
}

impl GatewayError {
    /// Whether the request succeeded but the payload was malformed.
    #[must_use]
    pub const fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

/// An exported report document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Content type announced by the backend, if any.
    pub content_type: Option<String>,
    /// Raw document bytes.
    pub bytes: Vec<u8>,
}

impl Report {
    /// File extension matching the content type (`pdf` when unknown).
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self.content_type.as_deref() {
            Some(ct) if ct.starts_with("text/html") => "html",
            Some(ct) if ct.starts_with("text/csv") => "csv",
            Some(ct) if ct.starts_with("application/json") => "json",
            _ => "pdf",
        }
    }
}

/// Request/response contract of the backend.
///
/// Futures are not required to be `Send`: the dashboard drives every call
/// from a single thread.
#[async_trait(?Send)]
pub trait Gateway {
    /// Fetches the pre-aggregated dashboard counters.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the request or decoding fails.
    async fn fetch_stats(&self) -> Result<DashboardStats, GatewayError>;

    /// Fetches every incident, in backend order.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the request or decoding fails.
    async fn fetch_incidents(&self) -> Result<Vec<Incident>, GatewayError>;

    /// Submits a manually entered incident.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the backend rejects or never receives it.
    async fn submit_incident(&self, incident: &NewIncident) -> Result<(), GatewayError>;

    /// Deletes one incident.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the request fails.
    async fn delete_incident(&self, id: i64) -> Result<(), GatewayError>;

    /// Deletes every incident.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the request fails.
    async fn clear_incidents(&self) -> Result<(), GatewayError>;

    /// Fetches current traffic congestion hotspots.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the request or decoding fails.
    async fn fetch_traffic(&self) -> Result<Vec<TrafficHotspot>, GatewayError>;

    /// Fetches the patrol positioning forecast.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the request or decoding fails.
    async fn fetch_patrols(&self) -> Result<Vec<PatrolZone>, GatewayError>;

    /// Fetches heatmap samples.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the request or decoding fails.
    async fn fetch_heatmap(&self) -> Result<Vec<HeatPoint>, GatewayError>;

    /// Runs backend-side AI traffic detection, which may create incidents.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the request fails.
    async fn detect_traffic(&self) -> Result<(), GatewayError>;

    /// Downloads the incident report document.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the request fails.
    async fn export_report(&self) -> Result<Report, GatewayError>;
}
