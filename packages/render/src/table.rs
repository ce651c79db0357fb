//! Incident table rows.
//!
//! The backend returns incidents oldest first. The table shows the most
//! recently reported incident first, so [`TableOrder::NewestFirst`]
//! reverses the backend order. Ordering is positional, never by parsing
//! times, so rows with unparseable times keep a stable place.

use amanai_incident_models::Incident;
use serde::{Deserialize, Serialize};

use crate::{PLACEHOLDER, or_placeholder};

/// Decimal places used for coordinates in the table.
pub const COORD_PRECISION: usize = 5;

/// Row ordering policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableOrder {
    /// Reverse of backend order (backend order is oldest first).
    #[default]
    NewestFirst,
    /// Exactly as the backend returned them.
    AsReturned,
}

/// Delete action bound to one incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteAction {
    /// Incident to delete.
    pub incident_id: i64,
}

/// One display row of the incident table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    /// Identifier column.
    pub id: String,
    /// Report time column.
    pub time: String,
    /// Incident type column.
    pub incident_type: String,
    /// Observed risk column.
    pub observed_risk: String,
    /// Predicted risk column.
    pub predicted_risk: String,
    /// Recommendation column.
    pub recommendation: String,
    /// `lat, lng` column.
    pub coordinates: String,
    /// Source column.
    pub source: String,
    /// Present only when the incident has an identifier.
    pub delete: Option<DeleteAction>,
}

/// Builds the display row for one incident.
#[must_use]
pub fn incident_row(incident: &Incident) -> TableRow {
    let coordinates = match (incident.lat, incident.lng) {
        (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => {
            format!("{lat:.prec$}, {lng:.prec$}", prec = COORD_PRECISION)
        }
        _ => PLACEHOLDER.to_string(),
    };

    TableRow {
        id: incident
            .id
            .map_or_else(|| PLACEHOLDER.to_string(), |id| id.to_string()),
        time: or_placeholder(incident.time.as_deref()).to_string(),
        incident_type: or_placeholder(incident.incident_type.as_deref()).to_string(),
        observed_risk: or_placeholder(incident.observed_risk.as_deref()).to_string(),
        predicted_risk: or_placeholder(incident.predicted_risk.as_deref()).to_string(),
        recommendation: or_placeholder(incident.recommendation.as_deref()).to_string(),
        coordinates,
        source: or_placeholder(incident.source.as_deref()).to_string(),
        delete: incident.id.map(|incident_id| DeleteAction { incident_id }),
    }
}

/// Builds every table row in display order.
#[must_use]
pub fn table_rows(incidents: &[Incident], order: TableOrder) -> Vec<TableRow> {
    match order {
        TableOrder::NewestFirst => incidents.iter().rev().map(incident_row).collect(),
        TableOrder::AsReturned => incidents.iter().map(incident_row).collect(),
    }
}
