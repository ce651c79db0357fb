#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident, overlay and dashboard statistic types.
//!
//! These are the shapes the dashboard receives from the incident-reporting
//! backend. Every payload is treated as untrusted: fields the backend may
//! omit are `Option`s and every struct deserializes from a partial object.
//! Risk and congestion levels are carried as the raw strings the backend
//! sent and interpreted through [`RiskLevel::parse`], so an unrecognized
//! value survives decoding and is simply ignored where a level is needed.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Risk severity as assessed by the backend, also used for traffic
/// congestion levels.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RiskLevel {
    /// منخفض
    Low = 1,
    /// متوسط
    Medium = 2,
    /// مرتفع
    High = 3,
}

impl RiskLevel {
    /// Interprets a raw level string from the backend.
    ///
    /// Accepts the Arabic labels the backend emits as well as the English
    /// names (case-insensitive). Returns `None` for anything else.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw {
            "منخفض" => return Some(Self::Low),
            "متوسط" => return Some(Self::Medium),
            "مرتفع" => return Some(Self::High),
            _ => {}
        }
        match raw.to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    /// The label the backend uses for this level.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "منخفض",
            Self::Medium => "متوسط",
            Self::High => "مرتفع",
        }
    }

    /// Numeric severity (1-3), used as the heatmap weight scale.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Returns all variants, lowest first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Low, Self::Medium, Self::High]
    }
}

/// A category of togglable map overlay.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LayerKind {
    /// Reported and AI-detected incidents.
    Incidents,
    /// Traffic congestion hotspots.
    Traffic,
    /// Predicted patrol staging points.
    Patrol,
    /// Risk heatmap.
    Heatmap,
}

impl LayerKind {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Incidents, Self::Traffic, Self::Patrol, Self::Heatmap]
    }

    /// Human-readable name for menus and notices.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Incidents => "Incidents",
            Self::Traffic => "Traffic hotspots",
            Self::Patrol => "Patrol forecast",
            Self::Heatmap => "Risk heatmap",
        }
    }
}

/// A WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl Position {
    /// Builds a position from optional coordinates, rejecting missing,
    /// non-finite or out-of-range values.
    #[must_use]
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        let (lat, lng) = (lat?, lng?);
        let pos = Self { lat, lng };
        pos.is_valid().then_some(pos)
    }

    /// Whether both coordinates are finite and within WGS84 bounds.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// An incident as returned by the backend.
///
/// The client only ever holds a read-only snapshot of these, replaced
/// wholesale on every successful fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Incident {
    /// Backend-assigned identifier.
    pub id: Option<i64>,
    /// When the incident was reported, as sent by the backend.
    pub time: Option<String>,
    /// Free-text incident type.
    pub incident_type: Option<String>,
    /// Risk observed at report time.
    pub observed_risk: Option<String>,
    /// Risk predicted by the backend model.
    pub predicted_risk: Option<String>,
    /// Free-text recommendation.
    pub recommendation: Option<String>,
    /// Latitude.
    pub lat: Option<f64>,
    /// Longitude.
    pub lng: Option<f64>,
    /// Where the report came from (manual entry, AI detection, ...).
    pub source: Option<String>,
}

impl Incident {
    /// Map position, if the backend sent usable coordinates.
    #[must_use]
    pub fn position(&self) -> Option<Position> {
        Position::from_parts(self.lat, self.lng)
    }

    /// Predicted risk, if recognized.
    #[must_use]
    pub fn predicted_risk_level(&self) -> Option<RiskLevel> {
        self.predicted_risk.as_deref().and_then(RiskLevel::parse)
    }

    /// Observed risk, if recognized.
    #[must_use]
    pub fn observed_risk_level(&self) -> Option<RiskLevel> {
        self.observed_risk.as_deref().and_then(RiskLevel::parse)
    }

    /// Parses [`Self::time`] as RFC 3339, falling back to a naive
    /// `YYYY-MM-DD HH:MM:SS` (or `T`-separated) timestamp taken as UTC.
    #[must_use]
    pub fn reported_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.time.as_deref()?.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }
}

/// A traffic congestion hotspot. Recomputed by the backend per request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficHotspot {
    /// Latitude.
    pub lat: Option<f64>,
    /// Longitude.
    pub lng: Option<f64>,
    /// Raw congestion level.
    pub level: Option<String>,
}

impl TrafficHotspot {
    /// Map position, if usable.
    #[must_use]
    pub fn position(&self) -> Option<Position> {
        Position::from_parts(self.lat, self.lng)
    }

    /// Congestion level, if recognized.
    #[must_use]
    pub fn congestion(&self) -> Option<RiskLevel> {
        self.level.as_deref().and_then(RiskLevel::parse)
    }
}

/// A predicted patrol staging point, implicitly valid for the next 24 hours.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatrolZone {
    /// Latitude.
    pub lat: Option<f64>,
    /// Longitude.
    pub lng: Option<f64>,
    /// End of the validity window, when the backend states one.
    pub valid_until: Option<String>,
}

impl PatrolZone {
    /// Map position, if usable.
    #[must_use]
    pub fn position(&self) -> Option<Position> {
        Position::from_parts(self.lat, self.lng)
    }
}

/// A weighted heatmap sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatPoint {
    /// Latitude.
    pub lat: Option<f64>,
    /// Longitude.
    pub lng: Option<f64>,
    /// Ordinal risk severity (1-3).
    pub weight: Option<f64>,
}

impl HeatPoint {
    /// Map position, if usable.
    #[must_use]
    pub fn position(&self) -> Option<Position> {
        Position::from_parts(self.lat, self.lng)
    }

    /// Weight rounded and clamped to 1-3. Missing or non-finite weights
    /// count as 1.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn severity(&self) -> u8 {
        match self.weight {
            Some(w) if w.is_finite() => w.round().clamp(1.0, 3.0) as u8,
            _ => 1,
        }
    }
}

/// An opaque statistic value as supplied by the backend aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    /// Integral value.
    Int(i64),
    /// Fractional value.
    Float(f64),
    /// Pre-formatted text.
    Text(String),
}

impl std::fmt::Display for StatValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// Dashboard counters.
///
/// Either returned pre-aggregated by the backend (canonical) or computed
/// client-side from the current incident snapshot via
/// [`DashboardStats::from_incidents`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardStats {
    /// Total incident count.
    pub total: Option<StatValue>,
    /// High-risk incident count.
    #[serde(alias = "high_risk")]
    pub high: Option<StatValue>,
    /// Incidents reported in the last hour.
    pub last_hour: Option<StatValue>,
    /// Share of high-risk incidents, in percent.
    pub high_pct: Option<StatValue>,
    /// Medium-risk incident count, when the backend reports it.
    pub medium: Option<StatValue>,
    /// Low-risk incident count, when the backend reports it.
    pub low: Option<StatValue>,
}

impl DashboardStats {
    /// Whether the aggregate carries at least a total. A response without
    /// one is treated as unavailable.
    #[must_use]
    pub const fn is_usable(&self) -> bool {
        self.total.is_some()
    }

    /// Computes the counters from an incident snapshot.
    ///
    /// `last_hour` counts incidents whose parsed time lies within the
    /// 60 minutes before `now`; unparseable times are not counted.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
    pub fn from_incidents(incidents: &[Incident], now: DateTime<Utc>) -> Self {
        let hour_ago = now - chrono::Duration::hours(1);
        let counts = compute_counts(incidents);
        let last_hour = incidents
            .iter()
            .filter_map(Incident::reported_at)
            .filter(|at| *at > hour_ago && *at <= now)
            .count();

        let total = incidents.len();
        let high_pct = if total == 0 {
            0.0
        } else {
            (counts.high as f64 / total as f64 * 1000.0).round() / 10.0
        };

        Self {
            total: Some(StatValue::Int(total as i64)),
            high: Some(StatValue::Int(counts.high as i64)),
            last_hour: Some(StatValue::Int(last_hour as i64)),
            high_pct: Some(StatValue::Float(high_pct)),
            medium: Some(StatValue::Int(counts.medium as i64)),
            low: Some(StatValue::Int(counts.low as i64)),
        }
    }
}

/// Incident counts per predicted risk level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RiskCounts {
    /// Low-risk incidents.
    pub low: u64,
    /// Medium-risk incidents.
    pub medium: u64,
    /// High-risk incidents.
    pub high: u64,
}

impl RiskCounts {
    /// Sum of the three buckets.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.low + self.medium + self.high
    }

    /// Count for one level.
    #[must_use]
    pub const fn get(&self, level: RiskLevel) -> u64 {
        match level {
            RiskLevel::Low => self.low,
            RiskLevel::Medium => self.medium,
            RiskLevel::High => self.high,
        }
    }
}

/// Partitions incidents by predicted risk.
///
/// Incidents with a missing or unrecognized predicted risk are not
/// counted in any bucket.
#[must_use]
pub fn compute_counts(incidents: &[Incident]) -> RiskCounts {
    incidents
        .iter()
        .filter_map(Incident::predicted_risk_level)
        .fold(RiskCounts::default(), |mut counts, level| {
            match level {
                RiskLevel::Low => counts.low += 1,
                RiskLevel::Medium => counts.medium += 1,
                RiskLevel::High => counts.high += 1,
            }
            counts
        })
}

/// Rejection of a manually entered incident, raised before any network
/// call is made. The display text is shown inline to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Latitude field left empty.
    #[error("Latitude is required")]
    MissingLatitude,
    /// Longitude field left empty.
    #[error("Longitude is required")]
    MissingLongitude,
    /// Coordinate not a number or out of range.
    #[error("Invalid {field}: {value:?}")]
    InvalidCoordinate {
        /// Which coordinate.
        field: &'static str,
        /// What the user typed.
        value: String,
    },
}

/// Raw manual-entry form fields, exactly as typed.
#[derive(Debug, Clone, Default)]
pub struct ManualIncident {
    /// Incident type.
    pub incident_type: String,
    /// Latitude text.
    pub lat: String,
    /// Longitude text.
    pub lng: String,
    /// Observed risk text.
    pub observed_risk: String,
    /// Recommendation text.
    pub recommendation: String,
}

impl ManualIncident {
    /// Validates the form and converts it into a submit payload.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if either coordinate is missing or does
    /// not parse into its valid range. The type is free text and may be
    /// blank.
    pub fn validate(&self) -> Result<NewIncident, ValidationError> {
        let lat = parse_coordinate("latitude", &self.lat, 90.0)
            .ok_or(ValidationError::MissingLatitude)??;
        let lng = parse_coordinate("longitude", &self.lng, 180.0)
            .ok_or(ValidationError::MissingLongitude)??;

        Ok(NewIncident {
            incident_type: self.incident_type.trim().to_string(),
            observed_risk: non_empty(&self.observed_risk),
            recommendation: non_empty(&self.recommendation),
            lat,
            lng,
            source: "manual".to_string(),
        })
    }
}

/// `None` when the field is blank, otherwise the parse result.
fn parse_coordinate(
    field: &'static str,
    raw: &str,
    bound: f64,
) -> Option<Result<f64, ValidationError>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Some(
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.abs() <= bound)
            .ok_or_else(|| ValidationError::InvalidCoordinate {
                field,
                value: raw.to_string(),
            }),
    )
}

fn non_empty(raw: &str) -> Option<String> {
    let raw = raw.trim();
    (!raw.is_empty()).then(|| raw.to_string())
}

/// Incident fields sent to the backend on submission (the backend assigns
/// the identifier and time).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIncident {
    /// Incident type.
    pub incident_type: String,
    /// Observed risk, if given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_risk: Option<String>,
    /// Recommendation, if given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
    /// Report origin.
    pub source: String,
}
