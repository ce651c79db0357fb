//! Map primitives for each layer kind.

use amanai_incident_models::{HeatPoint, Incident, PatrolZone, RiskLevel, TrafficHotspot};
use amanai_map::{Color, HeatSample, MapPrimitive};

use crate::or_placeholder;

/// Incident marker radius in pixels.
pub const INCIDENT_RADIUS: u32 = 8;
/// Incident marker stroke width in pixels.
pub const INCIDENT_WEIGHT: u32 = 2;
/// Traffic hotspot radius in meters.
pub const TRAFFIC_RADIUS_M: f64 = 150.0;
/// Traffic hotspot fill opacity.
pub const TRAFFIC_FILL_OPACITY: f64 = 0.4;
/// Patrol marker glyph.
pub const PATROL_GLYPH: &str = "🚓";
/// Patrol marker style class.
pub const PATROL_CLASS: &str = "patrol-icon";
/// Patrol marker size in pixels.
pub const PATROL_ICON_SIZE: (u32, u32) = (30, 30);
/// Heatmap blur radius in pixels.
pub const HEAT_RADIUS: u32 = 25;

/// High is red, medium is orange, everything else green.
#[must_use]
pub const fn risk_color(level: Option<RiskLevel>) -> Color {
    match level {
        Some(RiskLevel::High) => Color::Red,
        Some(RiskLevel::Medium) => Color::Orange,
        Some(RiskLevel::Low) | None => Color::Green,
    }
}

/// Popup text for an incident marker. Missing fields render as
/// [`crate::PLACEHOLDER`].
#[must_use]
pub fn popup_text(incident: &Incident) -> String {
    format!(
        "Type: {}\nObserved risk: {}\nPredicted risk: {}\nRecommendation: {}\nSource: {}\nTime: {}",
        or_placeholder(incident.incident_type.as_deref()),
        or_placeholder(incident.observed_risk.as_deref()),
        or_placeholder(incident.predicted_risk.as_deref()),
        or_placeholder(incident.recommendation.as_deref()),
        or_placeholder(incident.source.as_deref()),
        or_placeholder(incident.time.as_deref()),
    )
}

/// Circle marker for one incident, colored by predicted risk.
///
/// Returns `None` when the incident has no usable coordinates; such
/// incidents still appear in the table.
#[must_use]
pub fn incident_marker(incident: &Incident) -> Option<MapPrimitive> {
    Some(MapPrimitive::CircleMarker {
        position: incident.position()?,
        radius: INCIDENT_RADIUS,
        color: risk_color(incident.predicted_risk_level()),
        weight: INCIDENT_WEIGHT,
        popup: Some(popup_text(incident)),
    })
}

/// Markers for every placeable incident in the snapshot.
#[must_use]
pub fn incident_layer(incidents: &[Incident]) -> Vec<MapPrimitive> {
    let markers: Vec<_> = incidents.iter().filter_map(incident_marker).collect();
    let skipped = incidents.len() - markers.len();
    if skipped > 0 {
        log::debug!("{skipped} incidents have no usable coordinates");
    }
    markers
}

/// Ground circles for traffic hotspots, colored by congestion level.
#[must_use]
pub fn traffic_layer(hotspots: &[TrafficHotspot]) -> Vec<MapPrimitive> {
    hotspots
        .iter()
        .filter_map(|h| {
            Some(MapPrimitive::Circle {
                position: h.position()?,
                radius_m: TRAFFIC_RADIUS_M,
                color: risk_color(h.congestion()),
                fill_opacity: TRAFFIC_FILL_OPACITY,
            })
        })
        .collect()
}

/// Patrol icons for each forecast staging point.
#[must_use]
pub fn patrol_layer(zones: &[PatrolZone]) -> Vec<MapPrimitive> {
    zones
        .iter()
        .filter_map(|z| {
            Some(MapPrimitive::IconMarker {
                position: z.position()?,
                glyph: PATROL_GLYPH.to_string(),
                class_name: PATROL_CLASS.to_string(),
                size: PATROL_ICON_SIZE,
            })
        })
        .collect()
}

/// A single heat primitive over every placeable point, or nothing when
/// there are none.
#[must_use]
pub fn heatmap_layer(points: &[HeatPoint]) -> Vec<MapPrimitive> {
    let samples: Vec<HeatSample> = points
        .iter()
        .filter_map(|p| {
            Some(HeatSample {
                position: p.position()?,
                weight: p.severity(),
            })
        })
        .collect();

    if samples.is_empty() {
        return Vec::new();
    }
    vec![MapPrimitive::Heat {
        points: samples,
        radius: HEAT_RADIUS,
    }]
}
