#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Map primitives and overlay lifecycle.
//!
//! The map itself is an external collaborator reached only through the
//! [`MapSurface`] capability (draw a primitive, remove a primitive). The
//! [`LayerRegistry`] owns every primitive it draws and guarantees that
//! each [`LayerKind`] has at most one live set of them on the surface.

pub mod memory;
pub mod registry;

use amanai_incident_models::{LayerKind, Position};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

pub use memory::MemoryMap;
pub use registry::{LayerOutcome, LayerRegistry, LayerStatus};

/// Stroke/fill colors used by the overlays.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Color {
    /// High risk / heavy congestion.
    Red,
    /// Medium risk / moderate congestion.
    Orange,
    /// Low or unknown risk.
    Green,
}

/// One heatmap sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatSample {
    /// Sample location.
    pub position: Position,
    /// Severity weight (1-3).
    pub weight: u8,
}

/// A drawable shape, independent of any rendering library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MapPrimitive {
    /// Fixed-pixel-radius circle with an optional popup.
    CircleMarker {
        /// Center.
        position: Position,
        /// Radius in pixels.
        radius: u32,
        /// Stroke color.
        color: Color,
        /// Stroke width in pixels.
        weight: u32,
        /// Popup text shown on click.
        popup: Option<String>,
    },
    /// Circle with a radius in meters on the ground.
    Circle {
        /// Center.
        position: Position,
        /// Radius in meters.
        radius_m: f64,
        /// Stroke and fill color.
        color: Color,
        /// Fill opacity (0-1).
        fill_opacity: f64,
    },
    /// Marker drawn as a text glyph.
    IconMarker {
        /// Anchor point.
        position: Position,
        /// Glyph to display.
        glyph: String,
        /// Style class applied to the icon.
        class_name: String,
        /// Icon width and height in pixels.
        size: (u32, u32),
    },
    /// A heat layer covering every sample.
    Heat {
        /// Samples.
        points: Vec<HeatSample>,
        /// Blur radius in pixels.
        radius: u32,
    },
}

/// Identifier a [`MapSurface`] hands out for a drawn primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PrimitiveId(pub u64);

/// Drawing capability of the map.
///
/// Methods take `&self`; implementations keep their own interior state.
pub trait MapSurface {
    /// Draws `primitive` on behalf of `kind` and returns its identifier.
    fn draw(&self, kind: LayerKind, primitive: &MapPrimitive) -> PrimitiveId;

    /// Removes a previously drawn primitive. Unknown ids are ignored.
    fn remove(&self, id: PrimitiveId);
}
