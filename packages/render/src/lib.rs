#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Presentation mapping for the dashboard.
//!
//! [`marker`] and [`table`] are pure functions from backend entities to
//! map primitives and display rows. [`aggregate`] derives counters and
//! chart datasets from the incident snapshot and owns the live chart
//! handles.

pub mod aggregate;
pub mod marker;
pub mod table;

pub use aggregate::{
    AggregateView, ChartId, ChartKind, ChartSlot, ChartSpec, ChartSurface, MemoryCharts,
    RiskCounts, StatField, compute_counts, render_stats, stats_or_fallback,
};
pub use table::{TableOrder, TableRow};

/// Text shown wherever the backend left a field empty.
pub const PLACEHOLDER: &str = "—";

/// Text and table capability of the dashboard page.
pub trait DisplaySurface {
    /// Writes one stat counter.
    fn set_text(&self, field: StatField, text: &str);

    /// Replaces every row of the incident table.
    fn set_table(&self, rows: &[TableRow]);
}

/// `value`, or [`PLACEHOLDER`] when it is missing or blank.
#[must_use]
pub fn or_placeholder(value: Option<&str>) -> &str {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => PLACEHOLDER,
    }
}
