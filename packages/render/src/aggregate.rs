//! Risk counters, charts and stat display.
//!
//! Chart handles follow the same dispose-before-attach discipline as map
//! layers: each [`ChartSlot`] holds at most one live chart, and rendering
//! into a slot destroys the previous chart first.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

pub use amanai_incident_models::{RiskCounts, compute_counts};

use amanai_incident_models::{DashboardStats, Incident, RiskLevel, StatValue};
use amanai_map::Color;
use chrono::{DateTime, Utc};
use serde::Serialize;
use strum_macros::{AsRefStr, Display};

use crate::marker::risk_color;
use crate::{DisplaySurface, PLACEHOLDER};

/// The two chart positions on the dashboard.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display, AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum ChartSlot {
    /// Share of each risk level.
    Distribution,
    /// Side-by-side magnitude of each risk level.
    Magnitude,
}

/// Chart style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ChartKind {
    /// Pie chart.
    Pie,
    /// Bar chart.
    Bar,
}

/// Dataset for one chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSpec {
    /// Chart style.
    pub kind: ChartKind,
    /// Chart title.
    pub title: String,
    /// One label per bar/slice.
    pub labels: Vec<String>,
    /// One value per label.
    pub values: Vec<u64>,
    /// One color per label.
    pub colors: Vec<Color>,
}

impl ChartSpec {
    fn from_counts(kind: ChartKind, title: &str, counts: RiskCounts) -> Self {
        let levels = RiskLevel::all();
        Self {
            kind,
            title: title.to_string(),
            labels: levels.iter().map(|l| l.label().to_string()).collect(),
            values: levels.iter().map(|l| counts.get(*l)).collect(),
            colors: levels.iter().map(|l| risk_color(Some(*l))).collect(),
        }
    }
}

/// Identifier a [`ChartSurface`] hands out for a drawn chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChartId(pub u64);

/// Charting capability of the dashboard page.
pub trait ChartSurface {
    /// Draws a chart into `slot` and returns its identifier.
    fn draw_chart(&self, slot: ChartSlot, spec: &ChartSpec) -> ChartId;

    /// Destroys a previously drawn chart. Unknown ids are ignored.
    fn destroy_chart(&self, id: ChartId);
}

/// Owner of the live chart instances.
pub struct AggregateView<C: ChartSurface> {
    surface: Rc<C>,
    charts: RefCell<BTreeMap<ChartSlot, ChartId>>,
}

impl<C: ChartSurface> AggregateView<C> {
    /// Creates a view with no charts drawn.
    pub fn new(surface: Rc<C>) -> Self {
        Self {
            surface,
            charts: RefCell::new(BTreeMap::new()),
        }
    }

    /// Redraws both charts from `counts`, destroying the previous
    /// instance in each slot first.
    pub fn render_charts(&self, counts: RiskCounts) {
        let specs = [
            (
                ChartSlot::Distribution,
                ChartSpec::from_counts(ChartKind::Pie, "Risk distribution", counts),
            ),
            (
                ChartSlot::Magnitude,
                ChartSpec::from_counts(ChartKind::Bar, "Incidents by risk", counts),
            ),
        ];

        for (slot, spec) in specs {
            let previous = self.charts.borrow_mut().remove(&slot);
            if let Some(id) = previous {
                self.surface.destroy_chart(id);
            }
            let id = self.surface.draw_chart(slot, &spec);
            self.charts.borrow_mut().insert(slot, id);
        }
        log::debug!(
            "Charts updated (low={}, medium={}, high={})",
            counts.low,
            counts.medium,
            counts.high
        );
    }

    /// Destroys every live chart.
    pub fn clear(&self) {
        let charts = std::mem::take(&mut *self.charts.borrow_mut());
        for id in charts.into_values() {
            self.surface.destroy_chart(id);
        }
    }

    /// Number of chart instances this view currently owns.
    #[must_use]
    pub fn live_charts(&self) -> usize {
        self.charts.borrow().len()
    }
}

/// A dashboard stat counter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display, AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum StatField {
    /// Total incidents.
    Total,
    /// High-risk incidents.
    High,
    /// Incidents in the last hour.
    LastHour,
    /// High-risk share.
    HighPct,
}

/// Picks the backend aggregate when it is usable, otherwise computes the
/// counters from the incident snapshot.
#[must_use]
pub fn stats_or_fallback(
    backend: Option<DashboardStats>,
    incidents: &[Incident],
    now: DateTime<Utc>,
) -> DashboardStats {
    match backend {
        Some(stats) if stats.is_usable() => stats,
        _ => {
            log::debug!("Backend stats unavailable, computing from {} incidents", incidents.len());
            DashboardStats::from_incidents(incidents, now)
        }
    }
}

/// Writes the four stat counters. Values are displayed as given; a
/// missing value shows [`PLACEHOLDER`].
pub fn render_stats<D: DisplaySurface + ?Sized>(display: &D, stats: &DashboardStats) {
    let text = |value: Option<&StatValue>| value.map_or_else(|| PLACEHOLDER.to_string(), ToString::to_string);

    display.set_text(StatField::Total, &text(stats.total.as_ref()));
    display.set_text(StatField::High, &text(stats.high.as_ref()));
    display.set_text(StatField::LastHour, &text(stats.last_hour.as_ref()));
    let pct = stats
        .high_pct
        .as_ref()
        .map_or_else(|| PLACEHOLDER.to_string(), |v| format!("{v}%"));
    display.set_text(StatField::HighPct, &pct);
}

/// In-memory [`ChartSurface`] keeping only live charts.
#[derive(Debug, Default)]
pub struct MemoryCharts {
    next_id: Cell<u64>,
    live: RefCell<BTreeMap<ChartId, (ChartSlot, ChartSpec)>>,
}

impl MemoryCharts {
    /// Creates an empty chart surface.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live charts in `slot`.
    #[must_use]
    pub fn count(&self, slot: ChartSlot) -> usize {
        self.live.borrow().values().filter(|(s, _)| *s == slot).count()
    }

    /// The most recently drawn live chart in `slot`.
    #[must_use]
    pub fn latest(&self, slot: ChartSlot) -> Option<ChartSpec> {
        self.live
            .borrow()
            .values()
            .rev()
            .find(|(s, _)| *s == slot)
            .map(|(_, spec)| spec.clone())
    }
}

impl ChartSurface for MemoryCharts {
    fn draw_chart(&self, slot: ChartSlot, spec: &ChartSpec) -> ChartId {
        let id = ChartId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.live.borrow_mut().insert(id, (slot, spec.clone()));
        id
    }

    fn destroy_chart(&self, id: ChartId) {
        self.live.borrow_mut().remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::table::TableRow;

    fn with_risk(risk: &str) -> Incident {
        Incident {
            predicted_risk: Some(risk.to_string()),
            ..Incident::default()
        }
    }

    #[test]
    fn counts_arabic_levels() {
        let incidents = vec![with_risk("مرتفع"), with_risk("مرتفع"), with_risk("متوسط")];
        assert_eq!(
            compute_counts(&incidents),
            RiskCounts {
                low: 0,
                medium: 1,
                high: 2
            }
        );
    }

    #[test]
    fn unrecognized_levels_are_ignored() {
        let incidents = vec![
            with_risk("low"),
            with_risk("severe"),
            Incident::default(),
            with_risk("High"),
        ];
        let counts = compute_counts(&incidents);
        assert_eq!(counts.total(), 2);
        assert_eq!(counts.low, 1);
        assert_eq!(counts.high, 1);
    }

    #[test]
    fn rerender_keeps_one_chart_per_slot() {
        let surface = Rc::new(MemoryCharts::new());
        let view = AggregateView::new(Rc::clone(&surface));

        view.render_charts(RiskCounts {
            low: 1,
            medium: 0,
            high: 0,
        });
        view.render_charts(RiskCounts {
            low: 0,
            medium: 2,
            high: 5,
        });

        assert_eq!(surface.count(ChartSlot::Distribution), 1);
        assert_eq!(surface.count(ChartSlot::Magnitude), 1);
        assert_eq!(view.live_charts(), 2);
        let bar = surface.latest(ChartSlot::Magnitude).unwrap();
        assert_eq!(bar.kind, ChartKind::Bar);
        assert_eq!(bar.values, vec![0, 2, 5]);
        assert_eq!(bar.colors, vec![Color::Green, Color::Orange, Color::Red]);

        view.clear();
        assert_eq!(surface.count(ChartSlot::Distribution), 0);
        assert_eq!(view.live_charts(), 0);
    }

    #[derive(Default)]
    struct Texts(RefCell<BTreeMap<StatField, String>>);

    impl DisplaySurface for Texts {
        fn set_text(&self, field: StatField, text: &str) {
            self.0.borrow_mut().insert(field, text.to_string());
        }

        fn set_table(&self, _rows: &[TableRow]) {}
    }

    #[test]
    fn renders_backend_values_verbatim() {
        let texts = Texts::default();
        let stats = DashboardStats {
            total: Some(StatValue::Int(12)),
            high: Some(StatValue::Int(3)),
            last_hour: None,
            high_pct: Some(StatValue::Float(25.0)),
            ..DashboardStats::default()
        };
        render_stats(&texts, &stats);

        let out = texts.0.borrow();
        assert_eq!(out[&StatField::Total], "12");
        assert_eq!(out[&StatField::LastHour], PLACEHOLDER);
        assert_eq!(out[&StatField::HighPct], "25%");
    }

    #[test]
    fn falls_back_to_snapshot_counts() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        let incidents = vec![with_risk("مرتفع"), with_risk("منخفض")];

        let stats = stats_or_fallback(None, &incidents, now);
        assert_eq!(stats.total, Some(StatValue::Int(2)));
        assert_eq!(stats.high_pct, Some(StatValue::Float(50.0)));

        let unusable = DashboardStats {
            high: Some(StatValue::Int(9)),
            ..DashboardStats::default()
        };
        let stats = stats_or_fallback(Some(unusable), &incidents, now);
        assert_eq!(stats.high, Some(StatValue::Int(1)));

        let backend = DashboardStats {
            total: Some(StatValue::Int(40)),
            ..DashboardStats::default()
        };
        let stats = stats_or_fallback(Some(backend.clone()), &incidents, now);
        assert_eq!(stats, backend);
    }
}
