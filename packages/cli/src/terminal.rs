//! Terminal rendition of the dashboard page.
//!
//! Map primitives and charts are kept in memory and summarised on demand;
//! notices are printed as they arrive, above any running spinner.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use amanai_cli_utils::MultiProgress;
use amanai_dashboard::{Notice, NoticeLevel, Notifier};
use amanai_incident_models::LayerKind;
use amanai_map::{Color, MapPrimitive, MapSurface, MemoryMap, PrimitiveId};
use amanai_render::{
    ChartId, ChartKind, ChartSlot, ChartSpec, ChartSurface, DisplaySurface, MemoryCharts,
    PLACEHOLDER, StatField, TableRow,
};
use console::{StyledObject, style};

/// Width of the longest bar in a bar chart.
const BAR_WIDTH: u64 = 30;

/// Dashboard surfaces backed by stdout.
pub struct TerminalTarget {
    multi: MultiProgress,
    map: MemoryMap,
    charts: MemoryCharts,
    stats: RefCell<BTreeMap<StatField, String>>,
    rows: RefCell<Vec<TableRow>>,
}

impl TerminalTarget {
    /// Creates a target printing through `multi` so output never tears a
    /// spinner.
    #[must_use]
    pub fn new(multi: MultiProgress) -> Self {
        Self {
            multi,
            map: MemoryMap::new(),
            charts: MemoryCharts::new(),
            stats: RefCell::new(BTreeMap::new()),
            rows: RefCell::new(Vec::new()),
        }
    }

    /// Current incident table rows, in display order.
    #[must_use]
    pub fn rows(&self) -> Vec<TableRow> {
        self.rows.borrow().clone()
    }

    /// Prints `text` with spinners suspended.
    pub fn print(&self, text: &str) {
        self.multi.suspend(|| println!("{text}"));
    }

    /// Counters, visible layers and charts.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::new();

        for field in [
            StatField::Total,
            StatField::High,
            StatField::LastHour,
            StatField::HighPct,
        ] {
            let stats = self.stats.borrow();
            let value = stats.get(&field).map_or(PLACEHOLDER, String::as_str);
            let _ = writeln!(out, "{:<18} {}", stat_label(field), style(value).bold());
        }

        let _ = writeln!(out, "\n{}", style("Layers").underlined());
        for kind in LayerKind::all().iter().copied() {
            let _ = writeln!(out, "  {:<18} {}", kind.title(), self.describe_layer(kind));
        }

        for slot in [ChartSlot::Distribution, ChartSlot::Magnitude] {
            if let Some(spec) = self.charts.latest(slot) {
                out.push('\n');
                out.push_str(&chart_text(&spec));
            }
        }

        out
    }

    /// The incident table.
    #[must_use]
    pub fn table(&self) -> String {
        let rows = self.rows.borrow();
        if rows.is_empty() {
            return "No incidents.".to_string();
        }

        let mut out = format!(
            "{:<6} {:<20} {:<18} {:<9} {:<9} {:<20} {:<8} RECOMMENDATION\n{}\n",
            "ID",
            "TIME",
            "TYPE",
            "OBSERVED",
            "PREDICTED",
            "COORDINATES",
            "SOURCE",
            "-".repeat(110),
        );
        for row in rows.iter() {
            let _ = writeln!(
                out,
                "{:<6} {:<20} {:<18} {:<9} {:<9} {:<20} {:<8} {}",
                row.id,
                clip(&row.time, 19),
                clip(&row.incident_type, 18),
                clip(&row.observed_risk, 9),
                clip(&row.predicted_risk, 9),
                row.coordinates,
                clip(&row.source, 8),
                row.recommendation,
            );
        }
        let _ = write!(out, "\n{} incident(s)", rows.len());
        out
    }

    fn describe_layer(&self, kind: LayerKind) -> String {
        let primitives = self.map.primitives(kind);
        if primitives.is_empty() {
            return style("nothing drawn").dim().to_string();
        }
        match kind {
            LayerKind::Incidents => format!("{} markers", primitives.len()),
            LayerKind::Traffic => format!("{} hotspots", primitives.len()),
            LayerKind::Patrol => format!("{} patrol points", primitives.len()),
            LayerKind::Heatmap => {
                let points: usize = primitives
                    .iter()
                    .map(|p| match p {
                        MapPrimitive::Heat { points, .. } => points.len(),
                        _ => 0,
                    })
                    .sum();
                format!("{points} heat points")
            }
        }
    }
}

const fn stat_label(field: StatField) -> &'static str {
    match field {
        StatField::Total => "Total incidents",
        StatField::High => "High risk",
        StatField::LastHour => "Last hour",
        StatField::HighPct => "High-risk share",
    }
}

fn paint(color: Color, text: String) -> StyledObject<String> {
    match color {
        Color::Red => style(text).red(),
        Color::Orange => style(text).yellow(),
        Color::Green => style(text).green(),
    }
}

fn chart_text(spec: &ChartSpec) -> String {
    let mut out = format!("{}\n", style(&spec.title).underlined());
    let total: u64 = spec.values.iter().sum();
    let max = spec.values.iter().copied().max().unwrap_or(0);

    for ((label, value), color) in spec.labels.iter().zip(&spec.values).zip(&spec.colors) {
        let detail = match spec.kind {
            ChartKind::Pie if total > 0 => format!("{value} ({}%)", value * 100 / total),
            ChartKind::Pie => format!("{value}"),
            ChartKind::Bar => {
                let width = if max == 0 { 0 } else { value * BAR_WIDTH / max };
                let bar = "█".repeat(usize::try_from(width).unwrap_or(0));
                format!("{} {value}", paint(*color, bar))
            }
        };
        let _ = writeln!(out, "  {} {detail}", paint(*color, format!("{label:<8}")));
    }
    out
}

fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(width.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}

impl MapSurface for TerminalTarget {
    fn draw(&self, kind: LayerKind, primitive: &MapPrimitive) -> PrimitiveId {
        self.map.draw(kind, primitive)
    }

    fn remove(&self, id: PrimitiveId) {
        self.map.remove(id);
    }
}

impl ChartSurface for TerminalTarget {
    fn draw_chart(&self, slot: ChartSlot, spec: &ChartSpec) -> ChartId {
        log::trace!("Drawing {slot} chart");
        self.charts.draw_chart(slot, spec)
    }

    fn destroy_chart(&self, id: ChartId) {
        self.charts.destroy_chart(id);
    }
}

impl DisplaySurface for TerminalTarget {
    fn set_text(&self, field: StatField, text: &str) {
        self.stats.borrow_mut().insert(field, text.to_string());
    }

    fn set_table(&self, rows: &[TableRow]) {
        *self.rows.borrow_mut() = rows.to_vec();
    }
}

impl Notifier for TerminalTarget {
    fn notify(&self, notice: &Notice) {
        let line = match notice.level {
            NoticeLevel::Info => format!("{} {}", style("✔").green(), notice.message),
            NoticeLevel::Error => format!("{} {}", style("✖").red(), style(&notice.message).red()),
            NoticeLevel::Validation => {
                format!("{} {}", style("!").yellow(), style(&notice.message).yellow())
            }
        };
        self.print(&line);
    }
}

#[cfg(test)]
mod tests {
    use amanai_incident_models::{Incident, Position, StatValue};
    use amanai_map::HeatSample;
    use amanai_render::table::table_rows;
    use amanai_render::{AggregateView, RiskCounts, TableOrder};
    use std::rc::Rc;

    use super::*;

    fn target() -> TerminalTarget {
        console::set_colors_enabled(false);
        TerminalTarget::new(MultiProgress::with_draw_target(
            amanai_cli_utils::ProgressDrawTarget::hidden(),
        ))
    }

    #[test]
    fn summary_lists_counters_layers_and_charts() {
        let target = Rc::new(target());
        target.set_text(StatField::Total, &StatValue::Int(3).to_string());
        target.set_text(StatField::HighPct, "66.7%");
        target.draw(
            LayerKind::Heatmap,
            &MapPrimitive::Heat {
                points: vec![
                    HeatSample {
                        position: Position { lat: 24.7, lng: 46.7 },
                        weight: 3,
                    };
                    4
                ],
                radius: 25,
            },
        );
        AggregateView::new(Rc::clone(&target)).render_charts(RiskCounts {
            low: 0,
            medium: 1,
            high: 2,
        });

        let summary = target.summary();
        assert!(summary.contains("Total incidents"));
        assert!(summary.contains("66.7%"));
        let last_hour = summary.lines().find(|l| l.starts_with("Last hour")).unwrap();
        assert!(last_hour.ends_with(PLACEHOLDER));
        assert!(summary.contains("4 heat points"));
        assert!(summary.contains("2 (66%)"));
    }

    #[test]
    fn table_shows_rows_in_given_order() {
        let target = target();
        assert_eq!(target.table(), "No incidents.");

        let incidents: Vec<Incident> = (1..=2)
            .map(|id| Incident {
                id: Some(id),
                incident_type: Some("a very long incident type name".to_string()),
                ..Incident::default()
            })
            .collect();
        target.set_table(&table_rows(&incidents, TableOrder::NewestFirst));

        let table = target.table();
        let ids: Vec<&str> = table
            .lines()
            .skip(2)
            .filter_map(|line| line.split_whitespace().next())
            .collect();
        assert_eq!(ids.first(), Some(&"2"));
        assert!(table.contains("a very long incid…"));
        assert!(table.ends_with("2 incident(s)"));
    }

    #[test]
    fn clip_respects_char_boundaries() {
        assert_eq!(clip("مرتفع", 10), "مرتفع");
        assert_eq!(clip("مرتفع جدا", 4), "مرت…");
    }
}
