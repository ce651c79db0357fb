//! Top-level coordinator.
//!
//! Per layer kind the lifecycle is `Hidden -> Loading -> Shown`, back to
//! `Hidden` on toggle-off, or `Failed` (hidden, with a notice) when the
//! fetch fails. The registry tracks that state; this module decides what
//! to fetch, what to render from it, and what to tell the user.
//!
//! The incident snapshot and the stats aggregate each carry a generation
//! counter: a response is applied only if no newer request for the same
//! resource was issued while it was in flight.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use amanai_gateway::{Gateway, GatewayError, Report};
use amanai_incident_models::{Incident, LayerKind, ManualIncident};
use amanai_map::{LayerOutcome, LayerRegistry, LayerStatus, MapPrimitive};
use amanai_render::marker::{heatmap_layer, incident_layer, patrol_layer, traffic_layer};
use amanai_render::table::table_rows;
use amanai_render::{
    AggregateView, TableOrder, compute_counts, render_stats, stats_or_fallback,
};
use chrono::Utc;
use futures::future::{join, join_all};

use crate::{DashboardError, Notice, RenderTarget};

/// Where the currently displayed counters came from.
#[derive(Debug)]
enum StatsSource {
    /// Nothing rendered yet.
    Unavailable,
    /// Last usable backend aggregate.
    Backend,
    /// Computed from the incident snapshot; recomputed whenever it changes.
    Fallback,
}

/// Coordinates gateway fetches, the layer registry and the aggregate view.
pub struct Orchestrator<G: Gateway, T: RenderTarget> {
    gateway: G,
    target: Rc<T>,
    layers: LayerRegistry<T>,
    aggregate: AggregateView<T>,
    table_order: TableOrder,
    snapshot: RefCell<Rc<[Incident]>>,
    snapshot_generation: Cell<u64>,
    stats: RefCell<StatsSource>,
    stats_generation: Cell<u64>,
}

#[allow(clippy::future_not_send)]
impl<G: Gateway, T: RenderTarget> Orchestrator<G, T> {
    /// Creates an orchestrator rendering onto `target`. Nothing is fetched
    /// until [`Self::load`] or [`Self::start`] is called.
    pub fn new(gateway: G, target: Rc<T>) -> Self {
        Self {
            gateway,
            layers: LayerRegistry::new(Rc::clone(&target)),
            aggregate: AggregateView::new(Rc::clone(&target)),
            target,
            table_order: TableOrder::default(),
            snapshot: RefCell::new(Rc::from(Vec::new())),
            snapshot_generation: Cell::new(0),
            stats: RefCell::new(StatsSource::Unavailable),
            stats_generation: Cell::new(0),
        }
    }

    /// Sets the incident table ordering.
    #[must_use]
    pub fn with_table_order(mut self, order: TableOrder) -> Self {
        self.table_order = order;
        self
    }

    /// The gateway this orchestrator fetches through.
    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    /// The last successfully fetched incident snapshot, in backend order.
    #[must_use]
    pub fn incidents(&self) -> Rc<[Incident]> {
        Rc::clone(&self.snapshot.borrow())
    }

    /// Lifecycle state of one layer kind.
    #[must_use]
    pub fn layer_status(&self, kind: LayerKind) -> LayerStatus {
        self.layers.status(kind)
    }

    /// Number of primitives currently drawn for one layer kind.
    #[must_use]
    pub fn primitive_count(&self, kind: LayerKind) -> usize {
        self.layers.primitive_count(kind)
    }

    /// Page-load fetch: incidents and stats, regardless of layer state.
    pub async fn load(&self) {
        self.refresh_data().await;
    }

    /// Runs [`Self::load`], then shows `initial_layers`.
    ///
    /// The incidents layer is drawn from the freshly loaded snapshot
    /// instead of being fetched a second time.
    pub async fn start(&self, initial_layers: &[LayerKind]) {
        self.load().await;

        let mut fetches = Vec::new();
        for kind in initial_layers.iter().copied() {
            if kind == LayerKind::Incidents {
                self.layers.show(kind, incident_layer(&self.incidents()));
            } else {
                fetches.push(self.refresh_layer(kind));
            }
        }
        join_all(fetches).await;
    }

    /// Hides `kind` if shown or loading, otherwise fetches and shows it.
    pub async fn toggle_layer(&self, kind: LayerKind) -> LayerStatus {
        let result = self.layers.toggle(kind, || self.build_layer(kind)).await;
        self.settle(kind, result)
    }

    /// Re-fetches `kind` and shows the result.
    pub async fn refresh_layer(&self, kind: LayerKind) -> LayerStatus {
        let result = self.layers.refresh(kind, || self.build_layer(kind)).await;
        self.settle(kind, result)
    }

    /// Re-fetches incidents and stats concurrently. The incidents layer
    /// is redrawn only if it is currently wanted on the map.
    pub async fn refresh_data(&self) {
        join(self.refresh_incidents(), self.refresh_stats()).await;
    }

    /// Periodic refresh: incidents, stats and every other visible layer.
    pub async fn refresh_all(&self) {
        let layers: Vec<_> = self
            .layers
            .desired_kinds()
            .into_iter()
            .filter(|kind| *kind != LayerKind::Incidents)
            .map(|kind| self.refresh_layer(kind))
            .collect();
        join(self.refresh_data(), join_all(layers)).await;
    }

    /// Calls [`Self::refresh_all`] every `every` until `stop` resolves.
    ///
    /// A refresh still in flight when `stop` resolves is abandoned.
    pub async fn run_periodic(&self, every: Duration, stop: impl Future<Output = ()>) {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;
        tokio::pin!(stop);

        log::info!("Refreshing every {every:?}");
        loop {
            tokio::select! {
                () = &mut stop => break,
                _ = ticker.tick() => {}
            }
            log::debug!("Periodic refresh");
            tokio::select! {
                () = &mut stop => break,
                () = self.refresh_all() => {}
            }
        }
        log::info!("Periodic refresh stopped");
    }

    /// Validates and submits a manual incident, then refreshes.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Validation`] without any network call if
    /// the form is incomplete, or [`DashboardError::Gateway`] if the
    /// backend call fails. Either has already been shown as a notice.
    pub async fn submit_incident(&self, form: &ManualIncident) -> Result<(), DashboardError> {
        let payload = form.validate().map_err(|e| {
            log::debug!("Rejected manual incident: {e}");
            self.target.notify(&Notice::validation(e.to_string()));
            e
        })?;
        self.write(
            self.gateway.submit_incident(&payload),
            "Could not submit incident",
            "Incident submitted".to_string(),
        )
        .await
    }

    /// Deletes one incident, then refreshes.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Gateway`] if the backend call fails.
    pub async fn delete_incident(&self, id: i64) -> Result<(), DashboardError> {
        self.write(
            self.gateway.delete_incident(id),
            "Could not delete incident",
            format!("Incident #{id} deleted"),
        )
        .await
    }

    /// Deletes every incident, then refreshes.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Gateway`] if the backend call fails.
    pub async fn clear_incidents(&self) -> Result<(), DashboardError> {
        self.write(
            self.gateway.clear_incidents(),
            "Could not clear incidents",
            "All incidents cleared".to_string(),
        )
        .await
    }

    /// Triggers backend AI traffic detection, then refreshes.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Gateway`] if the backend call fails.
    pub async fn detect_traffic(&self) -> Result<(), DashboardError> {
        self.write(
            self.gateway.detect_traffic(),
            "Traffic analysis failed",
            "Traffic analysed, new incidents added".to_string(),
        )
        .await
    }

    /// Downloads the incident report.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Gateway`] if the download fails.
    pub async fn export_report(&self) -> Result<Report, DashboardError> {
        self.gateway.export_report().await.map_err(|e| {
            self.report_failure("Could not export report", &e);
            e.into()
        })
    }

    /// Disposes every layer and chart.
    pub fn reset(&self) {
        self.layers.clear_all();
        self.aggregate.clear();
        log::info!("Dashboard reset");
    }

    async fn write(
        &self,
        operation: impl Future<Output = Result<(), GatewayError>>,
        failure: &str,
        success: String,
    ) -> Result<(), DashboardError> {
        match operation.await {
            Ok(()) => {
                self.target.notify(&Notice::info(success));
                self.refresh_data().await;
                Ok(())
            }
            Err(e) => {
                self.report_failure(failure, &e);
                Err(e.into())
            }
        }
    }

    async fn build_layer(&self, kind: LayerKind) -> Result<Vec<MapPrimitive>, GatewayError> {
        Ok(match kind {
            LayerKind::Incidents => {
                let snapshot = match self.fetch_snapshot().await? {
                    Some(snapshot) => snapshot,
                    None => self.incidents(),
                };
                incident_layer(&snapshot)
            }
            LayerKind::Traffic => traffic_layer(&self.gateway.fetch_traffic().await?),
            LayerKind::Patrol => patrol_layer(&self.gateway.fetch_patrols().await?),
            LayerKind::Heatmap => heatmap_layer(&self.gateway.fetch_heatmap().await?),
        })
    }

    fn settle(&self, kind: LayerKind, result: Result<LayerOutcome, GatewayError>) -> LayerStatus {
        match result {
            Ok(LayerOutcome::Shown(count)) => {
                log::info!("{} layer shown ({count} primitives)", kind.title());
            }
            Ok(LayerOutcome::Hidden) => log::info!("{} layer hidden", kind.title()),
            Ok(LayerOutcome::Superseded) => {
                log::debug!("{} fetch superseded by a newer request", kind.title());
            }
            Err(e) => self.report_failure(&format!("Could not load {}", kind.title()), &e),
        }
        self.layers.status(kind)
    }

    async fn refresh_incidents(&self) -> bool {
        match self.fetch_snapshot().await {
            Ok(Some(snapshot)) => {
                if self.layers.is_desired(LayerKind::Incidents) {
                    self.layers
                        .show(LayerKind::Incidents, incident_layer(&snapshot));
                }
                true
            }
            Ok(None) => false,
            Err(e) => {
                self.report_failure("Could not load incidents", &e);
                false
            }
        }
    }

    /// Fetches incidents and installs them as the snapshot, rerendering
    /// the table, charts and any fallback stats. Returns `None` if a newer
    /// fetch was issued meanwhile.
    async fn fetch_snapshot(&self) -> Result<Option<Rc<[Incident]>>, GatewayError> {
        let generation = next_generation(&self.snapshot_generation);
        let result = self.gateway.fetch_incidents().await;
        if self.snapshot_generation.get() != generation {
            log::info!("Discarding superseded incidents response");
            return Ok(None);
        }

        let snapshot: Rc<[Incident]> = Rc::from(result?);
        *self.snapshot.borrow_mut() = Rc::clone(&snapshot);

        self.target
            .set_table(&table_rows(&snapshot, self.table_order));
        self.aggregate.render_charts(compute_counts(&snapshot));
        if !matches!(*self.stats.borrow(), StatsSource::Backend) {
            self.render_fallback_stats();
        }
        log::debug!("Incident snapshot replaced ({} incidents)", snapshot.len());

        Ok(Some(snapshot))
    }

    async fn refresh_stats(&self) -> bool {
        let generation = next_generation(&self.stats_generation);
        let result = self.gateway.fetch_stats().await;
        if self.stats_generation.get() != generation {
            log::info!("Discarding superseded stats response");
            return false;
        }

        match result {
            Ok(stats) => {
                let from_backend = stats.is_usable();
                if !from_backend {
                    log::warn!("Backend stats carry no total, using client-side counts");
                }
                let shown = stats_or_fallback(Some(stats), &self.incidents(), Utc::now());
                render_stats(&*self.target, &shown);
                *self.stats.borrow_mut() = if from_backend {
                    StatsSource::Backend
                } else {
                    StatsSource::Fallback
                };
                true
            }
            Err(e) => {
                self.report_failure("Could not load dashboard stats", &e);
                if !matches!(*self.stats.borrow(), StatsSource::Backend) {
                    self.render_fallback_stats();
                }
                false
            }
        }
    }

    fn render_fallback_stats(&self) {
        let stats = stats_or_fallback(None, &self.incidents(), Utc::now());
        render_stats(&*self.target, &stats);
        *self.stats.borrow_mut() = StatsSource::Fallback;
    }

    fn report_failure(&self, context: &str, error: &GatewayError) {
        if error.is_decode() {
            log::error!("{context}: {error}");
        } else {
            log::warn!("{context}: {error}");
        }
        self.target.notify(&Notice::error(format!("{context}: {error}")));
    }
}

fn next_generation(counter: &Cell<u64>) -> u64 {
    let generation = counter.get() + 1;
    counter.set(generation);
    generation
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use amanai_gateway::Report;
    use amanai_incident_models::{
        DashboardStats, HeatPoint, NewIncident, PatrolZone, StatValue, TrafficHotspot,
    };
    use amanai_map::{MapSurface, MemoryMap, PrimitiveId};
    use amanai_render::{
        ChartId, ChartSlot, ChartSpec, ChartSurface, DisplaySurface, MemoryCharts, StatField,
        TableRow,
    };
    use async_trait::async_trait;
    use tokio::sync::oneshot;

    use super::*;
    use crate::{NoticeLevel, Notifier};

    fn scripted_failure(what: &str) -> GatewayError {
        GatewayError::Decode {
            url: format!("http://backend/{what}"),
            message: "scripted failure".to_string(),
        }
    }

    #[derive(Default)]
    struct FakeGateway {
        incidents: RefCell<Vec<Incident>>,
        stats: RefCell<Option<DashboardStats>>,
        traffic: RefCell<Option<Vec<TrafficHotspot>>>,
        fail_incidents: Cell<bool>,
        fail_writes: Cell<bool>,
        traffic_gate: RefCell<Option<oneshot::Receiver<()>>>,
        calls: RefCell<BTreeMap<&'static str, usize>>,
    }

    impl FakeGateway {
        fn record(&self, name: &'static str) {
            *self.calls.borrow_mut().entry(name).or_default() += 1;
        }

        fn calls(&self, name: &str) -> usize {
            self.calls.borrow().get(name).copied().unwrap_or(0)
        }

        fn ack(&self, name: &'static str) -> Result<(), GatewayError> {
            self.record(name);
            if self.fail_writes.get() {
                Err(scripted_failure(name))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait(?Send)]
    impl Gateway for FakeGateway {
        async fn fetch_stats(&self) -> Result<DashboardStats, GatewayError> {
            self.record("fetch_stats");
            self.stats
                .borrow()
                .clone()
                .ok_or_else(|| scripted_failure("dashboard-stats"))
        }

        async fn fetch_incidents(&self) -> Result<Vec<Incident>, GatewayError> {
            self.record("fetch_incidents");
            if self.fail_incidents.get() {
                return Err(scripted_failure("incidents"));
            }
            Ok(self.incidents.borrow().clone())
        }

        async fn submit_incident(&self, incident: &NewIncident) -> Result<(), GatewayError> {
            self.ack("submit_incident")?;
            self.incidents.borrow_mut().push(Incident {
                id: Some(100),
                incident_type: Some(incident.incident_type.clone()),
                lat: Some(incident.lat),
                lng: Some(incident.lng),
                ..Incident::default()
            });
            Ok(())
        }

        async fn delete_incident(&self, id: i64) -> Result<(), GatewayError> {
            self.ack("delete_incident")?;
            self.incidents.borrow_mut().retain(|i| i.id != Some(id));
            Ok(())
        }

        async fn clear_incidents(&self) -> Result<(), GatewayError> {
            self.ack("clear_incidents")?;
            self.incidents.borrow_mut().clear();
            Ok(())
        }

        async fn fetch_traffic(&self) -> Result<Vec<TrafficHotspot>, GatewayError> {
            self.record("fetch_traffic");
            let gate = self.traffic_gate.borrow_mut().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            self.traffic
                .borrow()
                .clone()
                .ok_or_else(|| scripted_failure("traffic-hotspots"))
        }

        async fn fetch_patrols(&self) -> Result<Vec<PatrolZone>, GatewayError> {
            self.record("fetch_patrols");
            Ok(vec![PatrolZone {
                lat: Some(24.7),
                lng: Some(46.7),
                valid_until: None,
            }])
        }

        async fn fetch_heatmap(&self) -> Result<Vec<HeatPoint>, GatewayError> {
            self.record("fetch_heatmap");
            Err(scripted_failure("heatmap"))
        }

        async fn detect_traffic(&self) -> Result<(), GatewayError> {
            self.ack("detect_traffic")?;
            self.incidents.borrow_mut().push(incident(200, "مرتفع"));
            Ok(())
        }

        async fn export_report(&self) -> Result<Report, GatewayError> {
            self.record("export_report");
            Ok(Report {
                content_type: Some("application/pdf".to_string()),
                bytes: b"%PDF".to_vec(),
            })
        }
    }

    #[derive(Default)]
    struct FakeTarget {
        map: MemoryMap,
        charts: MemoryCharts,
        texts: RefCell<BTreeMap<StatField, String>>,
        rows: RefCell<Vec<TableRow>>,
        notices: RefCell<Vec<Notice>>,
    }

    impl FakeTarget {
        fn text(&self, field: StatField) -> String {
            self.texts.borrow().get(&field).cloned().unwrap_or_default()
        }

        fn notices_of(&self, level: NoticeLevel) -> usize {
            self.notices
                .borrow()
                .iter()
                .filter(|n| n.level == level)
                .count()
        }
    }

    impl MapSurface for FakeTarget {
        fn draw(&self, kind: LayerKind, primitive: &MapPrimitive) -> PrimitiveId {
            self.map.draw(kind, primitive)
        }

        fn remove(&self, id: PrimitiveId) {
            self.map.remove(id);
        }
    }

    impl ChartSurface for FakeTarget {
        fn draw_chart(&self, slot: ChartSlot, spec: &ChartSpec) -> ChartId {
            self.charts.draw_chart(slot, spec)
        }

        fn destroy_chart(&self, id: ChartId) {
            self.charts.destroy_chart(id);
        }
    }

    impl DisplaySurface for FakeTarget {
        fn set_text(&self, field: StatField, text: &str) {
            self.texts.borrow_mut().insert(field, text.to_string());
        }

        fn set_table(&self, rows: &[TableRow]) {
            *self.rows.borrow_mut() = rows.to_vec();
        }
    }

    impl Notifier for FakeTarget {
        fn notify(&self, notice: &Notice) {
            self.notices.borrow_mut().push(notice.clone());
        }
    }

    fn incident(id: i64, risk: &str) -> Incident {
        Incident {
            id: Some(id),
            predicted_risk: Some(risk.to_string()),
            lat: Some(24.7),
            lng: Some(46.7),
            ..Incident::default()
        }
    }

    fn hotspots(n: usize) -> Vec<TrafficHotspot> {
        vec![
            TrafficHotspot {
                lat: Some(24.7),
                lng: Some(46.7),
                level: Some("مرتفع".to_string()),
            };
            n
        ]
    }

    fn setup() -> (Rc<FakeTarget>, Orchestrator<FakeGateway, FakeTarget>) {
        let gateway = FakeGateway::default();
        *gateway.incidents.borrow_mut() = vec![
            incident(1, "مرتفع"),
            incident(2, "مرتفع"),
            incident(3, "متوسط"),
        ];
        *gateway.stats.borrow_mut() = Some(DashboardStats {
            total: Some(StatValue::Int(3)),
            high: Some(StatValue::Int(2)),
            last_hour: Some(StatValue::Int(1)),
            high_pct: Some(StatValue::Float(66.7)),
            ..DashboardStats::default()
        });
        *gateway.traffic.borrow_mut() = Some(hotspots(3));

        let target = Rc::new(FakeTarget::default());
        let orchestrator = Orchestrator::new(gateway, Rc::clone(&target));
        (target, orchestrator)
    }

    #[tokio::test]
    async fn load_renders_table_charts_and_stats() {
        let (target, dash) = setup();
        dash.load().await;

        let ids: Vec<_> = target.rows.borrow().iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec!["3", "2", "1"]);
        assert_eq!(target.text(StatField::Total), "3");
        assert_eq!(target.text(StatField::HighPct), "66.7%");

        let pie = target.charts.latest(ChartSlot::Distribution).unwrap();
        assert_eq!(pie.values, vec![0, 1, 2]);
        assert_eq!(target.map.total(), 0);
    }

    #[tokio::test]
    async fn traffic_toggle_on_and_off() {
        let (target, dash) = setup();

        assert_eq!(dash.toggle_layer(LayerKind::Traffic).await, LayerStatus::Shown);
        assert_eq!(target.map.count(LayerKind::Traffic), 3);
        assert_eq!(dash.primitive_count(LayerKind::Traffic), 3);

        assert_eq!(dash.toggle_layer(LayerKind::Traffic).await, LayerStatus::Hidden);
        assert_eq!(target.map.count(LayerKind::Traffic), 0);
        assert_eq!(dash.gateway().calls("fetch_traffic"), 1);
    }

    #[tokio::test]
    async fn failed_layer_fetch_notifies_and_stays_hidden() {
        let (target, dash) = setup();

        assert_eq!(dash.toggle_layer(LayerKind::Heatmap).await, LayerStatus::Failed);
        assert_eq!(target.map.count(LayerKind::Heatmap), 0);
        assert_eq!(target.notices_of(NoticeLevel::Error), 1);

        // A failed layer toggles on again rather than off.
        dash.toggle_layer(LayerKind::Heatmap).await;
        assert_eq!(dash.gateway().calls("fetch_heatmap"), 2);
    }

    #[tokio::test]
    async fn toggle_off_while_loading_ends_hidden() {
        let (target, dash) = setup();
        let (release, gate) = oneshot::channel();
        *dash.gateway().traffic_gate.borrow_mut() = Some(gate);

        let on = dash.toggle_layer(LayerKind::Traffic);
        let off = async {
            tokio::task::yield_now().await;
            assert_eq!(dash.layer_status(LayerKind::Traffic), LayerStatus::Loading);
            let status = dash.toggle_layer(LayerKind::Traffic).await;
            release.send(()).unwrap();
            status
        };

        let (late, off) = tokio::join!(on, off);
        assert_eq!(off, LayerStatus::Hidden);
        assert_eq!(late, LayerStatus::Hidden);
        assert_eq!(target.map.count(LayerKind::Traffic), 0);
        assert_eq!(target.notices_of(NoticeLevel::Error), 0);
    }

    #[tokio::test]
    async fn patrol_and_traffic_resolve_independently() {
        let (target, dash) = setup();
        let (release, gate) = oneshot::channel();
        *dash.gateway().traffic_gate.borrow_mut() = Some(gate);

        let traffic = dash.toggle_layer(LayerKind::Traffic);
        let patrol = async {
            let status = dash.toggle_layer(LayerKind::Patrol).await;
            release.send(()).unwrap();
            status
        };

        let (traffic, patrol) = tokio::join!(traffic, patrol);
        assert_eq!((traffic, patrol), (LayerStatus::Shown, LayerStatus::Shown));
        assert_eq!(target.map.count(LayerKind::Traffic), 3);
        assert_eq!(target.map.count(LayerKind::Patrol), 1);
    }

    #[tokio::test]
    async fn missing_latitude_is_rejected_locally() {
        let (target, dash) = setup();
        let form = ManualIncident {
            incident_type: "collision".to_string(),
            lat: String::new(),
            lng: "46.7".to_string(),
            ..ManualIncident::default()
        };

        let err = dash.submit_incident(&form).await.unwrap_err();
        assert!(matches!(err, DashboardError::Validation(_)));
        assert_eq!(target.notices_of(NoticeLevel::Validation), 1);
        assert!(dash.gateway().calls.borrow().is_empty());
    }

    #[tokio::test]
    async fn delete_refreshes_incidents_and_stats_once() {
        let (target, dash) = setup();

        dash.delete_incident(2).await.unwrap();

        let gateway = dash.gateway();
        assert_eq!(gateway.calls("delete_incident"), 1);
        assert_eq!(gateway.calls("fetch_incidents"), 1);
        assert_eq!(gateway.calls("fetch_stats"), 1);
        assert_eq!(dash.incidents().len(), 2);
        assert_eq!(target.rows.borrow().len(), 2);
        assert_eq!(target.notices_of(NoticeLevel::Info), 1);
    }

    #[tokio::test]
    async fn failed_write_skips_refresh() {
        let (target, dash) = setup();
        dash.gateway().fail_writes.set(true);

        assert!(dash.clear_incidents().await.is_err());
        assert_eq!(dash.gateway().calls("fetch_incidents"), 0);
        assert_eq!(target.notices_of(NoticeLevel::Error), 1);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let (target, dash) = setup();
        dash.load().await;
        dash.gateway().fail_incidents.set(true);
        dash.gateway().incidents.borrow_mut().clear();

        dash.refresh_data().await;

        assert_eq!(dash.incidents().len(), 3);
        assert_eq!(target.rows.borrow().len(), 3);
        assert_eq!(target.charts.count(ChartSlot::Magnitude), 1);
        assert_eq!(target.notices_of(NoticeLevel::Error), 1);
    }

    #[tokio::test]
    async fn stats_fall_back_to_snapshot_counts() {
        let (target, dash) = setup();
        *dash.gateway().stats.borrow_mut() = None;

        dash.load().await;

        assert_eq!(target.text(StatField::Total), "3");
        assert_eq!(target.text(StatField::High), "2");
        assert_eq!(target.text(StatField::HighPct), "66.7%");
        assert_eq!(target.notices_of(NoticeLevel::Error), 1);
    }

    #[tokio::test]
    async fn backend_stats_survive_a_failed_stats_refresh() {
        let (target, dash) = setup();
        dash.load().await;
        *dash.gateway().stats.borrow_mut() = None;
        dash.gateway().incidents.borrow_mut().pop();

        dash.refresh_data().await;

        assert_eq!(target.text(StatField::Total), "3");
        assert_eq!(dash.incidents().len(), 2);
    }

    #[tokio::test]
    async fn visible_incident_layer_follows_writes() {
        let (target, dash) = setup();

        assert_eq!(dash.toggle_layer(LayerKind::Incidents).await, LayerStatus::Shown);
        assert_eq!(target.map.count(LayerKind::Incidents), 3);

        dash.detect_traffic().await.unwrap();
        assert_eq!(target.map.count(LayerKind::Incidents), 4);
        assert_eq!(dash.gateway().calls("fetch_incidents"), 2);
        assert_eq!(target.rows.borrow()[0].id, "200");
    }

    #[tokio::test]
    async fn hidden_incident_layer_stays_hidden_after_writes() {
        let (target, dash) = setup();

        let form = ManualIncident {
            incident_type: "fire".to_string(),
            lat: "24.7".to_string(),
            lng: "46.7".to_string(),
            ..ManualIncident::default()
        };
        dash.submit_incident(&form).await.unwrap();

        assert_eq!(target.map.count(LayerKind::Incidents), 0);
        assert_eq!(dash.incidents().len(), 4);
        assert_eq!(dash.layer_status(LayerKind::Incidents), LayerStatus::Hidden);
    }

    #[tokio::test]
    async fn start_draws_incidents_from_loaded_snapshot() {
        let (target, dash) = setup();

        dash.start(&[LayerKind::Incidents, LayerKind::Traffic]).await;

        assert_eq!(dash.gateway().calls("fetch_incidents"), 1);
        assert_eq!(target.map.count(LayerKind::Incidents), 3);
        assert_eq!(target.map.count(LayerKind::Traffic), 3);
    }

    #[tokio::test]
    async fn reset_disposes_layers_and_charts() {
        let (target, dash) = setup();
        dash.start(&[LayerKind::Incidents, LayerKind::Patrol]).await;

        dash.reset();

        assert_eq!(target.map.total(), 0);
        assert_eq!(target.charts.count(ChartSlot::Distribution), 0);
        assert_eq!(dash.layer_status(LayerKind::Patrol), LayerStatus::Hidden);
    }

    #[tokio::test]
    async fn export_returns_document() {
        let (_target, dash) = setup();
        let report = dash.export_report().await.unwrap();
        assert_eq!(report.extension(), "pdf");
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_refresh_ticks_until_stopped() {
        let (target, dash) = setup();
        dash.toggle_layer(LayerKind::Traffic).await;

        dash.run_periodic(
            Duration::from_secs(10),
            tokio::time::sleep(Duration::from_secs(35)),
        )
        .await;

        let gateway = dash.gateway();
        assert_eq!(gateway.calls("fetch_incidents"), 3);
        assert_eq!(gateway.calls("fetch_stats"), 3);
        assert_eq!(gateway.calls("fetch_traffic"), 4);
        assert_eq!(target.map.count(LayerKind::Traffic), 3);
    }

    #[tokio::test]
    async fn incident_layer_redraws_after_being_emptied() {
        let (target, dash) = setup();
        dash.toggle_layer(LayerKind::Incidents).await;

        dash.clear_incidents().await.unwrap();
        assert_eq!(target.map.count(LayerKind::Incidents), 0);
        assert_eq!(dash.layer_status(LayerKind::Incidents), LayerStatus::Shown);

        dash.detect_traffic().await.unwrap();
        assert_eq!(dash.incidents().len(), 1);
        assert_eq!(target.map.count(LayerKind::Incidents), dash.incidents().len());
        assert_eq!(dash.layer_status(LayerKind::Incidents), LayerStatus::Shown);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_traffic_survives_an_empty_poll() {
        let (target, dash) = setup();
        dash.toggle_layer(LayerKind::Traffic).await;

        let driver = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            *dash.gateway().traffic.borrow_mut() = Some(Vec::new());
            tokio::time::sleep(Duration::from_secs(10)).await;
            assert_eq!(target.map.count(LayerKind::Traffic), 0);
            assert_eq!(dash.layer_status(LayerKind::Traffic), LayerStatus::Shown);
            *dash.gateway().traffic.borrow_mut() = Some(hotspots(2));
        };
        tokio::join!(
            dash.run_periodic(
                Duration::from_secs(10),
                tokio::time::sleep(Duration::from_secs(25)),
            ),
            driver,
        );

        assert_eq!(dash.gateway().calls("fetch_traffic"), 3);
        assert_eq!(target.map.count(LayerKind::Traffic), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_abandons_a_hung_refresh() {
        let (_target, dash) = setup();
        dash.toggle_layer(LayerKind::Traffic).await;
        let (_never, gate) = oneshot::channel();
        *dash.gateway().traffic_gate.borrow_mut() = Some(gate);

        dash.run_periodic(
            Duration::from_secs(10),
            tokio::time::sleep(Duration::from_secs(15)),
        )
        .await;

        let gateway = dash.gateway();
        assert_eq!(gateway.calls("fetch_incidents"), 1);
        assert_eq!(gateway.calls("fetch_traffic"), 2);
    }
}
