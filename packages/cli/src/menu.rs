//! Interactive command loop.
//!
//! Prompts run on the blocking pool so that the periodic refresh keeps
//! ticking on the main thread while the user is choosing.

use std::error::Error;
use std::path::{Path, PathBuf};

use amanai_cli_utils::{MultiProgress, spinner};
use amanai_dashboard::Orchestrator;
use amanai_gateway::{HttpGateway, Report};
use amanai_incident_models::{LayerKind, ManualIncident};
use chrono::{DateTime, Utc};
use dialoguer::{Confirm, Input, Select};

use crate::terminal::TerminalTarget;

/// The dashboard as driven from the terminal.
pub type Dashboard = Orchestrator<HttpGateway, TerminalTarget>;

/// Top-level menu entries.
#[derive(Clone, Copy)]
enum Action {
    ShowDashboard,
    ShowIncidents,
    ToggleLayer,
    Refresh,
    Submit,
    Delete,
    Clear,
    Detect,
    Export,
    Reset,
    Quit,
}

impl Action {
    const ALL: &[Self] = &[
        Self::ShowDashboard,
        Self::ShowIncidents,
        Self::ToggleLayer,
        Self::Refresh,
        Self::Submit,
        Self::Delete,
        Self::Clear,
        Self::Detect,
        Self::Export,
        Self::Reset,
        Self::Quit,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::ShowDashboard => "Show dashboard",
            Self::ShowIncidents => "Show incident table",
            Self::ToggleLayer => "Toggle map layer",
            Self::Refresh => "Refresh now",
            Self::Submit => "Report incident",
            Self::Delete => "Delete incident",
            Self::Clear => "Clear all incidents",
            Self::Detect => "Run AI traffic detection",
            Self::Export => "Export report",
            Self::Reset => "Reset map",
            Self::Quit => "Quit",
        }
    }
}

/// Everything a menu handler needs.
pub struct Session<'a> {
    dashboard: &'a Dashboard,
    target: &'a TerminalTarget,
    multi: &'a MultiProgress,
    export_dir: &'a Path,
}

#[allow(clippy::future_not_send)]
impl<'a> Session<'a> {
    /// Bundles the handler context.
    #[must_use]
    pub const fn new(
        dashboard: &'a Dashboard,
        target: &'a TerminalTarget,
        multi: &'a MultiProgress,
        export_dir: &'a Path,
    ) -> Self {
        Self {
            dashboard,
            target,
            multi,
            export_dir,
        }
    }

    async fn handle(&self, action: Action) -> Result<(), Box<dyn Error>> {
        match action {
            Action::ShowDashboard => self.target.print(&self.target.summary()),
            Action::ShowIncidents => self.target.print(&self.target.table()),
            Action::ToggleLayer => self.toggle_layer().await?,
            Action::Refresh => {
                let bar = spinner(self.multi, "Refreshing");
                self.dashboard.refresh_all().await;
                bar.finish_and_clear();
                self.target.print(&self.target.summary());
            }
            Action::Submit => self.submit().await?,
            Action::Delete => self.delete().await?,
            Action::Clear => self.clear().await?,
            Action::Detect => {
                let bar = spinner(self.multi, "Analysing traffic");
                let result = self.dashboard.detect_traffic().await;
                bar.finish_and_clear();
                if let Err(e) = result {
                    log::debug!("Traffic detection failed: {e}");
                }
            }
            Action::Export => self.export().await,
            Action::Reset => {
                self.dashboard.reset();
                self.target.print("Map layers and charts cleared.");
            }
            Action::Quit => {}
        }
        Ok(())
    }

    async fn toggle_layer(&self) -> Result<(), Box<dyn Error>> {
        let labels: Vec<String> = LayerKind::all()
            .iter()
            .map(|kind| format!("{} ({})", kind.title(), self.dashboard.layer_status(*kind)))
            .collect();
        let idx = prompt(move || {
            Select::new()
                .with_prompt("Which layer?")
                .items(&labels)
                .default(0)
                .interact()
        })
        .await?;
        let kind = LayerKind::all()[idx];

        let bar = spinner(self.multi, &format!("Loading {}", kind.title()));
        let status = self.dashboard.toggle_layer(kind).await;
        bar.finish_and_clear();

        self.target.print(&format!("{}: {status}", kind.title()));
        Ok(())
    }

    async fn submit(&self) -> Result<(), Box<dyn Error>> {
        let form = prompt(|| {
            let field = |label: &str| {
                Input::<String>::new()
                    .with_prompt(label)
                    .allow_empty(true)
                    .interact_text()
            };
            Ok(ManualIncident {
                incident_type: field("Incident type")?,
                lat: field("Latitude")?,
                lng: field("Longitude")?,
                observed_risk: field("Observed risk (low/medium/high)")?,
                recommendation: field("Recommendation")?,
            })
        })
        .await?;

        let bar = spinner(self.multi, "Submitting incident");
        let result = self.dashboard.submit_incident(&form).await;
        bar.finish_and_clear();
        if let Err(e) = result {
            log::debug!("Incident not submitted: {e}");
        }
        Ok(())
    }

    async fn delete(&self) -> Result<(), Box<dyn Error>> {
        let candidates: Vec<(i64, String)> = self
            .target
            .rows()
            .into_iter()
            .filter_map(|row| {
                row.delete.map(|action| {
                    let label = format!(
                        "#{} {} ({}) {}",
                        row.id, row.incident_type, row.predicted_risk, row.time
                    );
                    (action.incident_id, label)
                })
            })
            .collect();
        if candidates.is_empty() {
            self.target.print("No incidents to delete.");
            return Ok(());
        }

        let mut labels: Vec<String> = candidates.iter().map(|(_, l)| l.clone()).collect();
        labels.push("Cancel".to_string());
        let idx = prompt(move || {
            Select::new()
                .with_prompt("Delete which incident?")
                .items(&labels)
                .default(0)
                .interact()
        })
        .await?;
        let Some((id, _)) = candidates.get(idx) else {
            return Ok(());
        };

        let bar = spinner(self.multi, &format!("Deleting incident #{id}"));
        let result = self.dashboard.delete_incident(*id).await;
        bar.finish_and_clear();
        if let Err(e) = result {
            log::debug!("Incident #{id} not deleted: {e}");
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), Box<dyn Error>> {
        let confirmed = prompt(|| {
            Confirm::new()
                .with_prompt("Delete every incident? This cannot be undone.")
                .default(false)
                .interact()
        })
        .await?;
        if !confirmed {
            self.target.print("Cancelled.");
            return Ok(());
        }

        let bar = spinner(self.multi, "Clearing incidents");
        let result = self.dashboard.clear_incidents().await;
        bar.finish_and_clear();
        if let Err(e) = result {
            log::debug!("Incidents not cleared: {e}");
        }
        Ok(())
    }

    async fn export(&self) {
        let bar = spinner(self.multi, "Downloading report");
        let result = self.dashboard.export_report().await;
        bar.finish_and_clear();

        let Ok(report) = result else {
            return;
        };
        match write_report(self.export_dir, &report, Utc::now()) {
            Ok(path) => self.target.print(&format!("Report saved to {}", path.display())),
            Err(e) => {
                log::error!("Failed to save report: {e}");
                self.target.print(&format!("Could not save report: {e}"));
            }
        }
    }
}

/// Runs the menu until the user quits.
///
/// # Errors
///
/// Returns an error if a prompt cannot be shown or is aborted.
#[allow(clippy::future_not_send)]
pub async fn run(session: &Session<'_>) -> Result<(), Box<dyn Error>> {
    let labels: Vec<&'static str> = Action::ALL.iter().map(Action::label).collect();

    loop {
        let items = labels.clone();
        let idx = prompt(move || {
            Select::new()
                .with_prompt("What would you like to do?")
                .items(&items)
                .default(0)
                .interact()
        })
        .await?;

        match Action::ALL[idx] {
            Action::Quit => return Ok(()),
            action => session.handle(action).await?,
        }
    }
}

/// Runs a blocking dialoguer prompt off the main thread.
async fn prompt<T: Send + 'static>(
    ask: impl FnOnce() -> dialoguer::Result<T> + Send + 'static,
) -> Result<T, Box<dyn Error>> {
    Ok(tokio::task::spawn_blocking(ask).await??)
}

/// Writes `report` into `dir` under a timestamped name.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created or the file
/// cannot be written.
pub fn write_report(dir: &Path, report: &Report, now: DateTime<Utc>) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!(
        "amanai-report-{}.{}",
        now.format("%Y%m%d-%H%M%S"),
        report.extension()
    ));
    std::fs::write(&path, &report.bytes)?;
    log::info!("Wrote {} bytes to {}", report.bytes.len(), path.display());
    Ok(path)
}
