#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Interactive terminal front end for the AmanAI operations dashboard.
//!
//! Loads the dashboard once at startup, then lets the user toggle map
//! layers, manage incidents, trigger AI traffic detection and export
//! reports from a menu. When a refresh interval is configured, incidents,
//! stats and every visible layer are re-fetched in the background while
//! the menu waits for input.
//!
//! Uses `indicatif-log-bridge` (via [`amanai_cli_utils::init_logger`]) so
//! that log lines and spinners never fight for the terminal.

mod menu;
mod terminal;

use std::path::PathBuf;
use std::rc::Rc;

use amanai_dashboard::{DashboardConfig, Orchestrator};
use amanai_gateway::HttpGateway;
use amanai_incident_models::LayerKind;
use clap::Parser;
use tokio::sync::oneshot;

use crate::menu::Session;
use crate::terminal::TerminalTarget;

#[derive(Parser)]
#[command(name = "amanai", about = "AmanAI live operations dashboard")]
struct Cli {
    /// Config file (defaults to `amanai.toml` in the working directory,
    /// if present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Backend base URL (overrides the config file and `AMANAI_API_URL`)
    #[arg(long)]
    api_url: Option<String>,
    /// Periodic refresh interval in seconds; 0 disables it
    #[arg(long)]
    refresh_secs: Option<u64>,
    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Layer to show at startup (repeatable, e.g. `--layer traffic`)
    #[arg(long = "layer", value_parser = parse_layer)]
    layers: Vec<LayerKind>,
}

fn parse_layer(raw: &str) -> Result<LayerKind, String> {
    raw.parse().map_err(|_| {
        let known: Vec<&str> = LayerKind::all().iter().map(AsRef::<str>::as_ref).collect();
        format!("unknown layer {raw:?} (expected one of: {})", known.join(", "))
    })
}

impl Cli {
    /// Applies command-line overrides on top of file and environment
    /// settings.
    fn apply(self, config: &mut DashboardConfig) {
        if let Some(url) = self.api_url {
            config.api_base_url = url;
        }
        if let Some(secs) = self.refresh_secs {
            config.refresh_interval_secs = Some(secs);
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout_secs = Some(secs);
        }
        if !self.layers.is_empty() {
            config.initial_layers = self.layers;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let multi = amanai_cli_utils::init_logger();

    let mut config = DashboardConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    log::info!("Using backend {}", config.api_base_url);

    let gateway = HttpGateway::new(config.gateway_config())?;
    let target = Rc::new(TerminalTarget::new(multi.clone()));
    let dashboard =
        Orchestrator::new(gateway, Rc::clone(&target)).with_table_order(config.table_order);

    println!("AmanAI Operations Dashboard");
    println!();

    let loading = amanai_cli_utils::spinner(&multi, "Loading dashboard");
    dashboard.start(&config.initial_layers).await;
    loading.finish_and_clear();
    target.print(&target.summary());

    let session = Session::new(&dashboard, &target, &multi, &config.export_dir);
    let Some(every) = config.refresh_interval() else {
        return menu::run(&session).await;
    };

    let (stop, stopped) = oneshot::channel::<()>();
    let (result, ()) = tokio::join!(
        async {
            let result = menu::run(&session).await;
            let _ = stop.send(());
            result
        },
        dashboard.run_periodic(every, async {
            let _ = stopped.await;
        }),
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "amanai",
            "--api-url",
            "http://localhost:8000",
            "--refresh-secs",
            "0",
            "--layer",
            "traffic",
            "--layer",
            "heatmap",
        ]);
        let mut config = DashboardConfig {
            refresh_interval_secs: Some(30),
            ..DashboardConfig::default()
        };

        cli.apply(&mut config);

        assert_eq!(config.api_base_url, "http://localhost:8000");
        assert_eq!(config.refresh_interval(), None);
        assert_eq!(
            config.initial_layers,
            vec![LayerKind::Traffic, LayerKind::Heatmap]
        );
    }

    #[test]
    fn unknown_layer_is_rejected() {
        assert!(Cli::try_parse_from(["amanai", "--layer", "weather"]).is_err());
        let message = parse_layer("weather").unwrap_err();
        assert!(message.contains("patrol"));
    }

    #[test]
    fn layer_flag_parses_known_kinds() {
        let cli = Cli::try_parse_from(["amanai", "--layer", "patrol"]).unwrap();
        assert_eq!(cli.layers, vec![LayerKind::Patrol]);
        assert!(cli.config.is_none());
    }
}
