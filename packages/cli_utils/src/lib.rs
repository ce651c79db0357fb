#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for the AmanAI dashboard.
//!
//! [`init_logger`] sets up `indicatif-log-bridge` so that `log::info!` and
//! friends are suspended while spinners redraw, and [`spinner`] creates the
//! spinner shown while a backend request is in flight.

use std::time::Duration;

use indicatif::ProgressStyle;

pub use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget};

/// Adds a spinner with `message` to `multi`.
///
/// Call [`ProgressBar::finish_and_clear`] once the request settles.
#[must_use]
pub fn spinner(multi: &MultiProgress, message: &str) -> ProgressBar {
    let bar = multi.add(ProgressBar::new_spinner());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());
    bar
}

/// Initializes the global logger wrapped in `indicatif-log-bridge` so that
/// log lines never tear through a spinner.
///
/// Returns the [`MultiProgress`] that all spinners must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    // Fails only if a logger was already installed (e.g., in tests).
    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_ok()
    {
        log::set_max_level(level);
    }

    multi
}
