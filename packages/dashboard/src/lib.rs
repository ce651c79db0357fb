#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Layer orchestration and fetch-render synchronization.
//!
//! The [`Orchestrator`] wires user commands (toggle a layer, submit or
//! delete an incident, trigger detection, export) and scheduled refreshes
//! to [`amanai_gateway::Gateway`] calls, the layer registry and the
//! aggregate view. It owns the current incident snapshot and never lets a
//! gateway failure escape: every failure becomes a [`Notice`] and leaves
//! the previously rendered state untouched.
//!
//! Everything runs on one thread. Concurrent operations interleave only
//! at `.await` points, so shared state lives in `RefCell`s whose borrows
//! never span an await.

pub mod config;
pub mod orchestrator;

use amanai_gateway::GatewayError;
use amanai_incident_models::ValidationError;
use amanai_map::MapSurface;
use amanai_render::{ChartSurface, DisplaySurface};
use serde::Serialize;
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

pub use config::{ConfigError, DashboardConfig};
pub use orchestrator::Orchestrator;

/// Errors returned from orchestrator write operations.
///
/// By the time one of these is returned it has already been shown to the
/// user as a [`Notice`].
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Manual entry rejected before any network call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The backend call failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Severity of a user-visible notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum NoticeLevel {
    /// Confirmation of a completed action.
    Info,
    /// A fetch or write failed.
    Error,
    /// Manual entry rejected; shown inline next to the form.
    Validation,
}

/// A transient, non-blocking notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Text shown to the user.
    pub message: String,
}

impl Notice {
    /// An informational notice.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    /// A failure notice.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// An inline validation message.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Validation,
            message: message.into(),
        }
    }
}

/// Notification capability of the dashboard page.
pub trait Notifier {
    /// Shows `notice` without blocking.
    fn notify(&self, notice: &Notice);
}

/// Everything the orchestrator needs from a presentation layer.
pub trait RenderTarget: MapSurface + ChartSurface + DisplaySurface + Notifier {}

impl<T: MapSurface + ChartSurface + DisplaySurface + Notifier> RenderTarget for T {}
