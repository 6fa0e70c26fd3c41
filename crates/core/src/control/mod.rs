//! Control-plane wire contract.
//!
//! The catalog listing and start/stop endpoints live in an external
//! collaborator; this module pins down the JSON payloads both sides agree
//! on, plus the built-in catalog of rendering modes. The core itself never
//! opens a network surface.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::render::RenderMode;
use crate::{Result, VisualiserError};

/// One catalog entry, as served by `GET /api/visualizations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualizationInfo {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// Run state of one visualization, as reported by `GET /api/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Stopped,
}

/// Status payload: visualization id to run state.
pub type StatusMap = BTreeMap<String, RunStatus>;

/// Response to `POST /api/start/{id}` and `POST /api/stop/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlAck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ControlAck {
    pub fn started() -> Self {
        Self {
            status: Some("started".into()),
            message: None,
        }
    }

    pub fn stopped() -> Self {
        Self {
            status: Some("stopped".into()),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: Some(message.into()),
        }
    }

    /// Interprets the ack against the status the caller expected. Anything
    /// else is a rejected control request; the caller must leave its local
    /// state unchanged so the UI never claims a transition the server did
    /// not perform.
    pub fn into_result(self, expected: &str) -> Result<()> {
        if self.status.as_deref() == Some(expected) {
            return Ok(());
        }
        Err(VisualiserError::control(
            self.message
                .unwrap_or_else(|| format!("control plane did not report '{expected}'")),
        ))
    }
}

/// What the control-plane collaborator must provide.
pub trait ControlPlane {
    fn start(&mut self, id: &str) -> Result<ControlAck>;
    fn stop(&mut self, id: &str) -> Result<ControlAck>;
    fn status(&mut self) -> Result<StatusMap>;
}

/// The built-in catalog: one entry per rendering mode.
pub fn catalog() -> Vec<VisualizationInfo> {
    RenderMode::ALL
        .iter()
        .map(|&mode| {
            let (name, description) = describe(mode);
            VisualizationInfo {
                id: mode.id().to_string(),
                name: name.to_string(),
                description: description.to_string(),
            }
        })
        .collect()
}

fn describe(mode: RenderMode) -> (&'static str, &'static str) {
    match mode {
        RenderMode::FrequencyBands => (
            "Frequency Bands",
            "Colored bars tracking the energy of each frequency band",
        ),
        RenderMode::Waveform => (
            "Waveform",
            "Real-time trace of the raw audio signal",
        ),
        RenderMode::Spectrum => (
            "Spectrum",
            "Full-spectrum bars swept through the color wheel",
        ),
        RenderMode::CoolSphere => (
            "Cool Sphere",
            "Concentric circles pulsing with the overall loudness",
        ),
        RenderMode::Psychadelic => (
            "Psychedelic",
            "Rotating radial gradient with treble-triggered bursts",
        ),
        RenderMode::Default => (
            "Classic Bars",
            "Understated bars used when no other mode matches",
        ),
    }
}
