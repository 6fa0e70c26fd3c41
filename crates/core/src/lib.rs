//! Core library for the Audio Visualiser application.
//!
//! The crate implements the real-time audio-to-graphics pipeline: a capture
//! source feeding a spectral analyzer, a cooperative frame loop, a registry
//! of pure per-mode renderers and the software surface they draw into. Each
//! module owns a distinct subsystem; the [`session::VisualizerSession`] ties
//! one of everything together for the lifetime of a running visualization.

pub mod analysis;
pub mod capture;
pub mod config;
pub mod control;
pub mod error;
pub mod render;
pub mod session;
pub mod surface;

pub use analysis::{FrequencySnapshot, SpectralAnalyzer, WaveformSnapshot};
pub use capture::{CaptureHandle, CaptureSource, MicrophoneSource, SampleRing, SyntheticSource};
pub use config::{AnalyzerConfig, AppConfig, AudioConfig, DisplayConfig};
pub use control::{catalog, ControlAck, ControlPlane, RunStatus, StatusMap, VisualizationInfo};
pub use error::{Result, VisualiserError};
pub use render::{render, FrameInput, RenderMode};
pub use session::{FrameLoop, RenderTarget, RunState, VisualizerSession};
pub use surface::{hsl, Rgba, Surface, SurfaceDimensions};
