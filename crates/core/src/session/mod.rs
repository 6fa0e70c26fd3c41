//! Session lifecycle and the render frame loop.
//!
//! A [`VisualizerSession`] owns exactly one capture handle, one analyzer,
//! one surface and one frame loop, tied 1:1 to a running visualization.
//! The loop is cooperative: the driver calls [`VisualizerSession::tick`]
//! once per display refresh on a single thread, so no renderer ever runs
//! concurrently with another and a tick in flight always finishes its draw.

use std::time::Duration;

use crate::analysis::SpectralAnalyzer;
use crate::capture::{CaptureHandle, CaptureSource};
use crate::config::AnalyzerConfig;
use crate::control::RunStatus;
use crate::render::{render, FrameInput, RenderMode};
use crate::surface::{Rgba, Surface, SurfaceDimensions};
use crate::Result;

/// Capture lifecycle of one visualization instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No device held, no loop scheduled.
    Idle,
    /// Device open, loop scheduled, surface live.
    Capturing,
}

/// Where frames are produced: by this core, or by the legacy external
/// process path this core merely observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    Local,
    External,
}

/// Proof that a tick was issued by the current schedule. Tokens from before
/// the last cancel never draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleToken(u64);

/// The frame loop's schedule state.
///
/// One schedule exists at a time; a tick scheduled before the last cancel
/// holds a stale token and is never permitted to draw.
#[derive(Debug)]
pub struct FrameLoop {
    scheduled: bool,
    generation: u64,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self {
            scheduled: false,
            generation: 0,
        }
    }

    /// Schedules the loop, or returns the live token if already scheduled.
    pub fn schedule(&mut self) -> ScheduleToken {
        if !self.scheduled {
            self.scheduled = true;
            self.generation += 1;
        }
        ScheduleToken(self.generation)
    }

    /// Cancels the pending reschedule. Idempotent.
    pub fn cancel(&mut self) {
        if self.scheduled {
            self.scheduled = false;
            self.generation += 1;
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    /// Whether a tick holding `token` may run.
    pub fn permits(&self, token: ScheduleToken) -> bool {
        self.scheduled && token.0 == self.generation
    }
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

/// One running (or idle) visualization.
pub struct VisualizerSession {
    analyzer_config: AnalyzerConfig,
    mode: RenderMode,
    target: RenderTarget,
    state: RunState,
    capture: Option<CaptureHandle>,
    analyzer: Option<SpectralAnalyzer>,
    surface: Option<Surface>,
    frame_loop: FrameLoop,
    token: Option<ScheduleToken>,
    rng: fastrand::Rng,
    external_status: Option<RunStatus>,
}

impl VisualizerSession {
    /// Builds an idle session. Fails fast on invalid analyzer parameters.
    pub fn new(analyzer_config: AnalyzerConfig, mode: RenderMode) -> Result<Self> {
        analyzer_config.validate()?;
        Ok(Self {
            analyzer_config,
            mode,
            target: RenderTarget::Local,
            state: RunState::Idle,
            capture: None,
            analyzer: None,
            surface: None,
            frame_loop: FrameLoop::new(),
            token: None,
            rng: fastrand::Rng::new(),
            external_status: None,
        })
    }

    /// Seeds the session's random source, making renderer output
    /// reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    /// Delegates rendering to the external process path; the session then
    /// holds no device and schedules no loop.
    pub fn delegated(mut self) -> Self {
        self.target = RenderTarget::External;
        self
    }

    pub fn run_state(&self) -> RunState {
        self.state
    }

    pub fn render_target(&self) -> RenderTarget {
        self.target
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Swaps which renderer is dispatched. The capture device and analyzer
    /// are untouched; the change shows on the next tick.
    pub fn set_mode(&mut self, mode: RenderMode) {
        self.mode = mode;
    }

    /// The live surface, for presenting or exporting. `None` while idle.
    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    /// Opens the capture device, attaches the analyzer, creates the surface
    /// and schedules the frame loop, in that order. Starting while already
    /// capturing is a no-op; a failed open leaves the session idle with no
    /// handle retained.
    pub fn start(
        &mut self,
        source: &mut dyn CaptureSource,
        dimensions: SurfaceDimensions,
    ) -> Result<()> {
        if self.target == RenderTarget::External {
            tracing::debug!("start ignored: rendering is delegated");
            return Ok(());
        }
        if self.state == RunState::Capturing {
            tracing::debug!("start ignored: already capturing");
            return Ok(());
        }

        let handle = source.open()?;
        let analyzer = match SpectralAnalyzer::new(&handle, self.analyzer_config.clone()) {
            Ok(analyzer) => analyzer,
            Err(err) => {
                let mut handle = handle;
                handle.close();
                return Err(err);
            }
        };

        self.surface = Some(Surface::new(dimensions));
        self.analyzer = Some(analyzer);
        self.capture = Some(handle);
        self.token = Some(self.frame_loop.schedule());
        self.state = RunState::Capturing;
        tracing::info!(mode = self.mode.id(), "visualization started");
        Ok(())
    }

    /// Runs one tick of the frame loop: snapshot, clear, render, reschedule.
    /// Returns whether a frame was drawn. A tick after `stop` has returned,
    /// or one holding a stale token, terminates without drawing.
    pub fn tick(&mut self, elapsed: Duration) -> bool {
        if self.state != RunState::Capturing {
            return false;
        }
        let Some(token) = self.token else {
            return false;
        };
        if !self.frame_loop.permits(token) {
            return false;
        }
        let (Some(analyzer), Some(surface)) = (self.analyzer.as_mut(), self.surface.as_mut())
        else {
            return false;
        };

        let frequency = analyzer.frequency_snapshot();
        surface.clear(Rgba::BLACK);
        let mut input = FrameInput {
            frequency: &frequency,
            analyzer,
            elapsed,
            rng: &mut self.rng,
        };
        render(self.mode, surface, &mut input);

        // The loop stays scheduled for the next refresh; the token is only
        // revoked by stop().
        self.token = Some(self.frame_loop.schedule());
        true
    }

    /// Resizes the surface; the next tick draws at the new dimensions.
    pub fn resize(&mut self, dimensions: SurfaceDimensions) {
        if let Some(surface) = self.surface.as_mut() {
            surface.resize(dimensions);
        }
    }

    /// Tears down the loop, then the analyzer, then the capture source.
    /// Idempotent, and best-effort: no step can prevent the ones after it.
    pub fn stop(&mut self) {
        self.frame_loop.cancel();
        self.token = None;
        self.analyzer = None;
        if let Some(mut handle) = self.capture.take() {
            handle.close();
        }
        self.surface = None;
        if self.state == RunState::Capturing {
            self.state = RunState::Idle;
            tracing::info!(mode = self.mode.id(), "visualization stopped");
        }
    }

    /// Records the status last polled from the control plane; only
    /// meaningful for delegated sessions.
    pub fn note_external_status(&mut self, status: RunStatus) {
        self.external_status = Some(status);
    }

    /// The status this session reports to the catalog.
    pub fn status(&self) -> RunStatus {
        match self.target {
            RenderTarget::Local => match self.state {
                RunState::Capturing => RunStatus::Running,
                RunState::Idle => RunStatus::Stopped,
            },
            RenderTarget::External => self.external_status.unwrap_or(RunStatus::Stopped),
        }
    }
}

impl Drop for VisualizerSession {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for VisualizerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisualizerSession")
            .field("mode", &self.mode)
            .field("target", &self.target)
            .field("state", &self.state)
            .field("scheduled", &self.frame_loop.is_scheduled())
            .finish()
    }
}
