//! Live audio capture.
//!
//! A [`CaptureSource`] opens the input device and hands back a
//! [`CaptureHandle`] that owns every OS-level resource for the stream. The
//! capture callback runs on the backend's audio thread and feeds a bounded
//! [`SampleRing`]; everything else in the pipeline stays single-threaded and
//! only ever takes the ring lock briefly.

use std::collections::VecDeque;
use std::f32::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::{Result, VisualiserError};

/// Bounded mono sample buffer shared between the capture callback and the
/// analyzer. Overflow drops the oldest samples.
#[derive(Debug, Clone)]
pub struct SampleRing {
    inner: Arc<Mutex<RingState>>,
}

#[derive(Debug)]
struct RingState {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl SampleRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RingState {
                samples: VecDeque::with_capacity(capacity),
                capacity: capacity.max(1),
            })),
        }
    }

    /// Appends mono samples, evicting from the front once full.
    pub fn push_slice(&self, samples: &[f32]) {
        let mut state = self.lock();
        for &sample in samples {
            if state.samples.len() == state.capacity {
                state.samples.pop_front();
            }
            state.samples.push_back(sample);
        }
    }

    /// Appends interleaved frames downmixed to mono under a single lock.
    pub fn push_frames(&self, interleaved: &[f32], channels: usize) {
        if channels <= 1 {
            self.push_slice(interleaved);
            return;
        }
        let mut state = self.lock();
        for frame in interleaved.chunks_exact(channels) {
            let mono = frame.iter().sum::<f32>() / channels as f32;
            if state.samples.len() == state.capacity {
                state.samples.pop_front();
            }
            state.samples.push_back(mono);
        }
    }

    /// Copies the most recent `out.len()` samples into `out`, zero-padding
    /// the front while the ring is still filling. Never blocks on the device.
    pub fn latest_window(&self, out: &mut [f32]) {
        let state = self.lock();
        let available = state.samples.len().min(out.len());
        let pad = out.len() - available;
        out[..pad].fill(0.0);
        let skip = state.samples.len() - available;
        for (slot, &sample) in out[pad..].iter_mut().zip(state.samples.iter().skip(skip)) {
            *slot = sample;
        }
    }

    pub fn len(&self) -> usize {
        self.lock().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().samples.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RingState> {
        // A poisoned ring only means a capture callback panicked; the sample
        // data itself is still usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Owner of one open capture stream and its OS resources.
///
/// `close` is unconditional and idempotent; dropping the handle closes it
/// as well.
pub struct CaptureHandle {
    ring: SampleRing,
    sample_rate: u32,
    stream: Option<cpal::Stream>,
    producer_stop: Option<Arc<AtomicBool>>,
    closed: bool,
}

impl CaptureHandle {
    fn live(stream: cpal::Stream, ring: SampleRing, sample_rate: u32) -> Self {
        Self {
            ring,
            sample_rate,
            stream: Some(stream),
            producer_stop: None,
            closed: false,
        }
    }

    fn with_producer(stop: Arc<AtomicBool>, ring: SampleRing, sample_rate: u32) -> Self {
        Self {
            ring,
            sample_rate,
            stream: None,
            producer_stop: Some(stop),
            closed: false,
        }
    }

    /// Builds a handle over an externally fed ring. No OS resources are
    /// held; tests and offline feeds push samples straight into the ring.
    pub fn detached(ring: SampleRing, sample_rate: u32) -> Self {
        Self {
            ring,
            sample_rate,
            stream: None,
            producer_stop: None,
            closed: false,
        }
    }

    /// A clone of the shared sample ring this handle fills.
    pub fn ring(&self) -> SampleRing {
        self.ring.clone()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Releases the stream and any producer thread. Safe to call repeatedly
    /// and after partial teardown.
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
        }
        if let Some(stop) = self.producer_stop.take() {
            stop.store(true, Ordering::Release);
        }
        if !self.closed {
            self.closed = true;
            tracing::debug!("capture handle closed");
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for CaptureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureHandle")
            .field("sample_rate", &self.sample_rate)
            .field("live", &self.stream.is_some())
            .field("closed", &self.closed)
            .finish()
    }
}

/// Something that can open a live capture stream.
///
/// Opening may raise an OS permission prompt; `open` does not return until
/// the prompt is resolved or denied. Failures are terminal for that attempt;
/// no retry happens inside the core.
pub trait CaptureSource {
    fn open(&mut self) -> Result<CaptureHandle>;
}

/// Capture from the default input device of the default host.
#[derive(Debug, Clone)]
pub struct MicrophoneSource {
    ring_capacity: usize,
}

impl MicrophoneSource {
    pub fn new() -> Self {
        // Four analysis windows at the default bin count.
        Self::with_ring_capacity(8192 * 2)
    }

    pub fn with_ring_capacity(ring_capacity: usize) -> Self {
        Self { ring_capacity }
    }
}

impl Default for MicrophoneSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSource for MicrophoneSource {
    fn open(&mut self) -> Result<CaptureHandle> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(VisualiserError::DeviceUnavailable)?;
        let config = device
            .default_input_config()
            .map_err(|err| classify_backend_error(&err.to_string()))?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        let stream_config = config.config();
        let ring = SampleRing::new(self.ring_capacity);

        tracing::info!(
            device = %device.name().unwrap_or_else(|_| "unknown".into()),
            sample_rate,
            channels,
            format = ?config.sample_format(),
            "opening capture stream"
        );

        let err_fn = |err: cpal::StreamError| tracing::warn!(%err, "capture stream error");
        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                let writer = ring.clone();
                device.build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        writer.push_frames(data, channels);
                    },
                    err_fn,
                    None,
                )
            }
            cpal::SampleFormat::I16 => {
                let writer = ring.clone();
                let mut scratch = Vec::new();
                device.build_input_stream(
                    &stream_config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        scratch.clear();
                        scratch.extend(data.iter().map(|&s| s as f32 / 32_768.0));
                        writer.push_frames(&scratch, channels);
                    },
                    err_fn,
                    None,
                )
            }
            cpal::SampleFormat::U16 => {
                let writer = ring.clone();
                let mut scratch = Vec::new();
                device.build_input_stream(
                    &stream_config,
                    move |data: &[u16], _: &cpal::InputCallbackInfo| {
                        scratch.clear();
                        scratch.extend(data.iter().map(|&s| (s as f32 - 32_768.0) / 32_768.0));
                        writer.push_frames(&scratch, channels);
                    },
                    err_fn,
                    None,
                )
            }
            other => {
                return Err(VisualiserError::config(format!(
                    "unsupported capture sample format {other:?}"
                )))
            }
        }
        .map_err(map_build_error)?;

        stream
            .play()
            .map_err(|err| classify_backend_error(&err.to_string()))?;

        Ok(CaptureHandle::live(stream, ring, sample_rate))
    }
}

fn map_build_error(err: cpal::BuildStreamError) -> VisualiserError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => VisualiserError::DeviceUnavailable,
        cpal::BuildStreamError::StreamConfigNotSupported => {
            VisualiserError::config("input stream configuration not supported")
        }
        other => classify_backend_error(&other.to_string()),
    }
}

/// Backends report a denied microphone prompt as an opaque backend error;
/// the message text is the only discriminator available.
fn classify_backend_error(message: &str) -> VisualiserError {
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("permission") || lowered.contains("denied") {
        VisualiserError::PermissionDenied
    } else {
        VisualiserError::DeviceUnavailable
    }
}

/// Deterministic capture source for tests and the app's synthetic mode.
///
/// `tone` spawns a producer thread that feeds a fixed-frequency sine into
/// the ring at real-time pace; `silence` feeds nothing at all.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    frequency_hz: Option<f32>,
    amplitude: f32,
    sample_rate: u32,
    ring_capacity: usize,
}

impl SyntheticSource {
    pub fn tone(frequency_hz: f32) -> Self {
        Self {
            frequency_hz: Some(frequency_hz),
            amplitude: 0.8,
            sample_rate: 48_000,
            ring_capacity: 8192 * 2,
        }
    }

    pub fn silence() -> Self {
        Self {
            frequency_hz: None,
            amplitude: 0.0,
            sample_rate: 48_000,
            ring_capacity: 8192 * 2,
        }
    }
}

impl CaptureSource for SyntheticSource {
    fn open(&mut self) -> Result<CaptureHandle> {
        let ring = SampleRing::new(self.ring_capacity);
        let Some(frequency) = self.frequency_hz else {
            return Ok(CaptureHandle::detached(ring, self.sample_rate));
        };

        let stop = Arc::new(AtomicBool::new(false));
        let writer = ring.clone();
        let thread_stop = Arc::clone(&stop);
        let sample_rate = self.sample_rate;
        let amplitude = self.amplitude;
        thread::spawn(move || {
            const BLOCK: usize = 512;
            let mut phase = 0.0f32;
            let step = TAU * frequency / sample_rate as f32;
            let pace = Duration::from_secs_f64(BLOCK as f64 / sample_rate as f64);
            let mut block = [0.0f32; BLOCK];
            while !thread_stop.load(Ordering::Acquire) {
                for slot in block.iter_mut() {
                    *slot = phase.sin() * amplitude;
                    phase = (phase + step) % TAU;
                }
                writer.push_slice(&block);
                thread::sleep(pace);
            }
        });

        Ok(CaptureHandle::with_producer(stop, ring, self.sample_rate))
    }
}
