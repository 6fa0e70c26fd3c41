//! Spectral analysis over the live capture stream.
//!
//! The analyzer owns a fixed-size forward FFT and converts the most recent
//! capture window into byte-magnitude snapshots on demand. Queries never
//! block on the device: they copy whatever the ring currently holds, so the
//! first snapshots of a session may simply be silence.

use std::{fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::capture::{CaptureHandle, SampleRing};
use crate::config::AnalyzerConfig;
use crate::Result;

/// One frame's frequency-domain magnitudes, one byte per bin, low to high.
///
/// Produced fresh for every query and meant to be consumed within the frame
/// that requested it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencySnapshot {
    bins: Vec<u8>,
}

impl FrequencySnapshot {
    pub fn new(bins: Vec<u8>) -> Self {
        Self { bins }
    }

    pub fn samples(&self) -> &[u8] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}

/// One frame's time-domain amplitudes; 128 is the zero crossing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveformSnapshot {
    samples: Vec<u8>,
}

impl WaveformSnapshot {
    pub fn new(samples: Vec<u8>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Fixed-size frequency transform over the capture ring.
///
/// The analysis window is twice the bin count. Magnitudes are normalised by
/// the window length, smoothed exponentially across frames, and mapped onto
/// bytes through the configured decibel range, so silence reads as 0 and a
/// loud tone saturates its bin at 255.
pub struct SpectralAnalyzer {
    config: AnalyzerConfig,
    ring: SampleRing,
    fft: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
    hann: Vec<f32>,
    smoothed: Vec<f32>,
    time_domain: Vec<f32>,
}

impl SpectralAnalyzer {
    /// Builds an analyzer over the handle's sample ring. Fails fast with a
    /// configuration error before touching any audio data.
    pub fn new(handle: &CaptureHandle, config: AnalyzerConfig) -> Result<Self> {
        Self::over_ring(handle.ring(), config)
    }

    /// Builds an analyzer over an explicit ring; offline feeds and tests
    /// push samples into the ring directly.
    pub fn over_ring(ring: SampleRing, config: AnalyzerConfig) -> Result<Self> {
        config.validate()?;
        let window_len = config.window_len();

        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(window_len);
        let input = fft.make_input_vec();
        let spectrum = fft.make_output_vec();
        let scratch = fft.make_scratch_vec();
        let hann = (0..window_len).map(|i| hann_value(i, window_len)).collect();

        Ok(Self {
            smoothed: vec![0.0; config.bin_count],
            time_domain: vec![0.0; window_len],
            config,
            ring,
            fft,
            input,
            spectrum,
            scratch,
            hann,
        })
    }

    pub fn bin_count(&self) -> usize {
        self.config.bin_count
    }

    /// Length of the time-domain window backing [`Self::waveform_snapshot`].
    pub fn window_len(&self) -> usize {
        self.config.window_len()
    }

    /// Computes a fresh frequency snapshot from the most recent window.
    pub fn frequency_snapshot(&mut self) -> FrequencySnapshot {
        self.ring.latest_window(&mut self.input);
        for (sample, window) in self.input.iter_mut().zip(self.hann.iter()) {
            *sample *= window;
        }

        // The input buffer is scratch space once the transform has run.
        if self
            .fft
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)
            .is_err()
        {
            return FrequencySnapshot::new(vec![0; self.config.bin_count]);
        }

        let norm = 1.0 / self.config.window_len() as f32;
        let tau = self.config.smoothing;
        let min_db = self.config.min_db;
        let db_span = self.config.max_db - self.config.min_db;
        let bins = self
            .smoothed
            .iter_mut()
            .zip(self.spectrum.iter())
            .map(|(smoothed, bin)| {
                let magnitude = bin.norm() * norm;
                *smoothed = tau * *smoothed + (1.0 - tau) * magnitude;
                byte_magnitude(*smoothed, min_db, db_span)
            })
            .collect();
        FrequencySnapshot::new(bins)
    }

    /// Computes a fresh waveform snapshot from the most recent window.
    pub fn waveform_snapshot(&mut self) -> WaveformSnapshot {
        self.ring.latest_window(&mut self.time_domain);
        let samples = self
            .time_domain
            .iter()
            .map(|&s| ((s.clamp(-1.0, 1.0) + 1.0) * 128.0).min(255.0) as u8)
            .collect();
        WaveformSnapshot::new(samples)
    }
}

fn byte_magnitude(magnitude: f32, min_db: f32, db_span: f32) -> u8 {
    if magnitude <= 0.0 {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    (255.0 * (db - min_db) / db_span).clamp(0.0, 255.0) as u8
}

impl fmt::Debug for SpectralAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectralAnalyzer")
            .field("bin_count", &self.config.bin_count)
            .field("window_len", &self.config.window_len())
            .field("smoothing", &self.config.smoothing)
            .finish()
    }
}

fn hann_value(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }
    0.5 - 0.5 * ((std::f32::consts::TAU * index as f32) / (len as f32 - 1.0)).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VisualiserError;

    fn analyzer(bins: usize, smoothing: f32) -> (SampleRing, SpectralAnalyzer) {
        let ring = SampleRing::new(bins * 4);
        let config = AnalyzerConfig {
            bin_count: bins,
            smoothing,
            ..Default::default()
        };
        let analyzer = SpectralAnalyzer::over_ring(ring.clone(), config).unwrap();
        (ring, analyzer)
    }

    #[test]
    fn rejects_non_power_of_two_bin_counts() {
        let ring = SampleRing::new(64);
        let config = AnalyzerConfig {
            bin_count: 100,
            ..Default::default()
        };
        assert!(matches!(
            SpectralAnalyzer::over_ring(ring, config),
            Err(VisualiserError::ConfigurationError(_))
        ));
    }

    #[test]
    fn silence_maps_to_zero_and_midline() {
        let (_ring, mut analyzer) = analyzer(64, 0.8);
        let frequency = analyzer.frequency_snapshot();
        assert_eq!(frequency.len(), 64);
        assert!(frequency.samples().iter().all(|&b| b == 0));

        let waveform = analyzer.waveform_snapshot();
        assert_eq!(waveform.len(), 128);
        assert!(waveform.samples().iter().all(|&b| b == 128));
    }

    #[test]
    fn tone_peaks_at_its_bin() {
        let (ring, mut analyzer) = analyzer(64, 0.0);
        let window = analyzer.window_len();
        let bin = 8;
        let samples: Vec<f32> = (0..window)
            .map(|n| 0.01 * (std::f32::consts::TAU * bin as f32 * n as f32 / window as f32).sin())
            .collect();
        ring.push_slice(&samples);

        let snapshot = analyzer.frequency_snapshot();
        let bins = snapshot.samples();
        let peak = (0..bins.len()).max_by_key(|&i| bins[i]).unwrap();
        assert_eq!(peak, bin);
        assert!(bins[bin] > 100, "peak byte was {}", bins[bin]);
        assert!(bins[40..].iter().all(|&b| b < 30));
    }

    #[test]
    fn smoothing_carries_energy_across_frames() {
        let (ring, mut analyzer) = analyzer(64, 0.8);
        let window = analyzer.window_len();
        let samples: Vec<f32> = (0..window)
            .map(|n| 0.5 * (std::f32::consts::TAU * 4.0 * n as f32 / window as f32).sin())
            .collect();
        ring.push_slice(&samples);

        let first = analyzer.frequency_snapshot().samples()[4];
        let second = analyzer.frequency_snapshot().samples()[4];
        assert!(first > 0);
        assert!(second >= first);
    }

    #[test]
    fn waveform_maps_amplitude_extremes() {
        let (ring, mut analyzer) = analyzer(32, 0.8);
        let window = analyzer.window_len();
        let mut samples = vec![1.0f32; window / 2];
        samples.extend(vec![-1.0f32; window / 2]);
        ring.push_slice(&samples);

        let snapshot = analyzer.waveform_snapshot();
        assert_eq!(snapshot.samples()[0], 255);
        assert_eq!(snapshot.samples()[window - 1], 0);
    }

    #[test]
    fn each_query_allocates_a_fresh_snapshot() {
        let (ring, mut analyzer) = analyzer(32, 0.0);
        ring.push_slice(&vec![0.25f32; 64]);
        let a = analyzer.waveform_snapshot();
        let b = analyzer.waveform_snapshot();
        assert_eq!(a, b);
        assert_ne!(a.samples().as_ptr(), b.samples().as_ptr());
    }
}
