use serde::{Deserialize, Serialize};

use crate::{Result, VisualiserError};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub display: DisplayConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

/// Configuration specific to the audio subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub analyzer: AnalyzerConfig,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            analyzer: AnalyzerConfig::default(),
        }
    }
}

/// Parameters of the spectral analyzer.
///
/// `bin_count` is the number of frequency bins exposed per snapshot; the
/// time-domain analysis window is twice as long. `smoothing` blends each new
/// magnitude spectrum with the previous one (0.0 = no smoothing). `min_db`
/// and `max_db` bound the decibel range that maps onto byte magnitudes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub bin_count: usize,
    pub smoothing: f32,
    pub min_db: f32,
    pub max_db: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            bin_count: 1024,
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -30.0,
        }
    }
}

impl AnalyzerConfig {
    /// Checks the parameter set, failing fast before any device is touched.
    pub fn validate(&self) -> Result<()> {
        if self.bin_count < 32 || !self.bin_count.is_power_of_two() {
            return Err(VisualiserError::config(format!(
                "bin count must be a power of two >= 32, got {}",
                self.bin_count
            )));
        }
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(VisualiserError::config(format!(
                "smoothing must lie in [0, 1), got {}",
                self.smoothing
            )));
        }
        if self.min_db >= self.max_db {
            return Err(VisualiserError::config(format!(
                "decibel range is empty: [{}, {}]",
                self.min_db, self.max_db
            )));
        }
        Ok(())
    }

    /// Length of the time-domain analysis window in samples.
    pub fn window_len(&self) -> usize {
        self.bin_count * 2
    }
}

/// Configuration of the drawable surface and the frame cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    pub refresh_rate: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            refresh_rate: 60,
        }
    }
}
