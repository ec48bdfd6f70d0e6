//! Vivavoce Audio Pipeline
//!
//! Microphone capture to wire-ready PCM16 for a remote realtime speech model.
//!
//! ## Architecture
//!
//! ```text
//! Capture device (cpal, any rate / channel count)
//!   │  AudioFrame (f32, native rate)
//!   ▼
//! AudioProcessor ──> LevelMeter (rolling window, 100ms timer) ──> LevelSample
//!   │  channel 0 → Resampler (linear) → PCM16 encode
//!   ▼
//! FrameAggregator (backlog, fixed 4800-sample chunks @ 24kHz)
//!   │  Pcm16Chunk
//!   ▼
//! Transport (little-endian bytes or base64 for JSON protocols)
//! ```

pub mod aggregator;
pub mod capture;
pub mod error;
pub mod frame;
pub mod level;
pub mod pcm16;
pub mod processor;
pub mod resampler;

pub use aggregator::FrameAggregator;
pub use capture::{CaptureBackend, CaptureHandle, CpalCapture, DeviceInfo, FrameSink};
pub use error::{AudioError, Result};
pub use frame::AudioFrame;
pub use level::{LevelMeter, LevelSample};
pub use pcm16::Pcm16Chunk;
pub use processor::AudioProcessor;
pub use resampler::{resample_linear, Resampler};

use serde::{Deserialize, Serialize};

/// Output sample rate expected by the realtime speech endpoint
pub const TARGET_SAMPLE_RATE: u32 = 24000;

/// Samples per transmitted chunk (200ms @ 24kHz)
pub const DEFAULT_CHUNK_SAMPLES: usize = 4800;

/// Backlog bound before the oldest buffers are dropped (2s @ 24kHz)
pub const DEFAULT_MAX_BACKLOG_SAMPLES: usize = 48000;

/// Level meter refresh period
pub const LEVEL_INTERVAL_MS: u64 = 100;

/// Audio pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output sample rate (default: 24000 Hz)
    pub target_sample_rate: u32,
    /// Samples per released chunk (default: 4800)
    pub chunk_samples: usize,
    /// Aggregator backlog bound in samples (default: 48000)
    pub max_backlog_samples: usize,
    /// Level update period in milliseconds (default: 100)
    pub level_interval_ms: u64,
    /// Samples analysed per level reading (default: 2048)
    pub level_window: usize,
    /// Per-bin smoothing factor in [0, 1) (default: 0.8)
    pub level_smoothing: f32,
    /// dB mapped to level 0.0 (default: -100)
    pub level_min_db: f32,
    /// dB mapped to level 1.0 (default: -30)
    pub level_max_db: f32,
    /// Device index (None = default device)
    pub device_index: Option<usize>,
    /// Fixed capture blocksize (None = device default)
    pub blocksize: Option<u32>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: TARGET_SAMPLE_RATE,
            chunk_samples: DEFAULT_CHUNK_SAMPLES,
            max_backlog_samples: DEFAULT_MAX_BACKLOG_SAMPLES,
            level_interval_ms: LEVEL_INTERVAL_MS,
            level_window: 2048,
            level_smoothing: 0.8,
            level_min_db: -100.0,
            level_max_db: -30.0,
            device_index: None,
            blocksize: None,
        }
    }
}

impl AudioConfig {
    /// Check the configuration for values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.target_sample_rate == 0 {
            return Err(AudioError::invalid_config("Target sample rate cannot be zero"));
        }
        if self.level_interval_ms == 0 {
            return Err(AudioError::invalid_config("Level interval cannot be zero"));
        }
        FrameAggregator::new(self.chunk_samples, self.max_backlog_samples)?;
        LevelMeter::from_config(self)?;
        Ok(())
    }

    /// Duration of one output chunk in milliseconds
    pub fn chunk_duration_ms(&self) -> f64 {
        self.chunk_samples as f64 * 1000.0 / self.target_sample_rate as f64
    }
}
