//! Input level metering
//!
//! Keeps the most recent window of capture samples and reduces it to a
//! single [0, 1] value from the frequency-domain energy, the way a browser
//! analyser node drives a microphone meter: Blackman window, FFT, per-bin
//! exponential smoothing, dB mapped onto [floor, ceiling], averaged.

use std::sync::Arc;
use std::time::SystemTime;

use ringbuf::traits::{Consumer, Observer, RingBuffer};
use ringbuf::HeapRb;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::error::{AudioError, Result};
use crate::AudioConfig;

/// One meter reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelSample {
    /// Average normalized spectral energy in [0, 1]
    pub level: f32,
    pub timestamp: SystemTime,
}

/// Rolling spectral level meter
pub struct LevelMeter {
    window: HeapRb<f32>,
    window_size: usize,
    fft: Arc<dyn Fft<f32>>,
    blackman: Vec<f32>,
    smoothed: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
}

impl LevelMeter {
    pub fn new(window_size: usize, smoothing: f32, min_db: f32, max_db: f32) -> Result<Self> {
        if window_size < 2 {
            return Err(AudioError::invalid_config(
                "Level window must hold at least 2 samples",
            ));
        }
        if !(0.0..1.0).contains(&smoothing) {
            return Err(AudioError::invalid_config(format!(
                "Level smoothing must be in [0, 1), got {}",
                smoothing
            )));
        }
        if min_db >= max_db {
            return Err(AudioError::invalid_config(format!(
                "Level floor ({} dB) must be below ceiling ({} dB)",
                min_db, max_db
            )));
        }

        let fft = FftPlanner::new().plan_fft_forward(window_size);
        let bins = window_size / 2;

        Ok(Self {
            window: HeapRb::new(window_size),
            window_size,
            fft,
            blackman: blackman_window(window_size),
            smoothed: vec![0.0; bins],
            scratch: vec![Complex::new(0.0, 0.0); window_size],
            smoothing,
            min_db,
            max_db,
        })
    }

    pub fn from_config(config: &AudioConfig) -> Result<Self> {
        Self::new(
            config.level_window,
            config.level_smoothing,
            config.level_min_db,
            config.level_max_db,
        )
    }

    /// Feed capture samples; only the newest `window_size` are kept
    ///
    /// Non-finite samples are stored as silence, matching the encoder.
    pub fn observe(&mut self, samples: &[f32]) {
        let start = samples.len().saturating_sub(self.window_size);
        for &sample in &samples[start..] {
            self.window
                .push_overwrite(if sample.is_finite() { sample } else { 0.0 });
        }
    }

    /// Compute the current level
    ///
    /// Until the window fills, the missing history counts as silence.
    pub fn level(&mut self) -> f32 {
        let offset = self.window_size - self.window.occupied_len();

        for value in self.scratch.iter_mut() {
            *value = Complex::new(0.0, 0.0);
        }
        for (i, sample) in self.window.iter().enumerate() {
            let idx = offset + i;
            self.scratch[idx] = Complex::new(sample * self.blackman[idx], 0.0);
        }

        self.fft.process(&mut self.scratch);

        let range = self.max_db - self.min_db;
        let norm = self.window_size as f32;
        let mut total = 0.0f32;

        for (bin, smoothed) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.scratch[bin].norm() / norm;
            *smoothed = self.smoothing * *smoothed + (1.0 - self.smoothing) * magnitude;

            if *smoothed > 0.0 {
                let db = 20.0 * smoothed.log10();
                total += ((db - self.min_db) / range).clamp(0.0, 1.0);
            }
        }

        (total / self.smoothed.len() as f32).clamp(0.0, 1.0)
    }

    /// Compute the current level and stamp it
    pub fn sample(&mut self) -> LevelSample {
        LevelSample {
            level: self.level(),
            timestamp: SystemTime::now(),
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.smoothed.iter_mut().for_each(|v| *v = 0.0);
    }
}

fn blackman_window(size: usize) -> Vec<f32> {
    let n = size as f32;
    (0..size)
        .map(|i| {
            let x = 2.0 * std::f32::consts::PI * i as f32 / n;
            0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
        })
        .collect()
}
