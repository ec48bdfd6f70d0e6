//! Capture-to-wire processing
//!
//! Each native frame goes channel 0 → resample → PCM16 → aggregator. A
//! separate timer thread reads the level meter every `level_interval_ms`.
//! The frame path and the timer only meet at the level meter and the
//! aggregator, each behind its own mutex.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::aggregator::FrameAggregator;
use crate::capture::{CaptureBackend, CaptureHandle, FrameSink};
use crate::error::{AudioError, Result};
use crate::frame::AudioFrame;
use crate::level::{LevelMeter, LevelSample};
use crate::pcm16::{self, Pcm16Chunk};
use crate::resampler;
use crate::AudioConfig;

/// Callback for ready output chunks (push mode)
pub type ChunkCallback = Arc<dyn Fn(Pcm16Chunk) + Send + Sync>;

/// Callback for periodic level readings
pub type LevelCallback = Arc<dyn Fn(LevelSample) + Send + Sync>;

/// Callback for capture acquisition failures
pub type ErrorCallback = Arc<dyn Fn(&AudioError) + Send + Sync>;

/// State shared between the owner, the capture callback and the level timer
struct Shared {
    target_rate: u32,
    active: AtomicBool,
    aggregator: Mutex<FrameAggregator>,
    level: Mutex<LevelMeter>,
    chunk_callback: Mutex<Option<ChunkCallback>>,
    /// Held from drain to delivery so chunks reach the callback in order
    delivery: Mutex<()>,
    frames_in: AtomicU64,
    samples_out: AtomicU64,
}

impl Shared {
    fn process_frame(&self, frame: AudioFrame) {
        if !self.active.load(Ordering::Acquire) || frame.is_empty() {
            return;
        }
        self.frames_in.fetch_add(1, Ordering::Relaxed);

        let mono = frame.channel(0);
        self.level.lock().observe(&mono);

        let resampled = resampler::resample_linear(&mono, frame.sample_rate(), self.target_rate);
        let encoded = pcm16::encode(&resampled);
        self.samples_out
            .fetch_add(encoded.len() as u64, Ordering::Relaxed);

        let callback = self.chunk_callback.lock().clone();
        let _delivery = callback.as_ref().map(|_| self.delivery.lock());
        let ready = {
            let mut aggregator = self.aggregator.lock();
            aggregator.push(encoded);
            if callback.is_some() {
                aggregator.drain_ready()
            } else {
                Vec::new()
            }
        };

        // Deliver outside the aggregator lock
        if let Some(callback) = callback {
            for samples in ready {
                callback(Pcm16Chunk::new(samples, self.target_rate));
            }
        }
    }
}

/// Level timer thread; stops and joins on drop
struct LevelTimer {
    stop_tx: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl LevelTimer {
    fn spawn(shared: Arc<Shared>, interval: Duration, callback: Option<LevelCallback>) -> Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let thread = thread::Builder::new()
            .name("vivavoce-level".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let sample = shared.level.lock().sample();
                        if let Some(ref callback) = callback {
                            callback(sample);
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        Ok(Self {
            stop_tx,
            thread: Some(thread),
        })
    }
}

impl Drop for LevelTimer {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Level timer thread panicked");
            }
        }
    }
}

/// Live session audio processor
///
/// Owns one capture source at a time. Frames can also be pushed directly with
/// [`AudioProcessor::on_frame`], which is how non-device sources and tests
/// drive it.
pub struct AudioProcessor {
    config: AudioConfig,
    shared: Arc<Shared>,
    capture: Option<Box<dyn CaptureHandle>>,
    level_timer: Option<LevelTimer>,
    level_callback: Option<LevelCallback>,
    error_callback: Option<ErrorCallback>,
}

impl AudioProcessor {
    /// Create new processor; nothing is acquired until [`AudioProcessor::start`]
    pub fn new(config: AudioConfig) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(Shared {
            target_rate: config.target_sample_rate,
            active: AtomicBool::new(false),
            aggregator: Mutex::new(FrameAggregator::new(
                config.chunk_samples,
                config.max_backlog_samples,
            )?),
            level: Mutex::new(LevelMeter::from_config(&config)?),
            chunk_callback: Mutex::new(None),
            delivery: Mutex::new(()),
            frames_in: AtomicU64::new(0),
            samples_out: AtomicU64::new(0),
        });

        Ok(Self {
            config,
            shared,
            capture: None,
            level_timer: None,
            level_callback: None,
            error_callback: None,
        })
    }

    /// Deliver ready chunks to `callback` as soon as they fill
    ///
    /// Without a chunk callback, chunks wait in the aggregator for
    /// [`AudioProcessor::next_chunk`].
    pub fn set_chunk_callback<F>(&mut self, callback: F)
    where
        F: Fn(Pcm16Chunk) + Send + Sync + 'static,
    {
        *self.shared.chunk_callback.lock() = Some(Arc::new(callback));
    }

    /// Receive a level reading every `level_interval_ms` while active
    pub fn set_level_callback<F>(&mut self, callback: F)
    where
        F: Fn(LevelSample) + Send + Sync + 'static,
    {
        self.level_callback = Some(Arc::new(callback));
    }

    /// Receive capture acquisition failures
    pub fn set_error_callback<F>(&mut self, callback: F)
    where
        F: Fn(&AudioError) + Send + Sync + 'static,
    {
        self.error_callback = Some(Arc::new(callback));
    }

    /// Acquire the capture source and start processing
    ///
    /// Fails with [`AudioError::AlreadyRecording`] when already active. An
    /// acquisition failure is reported once through the error callback and
    /// leaves the processor inactive with nothing held.
    pub fn start(&mut self, backend: &mut dyn CaptureBackend) -> Result<()> {
        if self.is_active() {
            return Err(AudioError::AlreadyRecording);
        }

        self.reset();
        self.shared.active.store(true, Ordering::Release);

        let capture = match backend.open(self.frame_sink()) {
            Ok(capture) => capture,
            Err(e) => return Err(self.abort_start(e)),
        };

        let interval = Duration::from_millis(self.config.level_interval_ms);
        let timer = match LevelTimer::spawn(
            Arc::clone(&self.shared),
            interval,
            self.level_callback.clone(),
        ) {
            Ok(timer) => timer,
            Err(e) => {
                drop(capture);
                return Err(self.abort_start(e));
            }
        };

        info!(
            "Audio processor started: {} ({} Hz, {} ch) → {} Hz PCM16, {} sample chunks",
            capture.device_name(),
            capture.sample_rate(),
            capture.channels(),
            self.config.target_sample_rate,
            self.config.chunk_samples
        );

        self.capture = Some(capture);
        self.level_timer = Some(timer);
        Ok(())
    }

    /// Stop processing and release the capture source and timer
    ///
    /// Returns every sample still held by the aggregator, ready chunks first
    /// and the partial remainder last. Stopping an inactive processor is a
    /// no-op that returns nothing.
    pub fn stop(&mut self) -> Vec<Pcm16Chunk> {
        if !self.is_active() {
            return Vec::new();
        }

        self.shared.active.store(false, Ordering::Release);

        // Timer first, then the device; both release synchronously
        self.level_timer.take();
        if let Some(capture) = self.capture.take() {
            debug!("Releasing capture on {}", capture.device_name());
            drop(capture);
        }

        let remaining = {
            let mut aggregator = self.shared.aggregator.lock();
            let mut chunks = aggregator.drain_ready();
            chunks.extend(aggregator.flush());
            chunks
        };

        info!(
            "Audio processor stopped: {} frames in, {} samples out, {} dropped",
            self.shared.frames_in.load(Ordering::Relaxed),
            self.shared.samples_out.load(Ordering::Relaxed),
            self.dropped_samples()
        );

        remaining
            .into_iter()
            .map(|samples| Pcm16Chunk::new(samples, self.config.target_sample_rate))
            .collect()
    }

    /// Push one native-rate frame through the pipeline
    ///
    /// Ignored while inactive.
    pub fn on_frame(&self, frame: AudioFrame) {
        self.shared.process_frame(frame);
    }

    /// Sink that feeds this processor, for capture sources driven elsewhere
    pub fn frame_sink(&self) -> FrameSink {
        let shared = Arc::clone(&self.shared);
        FrameSink::new(move |frame| shared.process_frame(frame))
    }

    /// Pull the next ready chunk (pull mode)
    pub fn next_chunk(&self) -> Option<Pcm16Chunk> {
        self.shared
            .aggregator
            .lock()
            .pop_chunk()
            .map(|samples| Pcm16Chunk::new(samples, self.config.target_sample_rate))
    }

    /// Current input level without waiting for the timer
    pub fn current_level(&self) -> f32 {
        self.shared.level.lock().level()
    }

    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Samples waiting in the aggregator
    pub fn buffered_samples(&self) -> usize {
        self.shared.aggregator.lock().len()
    }

    /// Samples lost to backpressure during the current run
    pub fn dropped_samples(&self) -> u64 {
        self.shared.aggregator.lock().dropped_samples()
    }

    /// Frames processed during the current run
    pub fn frames_processed(&self) -> u64 {
        self.shared.frames_in.load(Ordering::Relaxed)
    }

    fn reset(&mut self) {
        self.shared.aggregator.lock().clear();
        self.shared.level.lock().reset();
        self.shared.frames_in.store(0, Ordering::Relaxed);
        self.shared.samples_out.store(0, Ordering::Relaxed);
    }

    fn abort_start(&mut self, e: impl Into<AudioError>) -> AudioError {
        let e = e.into();
        self.shared.active.store(false, Ordering::Release);
        error!("Audio capture could not start: {}", e);
        if let Some(ref callback) = self.error_callback {
            callback(&e);
        }
        e
    }
}

impl Drop for AudioProcessor {
    fn drop(&mut self) {
        if self.is_active() {
            let discarded: usize = self.stop().iter().map(Pcm16Chunk::len).sum();
            if discarded > 0 {
                debug!(
                    "Audio processor dropped while active; discarded {} buffered samples",
                    discarded
                );
            }
        }
    }
}
