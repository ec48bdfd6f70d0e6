//! Capture sources
//!
//! A [`CaptureBackend`] acquires an input device and pushes native-rate
//! [`AudioFrame`]s into a [`FrameSink`] from the device callback thread. The
//! returned [`CaptureHandle`] owns the native stream: dropping it releases the
//! device.

use std::fmt;
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Host, SampleFormat, Stream, StreamConfig};
use tracing::{debug, info, warn};

use crate::error::{AudioError, Result};
use crate::frame::AudioFrame;
use crate::AudioConfig;

/// Push side of the pipeline handed to capture callbacks
#[derive(Clone)]
pub struct FrameSink {
    inner: Arc<dyn Fn(AudioFrame) + Send + Sync>,
}

impl FrameSink {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(AudioFrame) + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    pub fn push(&self, frame: AudioFrame) {
        (self.inner)(frame)
    }
}

impl fmt::Debug for FrameSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FrameSink")
    }
}

/// An acquired capture source; dropping it releases the device
pub trait CaptureHandle {
    /// Native sample rate of delivered frames
    fn sample_rate(&self) -> u32;

    /// Native channel count of delivered frames
    fn channels(&self) -> u16;

    fn device_name(&self) -> &str;
}

/// Something that can acquire a capture source
pub trait CaptureBackend {
    /// Acquire the device and start delivering frames to `sink`
    fn open(&mut self, sink: FrameSink) -> Result<Box<dyn CaptureHandle>>;
}

/// Audio device information
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub index: usize,
    pub name: String,
    pub is_default: bool,
    pub max_input_channels: u16,
    pub default_sample_rate: u32,
}

/// Microphone capture through cpal
pub struct CpalCapture {
    host: Host,
    device_index: Option<usize>,
    blocksize: Option<u32>,
}

impl CpalCapture {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            host: cpal::default_host(),
            device_index: config.device_index,
            blocksize: config.blocksize,
        }
    }

    /// List all available input devices
    pub fn list_devices() -> Result<Vec<DeviceInfo>> {
        let host = cpal::default_host();
        let default_name = host.default_input_device().and_then(|d| d.name().ok());

        let mut devices = Vec::new();
        for (index, device) in host
            .input_devices()
            .map_err(|e| AudioError::device(format!("Failed to enumerate devices: {}", e)))?
            .enumerate()
        {
            let name = device
                .name()
                .unwrap_or_else(|_| format!("Unknown Device {}", index));

            let (max_input_channels, default_sample_rate) = device
                .default_input_config()
                .map(|c| (c.channels(), c.sample_rate().0))
                .unwrap_or((0, 0));

            devices.push(DeviceInfo {
                index,
                is_default: default_name.as_deref() == Some(name.as_str()),
                name,
                max_input_channels,
                default_sample_rate,
            });
        }

        Ok(devices)
    }

    fn select_device(&self) -> Result<Device> {
        match self.device_index {
            Some(index) => {
                debug!("Selecting input device index {}", index);
                self.host
                    .input_devices()
                    .map_err(|e| AudioError::device(format!("Failed to enumerate devices: {}", e)))?
                    .nth(index)
                    .ok_or_else(|| AudioError::device(format!("Device index {} not found", index)))
            }
            None => self
                .host
                .default_input_device()
                .ok_or_else(|| AudioError::device("No default input device found")),
        }
    }
}

impl CaptureBackend for CpalCapture {
    fn open(&mut self, sink: FrameSink) -> Result<Box<dyn CaptureHandle>> {
        let device = self.select_device()?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        let supported_config = device
            .default_input_config()
            .map_err(|e| AudioError::device(format!("Failed to get device config: {}", e)))?;

        let sample_rate = supported_config.sample_rate().0;
        let channels = supported_config.channels();
        let sample_format = supported_config.sample_format();

        let stream_config = StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: match self.blocksize {
                Some(frames) => cpal::BufferSize::Fixed(frames),
                None => cpal::BufferSize::Default,
            },
        };

        let on_stream_error = |err: cpal::StreamError| {
            warn!("Audio stream error: {}", err);
        };

        let stream = match sample_format {
            SampleFormat::F32 => device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    sink.push(AudioFrame::new(data.to_vec(), sample_rate, channels));
                },
                on_stream_error,
                None,
            ),
            SampleFormat::I16 => device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let samples = data.iter().map(|&s| s as f32 / 32768.0).collect();
                    sink.push(AudioFrame::new(samples, sample_rate, channels));
                },
                on_stream_error,
                None,
            ),
            other => {
                return Err(AudioError::device(format!(
                    "Unsupported sample format {:?} on {}",
                    other, device_name
                )))
            }
        }
        .map_err(|e| AudioError::stream(format!("Failed to build stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| AudioError::stream(format!("Failed to start stream: {}", e)))?;

        info!(
            "Capture started on {} ({} Hz, {} ch, {:?})",
            device_name, sample_rate, channels, sample_format
        );

        Ok(Box::new(CpalHandle {
            stream,
            device_name,
            sample_rate,
            channels,
        }))
    }
}

struct CpalHandle {
    stream: Stream,
    device_name: String,
    sample_rate: u32,
    channels: u16,
}

impl CaptureHandle for CpalHandle {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl Drop for CpalHandle {
    fn drop(&mut self) {
        if let Err(e) = self.stream.pause() {
            debug!("Pausing stream on release failed: {}", e);
        }
        info!("Capture released on {}", self.device_name);
    }
}
