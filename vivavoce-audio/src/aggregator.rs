//! Fixed-size chunking for encoded audio
//!
//! Capture callbacks arrive at hardware-driven intervals with whatever block
//! size the device picked. The aggregator keeps those blocks in arrival order
//! and releases exactly `chunk_samples` at a time, so the transport can send
//! on a steady cadence.

use std::collections::VecDeque;

use tracing::warn;

use crate::error::{AudioError, Result};

/// Backlog of encoded PCM16 buffers sliced into fixed-size chunks
///
/// Buffers are stored whole; a chunk boundary that falls inside a buffer is
/// tracked with a read offset instead of copying the tail.
#[derive(Debug)]
pub struct FrameAggregator {
    backlog: VecDeque<Vec<i16>>,
    /// Samples of the front buffer already handed out
    front_offset: usize,
    /// Samples currently held (excluding `front_offset`)
    len: usize,
    chunk_samples: usize,
    max_backlog_samples: usize,
    dropped_samples: u64,
}

impl FrameAggregator {
    /// Create new aggregator
    ///
    /// # Arguments
    ///
    /// * `chunk_samples` - Samples per released chunk (e.g. 4800 = 200ms @ 24kHz)
    /// * `max_backlog_samples` - Backlog bound; oldest whole buffers are dropped past it
    pub fn new(chunk_samples: usize, max_backlog_samples: usize) -> Result<Self> {
        if chunk_samples == 0 {
            return Err(AudioError::invalid_config("Chunk size cannot be zero"));
        }
        if max_backlog_samples < chunk_samples {
            return Err(AudioError::invalid_config(format!(
                "Backlog bound ({}) must hold at least one chunk ({})",
                max_backlog_samples, chunk_samples
            )));
        }

        Ok(Self {
            backlog: VecDeque::new(),
            front_offset: 0,
            len: 0,
            chunk_samples,
            max_backlog_samples,
            dropped_samples: 0,
        })
    }

    /// Append one encoded buffer to the backlog
    ///
    /// Returns the number of samples dropped to stay under the backlog bound.
    /// The newest buffer is never dropped, even when it alone exceeds the bound.
    pub fn push(&mut self, samples: Vec<i16>) -> usize {
        if samples.is_empty() {
            return 0;
        }

        self.len += samples.len();
        self.backlog.push_back(samples);

        let mut dropped = 0;
        while self.len > self.max_backlog_samples && self.backlog.len() > 1 {
            if let Some(oldest) = self.backlog.pop_front() {
                let remaining = oldest.len() - self.front_offset;
                self.len -= remaining;
                dropped += remaining;
                self.front_offset = 0;
            }
        }

        if dropped > 0 {
            self.dropped_samples += dropped as u64;
            warn!(
                "Aggregator backlog over {} samples, dropped {} oldest samples",
                self.max_backlog_samples, dropped
            );
        }

        dropped
    }

    /// Take the next full chunk off the front of the backlog
    pub fn pop_chunk(&mut self) -> Option<Vec<i16>> {
        if self.len < self.chunk_samples {
            return None;
        }
        Some(self.take_front(self.chunk_samples))
    }

    /// Take every full chunk currently available
    pub fn drain_ready(&mut self) -> Vec<Vec<i16>> {
        let mut chunks = Vec::with_capacity(self.len / self.chunk_samples);
        while let Some(chunk) = self.pop_chunk() {
            chunks.push(chunk);
        }
        chunks
    }

    /// Return and clear everything still held, or `None` when empty
    pub fn flush(&mut self) -> Option<Vec<i16>> {
        if self.len == 0 {
            return None;
        }
        Some(self.take_front(self.len))
    }

    /// Samples currently held
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn chunk_samples(&self) -> usize {
        self.chunk_samples
    }

    pub fn max_backlog_samples(&self) -> usize {
        self.max_backlog_samples
    }

    /// Total samples lost to backpressure since creation or the last `clear`
    pub fn dropped_samples(&self) -> u64 {
        self.dropped_samples
    }

    /// Discard all held samples and reset counters
    pub fn clear(&mut self) {
        self.backlog.clear();
        self.front_offset = 0;
        self.len = 0;
        self.dropped_samples = 0;
    }

    fn take_front(&mut self, count: usize) -> Vec<i16> {
        let mut out = Vec::with_capacity(count);

        while out.len() < count {
            let Some(front) = self.backlog.front() else {
                break;
            };
            let available = &front[self.front_offset..];
            let needed = count - out.len();

            if available.len() <= needed {
                out.extend_from_slice(available);
                self.backlog.pop_front();
                self.front_offset = 0;
            } else {
                out.extend_from_slice(&available[..needed]);
                self.front_offset += needed;
            }
        }

        self.len -= out.len();
        out
    }
}
