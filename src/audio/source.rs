//! Decoded PCM held in memory with a frame cursor.
//!
//! Files are decoded up front (off the real-time path) so the audio callback
//! only ever copies from memory.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use rodio::{Decoder, Source};

use super::error::AudioError;

/// Interleaved `f32` samples plus the format needed to play them.
pub struct PcmSource {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
    /// Next frame to be read.
    cursor: usize,
}

impl PcmSource {
    /// Decode `path` completely.
    pub fn open(path: &Path) -> Result<Self, AudioError> {
        let file = File::open(path).map_err(|source| AudioError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let decoder =
            Decoder::new(BufReader::new(file)).map_err(|e| AudioError::UnsupportedFormat {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let sample_rate = decoder.sample_rate();
        let channels = decoder.channels();
        if sample_rate == 0 || channels == 0 {
            return Err(AudioError::UnsupportedFormat {
                path: path.to_path_buf(),
                reason: format!("invalid format ({channels} channels @ {sample_rate} Hz)"),
            });
        }

        let samples: Vec<f32> = decoder.collect();
        Ok(Self::from_samples(samples, sample_rate, channels))
    }

    /// Wrap already-decoded interleaved samples. A trailing partial frame is dropped.
    pub fn from_samples(mut samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1);
        let whole = samples.len() - samples.len() % channels as usize;
        samples.truncate(whole);
        Self {
            samples,
            sample_rate: sample_rate.max(1),
            channels,
            cursor: 0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn total_frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.total_frames() as f64 / self.sample_rate as f64)
    }

    pub fn position_frames(&self) -> usize {
        self.cursor
    }

    /// Return up to `frame_count` frames and advance the cursor past them.
    ///
    /// The slice is shorter near the end of the stream and empty once it is exhausted.
    pub fn read(&mut self, frame_count: usize) -> &[f32] {
        let start = self.cursor.min(self.total_frames());
        let end = start.saturating_add(frame_count).min(self.total_frames());
        self.cursor = end;

        let ch = self.channels as usize;
        &self.samples[start * ch..end * ch]
    }

    /// Move the cursor to the frame nearest `seconds`, clamped to the stream.
    pub fn seek(&mut self, seconds: f64) {
        self.cursor = self.frame_at(seconds);
    }

    /// Frame index for `seconds`, clamped to `[0, total_frames]`.
    pub fn frame_at(&self, seconds: f64) -> usize {
        if !seconds.is_finite() || seconds <= 0.0 {
            // +inf clamps to the end, NaN and negatives to the start.
            return if seconds == f64::INFINITY {
                self.total_frames()
            } else {
                0
            };
        }
        let frame = (seconds * self.sample_rate as f64).round() as usize;
        frame.min(self.total_frames())
    }
}
