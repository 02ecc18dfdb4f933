//! Grouping of FFT bins into visual bars.
//!
//! A [`BarPartition`] is a list of contiguous, non-empty `[lo, hi)` bin
//! ranges covering `0..fft_size / 2`. Partitions are rebuilt whole whenever
//! their inputs change and never edited in place.

use std::ops::Range;

use crate::config::{BarMode, BarSettings};

/// Frequency ratio between successive logarithmic bucket boundaries.
pub const LOG_STEP: f64 = 1.06;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarPartition {
    ranges: Vec<Range<usize>>,
    /// Bins the analyzer actually fills; everything else reads as zero.
    analyzed: Range<usize>,
}

impl BarPartition {
    /// Log-spaced buckets: a conceptual frequency is multiplied by
    /// [`LOG_STEP`] until its bin passes Nyquist, and every distinct bin
    /// reached becomes a boundary.
    ///
    /// The bucket count depends only on `fft_size` and `sample_rate`.
    pub fn logarithmic(fft_size: usize, sample_rate: u32) -> Self {
        let half = fft_size / 2;
        let mut boundaries = vec![0usize];
        if sample_rate > 0 {
            let mut freq = 1.0_f64;
            loop {
                freq *= LOG_STEP;
                let idx = (freq * fft_size as f64 / sample_rate as f64).floor() as usize;
                if idx > half {
                    break;
                }
                boundaries.push(idx);
            }
        }
        Self::from_boundaries(boundaries, half)
    }

    /// `bar_count` equal-width buckets (fewer if there are not enough bins).
    pub fn linear(fft_size: usize, bar_count: usize) -> Self {
        let half = fft_size / 2;
        let bars = bar_count.max(1);
        let boundaries = (0..=bars).map(|i| i * half / bars).collect();
        Self::from_boundaries(boundaries, half)
    }

    /// Build the partition configured in `settings` for a display `width`
    /// columns wide.
    pub fn build(settings: &BarSettings, fft_size: usize, sample_rate: u32, width: u16) -> Self {
        match settings.mode {
            BarMode::Logarithmic => Self::logarithmic(fft_size, sample_rate),
            BarMode::Linear => {
                let fit = (width / settings.min_bar_width.max(1)).max(1) as usize;
                Self::linear(fft_size, settings.count.min(fit))
            }
        }
    }

    /// Sort, dedupe and clamp raw boundaries to `bins`, then pair them up.
    fn from_boundaries(mut boundaries: Vec<usize>, bins: usize) -> Self {
        for b in &mut boundaries {
            *b = (*b).min(bins);
        }
        boundaries.push(0);
        boundaries.push(bins);
        boundaries.sort_unstable();
        boundaries.dedup();

        let ranges = boundaries.windows(2).map(|w| w[0]..w[1]).collect();
        Self {
            ranges,
            analyzed: 0..bins,
        }
    }

    /// Record which bins carry signal. Bars wholly outside them are muted;
    /// the ranges themselves are unchanged.
    pub fn with_analyzed(mut self, bins: Range<usize>) -> Self {
        self.analyzed = bins;
        self
    }

    /// `true` when no bin of `range` is analyzed, so the bar can never move.
    pub fn is_muted(&self, range: &Range<usize>) -> bool {
        range.end <= self.analyzed.start || range.start >= self.analyzed.end
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Number of bins covered (`fft_size / 2`).
    pub fn bins(&self) -> usize {
        self.ranges.last().map_or(0, |r| r.end)
    }
}

/// Loudest value in `range`, clamped to `[0, 1]`.
///
/// Bins past the end of `amplitudes` read as silence.
pub fn bucket_max(amplitudes: &[f32], range: Range<usize>) -> f32 {
    let end = range.end.min(amplitudes.len());
    let start = range.start.min(end);
    amplitudes[start..end]
        .iter()
        .copied()
        .fold(0.0_f32, f32::max)
        .clamp(0.0, 1.0)
}
