//! Windowed FFT magnitude spectrum, log-compressed and normalized per frame.

use std::f32::consts::PI;
use std::ops::Range;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::config::AnalysisSettings;

/// Guards `log10(0)` and the divide on silent frames.
pub const EPSILON: f32 = 1e-6;

pub struct SpectrumAnalyzer {
    fft_size: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    /// Bins inside the analyzed frequency range.
    in_range: Range<usize>,
    /// Ring of the last `smoothing_frames` normalized frames.
    history: Vec<Vec<f32>>,
    next_slot: usize,
    filled: usize,
}

impl SpectrumAnalyzer {
    pub fn new(settings: &AnalysisSettings, sample_rate: u32) -> Self {
        let fft_size = settings.fft_size.max(2);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        let window = (0..fft_size).map(|i| hann_window(i, fft_size)).collect();

        let in_range = analyzed_bins(settings, fft_size, sample_rate);

        let frames = settings.smoothing_frames.max(1);
        Self {
            fft_size,
            fft,
            window,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            scratch,
            in_range,
            history: vec![vec![0.0; fft_size / 2]; frames],
            next_slot: 0,
            filled: 0,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn bins(&self) -> usize {
        self.fft_size / 2
    }

    /// Analyze one chunk of mono samples.
    ///
    /// Only the first `fft_size` samples are used; shorter chunks are
    /// zero-padded. The result has `fft_size / 2` values in `[0, 1]`.
    pub fn analyze(&mut self, mono: &[f32]) -> Arc<[f32]> {
        let n = self.fft_size;
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = mono.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        // Magnitude in dB above the epsilon floor: silence sits at exactly 0.
        let floor_db = 20.0 * EPSILON.log10();
        let scale = 1.0 / n as f32;
        let frame = &mut self.history[self.next_slot];
        let mut peak = 0.0_f32;
        for (bin, value) in frame.iter_mut().enumerate() {
            if !self.in_range.contains(&bin) {
                *value = 0.0;
                continue;
            }
            let magnitude = self.buffer[bin].norm() * scale;
            let db = 20.0 * (magnitude + EPSILON).log10();
            let v = (db - floor_db).max(0.0);
            *value = if v.is_finite() { v } else { 0.0 };
            peak = peak.max(*value);
        }

        if peak < EPSILON {
            frame.fill(0.0);
        } else {
            for value in frame.iter_mut() {
                *value /= peak;
            }
        }

        self.next_slot = (self.next_slot + 1) % self.history.len();
        self.filled = (self.filled + 1).min(self.history.len());
        self.averaged()
    }

    /// Drop the smoothing history, e.g. after a seek.
    pub fn reset(&mut self) {
        for frame in &mut self.history {
            frame.fill(0.0);
        }
        self.next_slot = 0;
        self.filled = 0;
    }

    fn averaged(&self) -> Arc<[f32]> {
        if self.filled == 1 {
            let last = (self.next_slot + self.history.len() - 1) % self.history.len();
            return self.history[last].as_slice().into();
        }

        // Until the ring wraps, the filled slots are exactly its prefix.
        let weight = 1.0 / self.filled as f32;
        let mut out = vec![0.0_f32; self.bins()];
        for frame in self.history.iter().take(self.filled) {
            for (o, v) in out.iter_mut().zip(frame) {
                *o += v * weight;
            }
        }
        out.into()
    }
}

/// Bins whose centre frequency lies in `[min_frequency, max_frequency]`.
///
/// Bin frequencies increase with the index, so the band is one contiguous
/// range; it is empty when no bin falls inside.
pub fn analyzed_bins(settings: &AnalysisSettings, fft_size: usize, sample_rate: u32) -> Range<usize> {
    let bins = fft_size / 2;
    let bin_hz = sample_rate as f32 / fft_size.max(1) as f32;
    let hz = |bin: usize| bin as f32 * bin_hz;

    let start = (0..bins)
        .position(|b| hz(b) >= settings.min_frequency)
        .unwrap_or(bins);
    let end = (start..bins)
        .position(|b| hz(b) > settings.max_frequency)
        .map_or(bins, |n| start + n);
    start..end
}

/// Hann window coefficient for sample `index` of a window of `size`.
pub fn hann_window(index: usize, size: usize) -> f32 {
    if size < 2 {
        return 1.0;
    }
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}

/// Average interleaved frames down to one channel, appending to `mono`.
pub fn downmix_into(interleaved: &[f32], channels: u16, mono: &mut Vec<f32>) {
    let ch = channels.max(1) as usize;
    if ch == 1 {
        mono.extend_from_slice(interleaved);
        return;
    }
    let inv = 1.0 / ch as f32;
    mono.extend(
        interleaved
            .chunks_exact(ch)
            .map(|frame| frame.iter().sum::<f32>() * inv),
    );
}
