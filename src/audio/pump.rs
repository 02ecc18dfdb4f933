//! Body of the audio callback: read PCM, analyze it, publish the spectrum.

use std::sync::Arc;

use crate::analysis::{SpectrumAnalyzer, downmix_into};
use crate::config::AnalysisSettings;

use super::snapshot::SpectrumHandle;
use super::track::{Render, Track};

pub struct Pump {
    track: Arc<Track>,
    analyzer: SpectrumAnalyzer,
    /// The most recent `fft_size` mono samples sent to the device.
    window: Vec<f32>,
    mono: Vec<f32>,
    spectrum: SpectrumHandle,
    seen_seeks: u64,
}

impl Pump {
    pub fn new(track: Arc<Track>, analysis: &AnalysisSettings, spectrum: SpectrumHandle) -> Self {
        let analyzer = SpectrumAnalyzer::new(analysis, track.sample_rate());
        let window = vec![0.0; analyzer.fft_size()];
        let seen_seeks = track.seek_count();
        Self {
            track,
            analyzer,
            window,
            mono: Vec::new(),
            spectrum,
            seen_seeks,
        }
    }

    pub fn track(&self) -> &Arc<Track> {
        &self.track
    }

    /// Fill one device buffer and publish the spectrum of what was written.
    ///
    /// If the UI is reading the spectrum at this instant the new one is
    /// dropped; the next block replaces it anyway.
    pub fn fill(&mut self, out: &mut [f32]) -> Render {
        // Audio from before a seek says nothing about the new position.
        let seeks = self.track.seek_count();
        if seeks != self.seen_seeks {
            self.seen_seeks = seeks;
            self.analyzer.reset();
            self.window.fill(0.0);
        }

        let status = self.track.render(out);

        self.mono.clear();
        downmix_into(out, self.track.channels(), &mut self.mono);
        roll_window(&mut self.window, &self.mono);

        let amplitudes = self.analyzer.analyze(&self.window);
        self.spectrum.try_store(amplitudes);
        status
    }
}

/// Shift `incoming` into the tail of `window`, dropping the oldest samples.
pub(super) fn roll_window(window: &mut [f32], incoming: &[f32]) {
    let n = window.len();
    let m = incoming.len();
    if m >= n {
        window.copy_from_slice(&incoming[m - n..]);
    } else {
        window.copy_within(m.., 0);
        window[n - m..].copy_from_slice(incoming);
    }
}
