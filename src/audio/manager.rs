//! The play queue and the current track.
//!
//! All mutation of the queue happens behind one lock. The audio callback
//! never takes it; it only sees the `Arc<Track>` handed to the output.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::Duration;

use crate::analysis::{BarPartition, analyzed_bins};
use crate::config::{AnalysisSettings, BarMode, BarSettings, Settings};
use crate::library::display_name;

use super::loader::{Loader, PendingTrack};
use super::output::Output;
use super::snapshot::{Snapshot, SpectrumHandle, silent_spectrum};
use super::track::{Track, TrackState};

/// Sample rate the bar partition assumes before any track has loaded.
const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Upper bound on remembered played tracks.
const HISTORY_LIMIT: usize = 256;

struct QueueState {
    pending: VecDeque<Arc<PendingTrack>>,
    current: Option<Arc<Track>>,
    /// Paths of tracks that were superseded, most recent last.
    history: Vec<PathBuf>,
}

/// Inputs of the bar partition.
struct Layout {
    bars: BarSettings,
    sample_rate: u32,
    width: u16,
}

impl Layout {
    fn partition(&self, analysis: &AnalysisSettings, fft_size: usize) -> BarPartition {
        BarPartition::build(&self.bars, fft_size, self.sample_rate, self.width)
            .with_analyzed(analyzed_bins(analysis, fft_size, self.sample_rate))
    }
}

pub struct Manager {
    queue: Mutex<QueueState>,
    loader: Loader,
    output: Arc<dyn Output>,
    spectrum: SpectrumHandle,
    partition: Arc<Snapshot<BarPartition>>,
    layout: Mutex<Layout>,
    notices: Mutex<Vec<String>>,
    analysis: AnalysisSettings,
    fft_size: usize,
    restart_threshold: Duration,
}

impl Manager {
    pub fn new(settings: &Settings, output: Arc<dyn Output>) -> Self {
        let fft_size = settings.analysis.fft_size;
        let layout = Layout {
            bars: settings.bars.clone(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            width: 0,
        };
        let partition = layout.partition(&settings.analysis, fft_size);

        Self {
            queue: Mutex::new(QueueState {
                pending: VecDeque::new(),
                current: None,
                history: Vec::new(),
            }),
            loader: Loader::new(settings.audio.loader_threads),
            output,
            spectrum: Arc::new(Snapshot::new(silent_spectrum(fft_size))),
            partition: Arc::new(Snapshot::new(Arc::new(partition))),
            layout: Mutex::new(layout),
            notices: Mutex::new(Vec::new()),
            analysis: settings.analysis.clone(),
            fft_size,
            restart_threshold: Duration::from_millis(settings.audio.restart_threshold_ms),
        }
    }

    /// Queue `path` behind everything already queued and start decoding it.
    pub fn enqueue(&self, path: impl Into<PathBuf>) {
        let pending = Arc::new(PendingTrack::new(path.into()));
        self.lock_queue().pending.push_back(Arc::clone(&pending));
        self.loader.submit(pending);
    }

    /// Queue an already decoded track.
    #[cfg(test)]
    pub fn enqueue_track(&self, track: Track) {
        self.lock_queue()
            .pending
            .push_back(Arc::new(PendingTrack::ready(track)));
    }

    /// Replace a finished (or absent) current track with the queue head.
    ///
    /// Called every UI tick. Gives up immediately if the queue is busy.
    /// Returns `true` when a new track started.
    pub fn advance(&self) -> bool {
        let mut queue = match self.queue.try_lock() {
            Ok(q) => q,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return false,
        };

        if queue.current.as_ref().is_some_and(|t| !t.is_finished()) {
            return false;
        }

        if let Some(old) = queue.current.take() {
            old.terminate();
            self.output.detach();
            remember(&mut queue.history, old.path());
            self.spectrum.store(silent_spectrum(self.fft_size));
            log::info!("finished {}", old.path().display());
        }

        while let Some(head) = queue.pending.front().cloned() {
            match head.take() {
                // Play order wins over load order.
                None => return false,
                Some(Err(reason)) => {
                    queue.pending.pop_front();
                    self.notify(format!("skipped {}: {}", display_name(head.path()), reason));
                }
                Some(Ok(track)) => {
                    queue.pending.pop_front();
                    let track = Arc::new(track);
                    self.set_sample_rate(track.sample_rate());
                    self.spectrum.store(silent_spectrum(self.fft_size));
                    track.start();
                    self.output
                        .attach(Arc::clone(&track), Arc::clone(&self.spectrum));
                    log::info!("playing {}", track.path().display());
                    queue.current = Some(track);
                    return true;
                }
            }
        }
        false
    }

    /// End the current track; the next `advance` moves on.
    pub fn skip(&self) -> bool {
        match &self.lock_queue().current {
            Some(track) => {
                track.terminate();
                true
            }
            None => false,
        }
    }

    /// Restart the current track, or go back to the previous one when
    /// playback has barely started.
    pub fn previous(&self) -> bool {
        let mut queue = self.lock_queue();

        if let Some(current) = queue.current.clone() {
            if current.is_finished() {
                // Not advanced past yet; it counts as played.
                queue.current = None;
                self.output.detach();
                remember(&mut queue.history, current.path());
            } else if current.position() > self.restart_threshold || queue.history.is_empty() {
                return current.seek_to(0.0);
            }
        }

        let Some(previous) = queue.history.pop() else {
            return false;
        };

        if let Some(current) = queue.current.take() {
            current.terminate();
            self.output.detach();
            let again = Arc::new(PendingTrack::new(current.path().to_path_buf()));
            queue.pending.push_front(Arc::clone(&again));
            self.loader.submit(again);
        }
        let back = Arc::new(PendingTrack::new(previous));
        queue.pending.push_front(Arc::clone(&back));
        self.loader.submit(back);
        self.spectrum.store(silent_spectrum(self.fft_size));
        true
    }

    /// Returns the new state, or `None` with nothing playing.
    pub fn toggle_pause(&self) -> Option<TrackState> {
        self.current().map(|t| t.toggle_pause())
    }

    /// Seek the current track. Out-of-range targets are clamped.
    pub fn set_position(&self, seconds: f64) -> bool {
        self.current().is_some_and(|t| t.seek_to(seconds))
    }

    /// Move the playhead by `delta_seconds` relative to where it is now.
    pub fn scrub(&self, delta_seconds: f64) -> bool {
        self.current().is_some_and(|t| {
            let target = t.position().as_secs_f64() + delta_seconds;
            t.seek_to(target.clamp(0.0, t.duration().as_secs_f64()))
        })
    }

    /// Latest spectrum; all zeros while nothing plays.
    pub fn amplitudes(&self) -> Arc<[f32]> {
        self.spectrum.load()
    }

    pub fn bar_partition(&self) -> Arc<BarPartition> {
        self.partition.load()
    }

    /// State of the current track, `None` when there is none.
    pub fn audio_state(&self) -> Option<TrackState> {
        self.current().map(|t| t.state())
    }

    pub fn current_position(&self) -> Duration {
        self.current().map_or(Duration::ZERO, |t| t.position())
    }

    pub fn duration(&self) -> Duration {
        self.current().map_or(Duration::ZERO, |t| t.duration())
    }

    pub fn current_path(&self) -> Option<PathBuf> {
        self.current().map(|t| t.path().to_path_buf())
    }

    /// Entries waiting behind the current track.
    pub fn pending_len(&self) -> usize {
        self.lock_queue().pending.len()
    }

    /// Files still being decoded.
    pub fn loading_count(&self) -> usize {
        self.loader.in_flight()
    }

    /// Drain user-facing messages recorded since the last call.
    pub fn take_notices(&self) -> Vec<String> {
        match self.notices.lock() {
            Ok(mut n) => std::mem::take(&mut *n),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    /// The visualizer is now `width` columns wide.
    pub fn resize(&self, width: u16) {
        self.update_layout(|layout| layout.width = width);
    }

    pub fn bar_mode(&self) -> BarMode {
        self.lock_layout().bars.mode
    }

    pub fn set_bar_mode(&self, mode: BarMode) {
        self.update_layout(|layout| layout.bars.mode = mode);
    }

    /// Stop playback, abandon pending loads and release the output.
    pub fn shutdown(&self) {
        {
            let mut queue = self.lock_queue();
            if let Some(track) = queue.current.take() {
                track.terminate();
            }
            queue.pending.clear();
        }
        self.loader.shutdown();
        self.output.detach();
        self.output.shutdown();
    }

    fn current(&self) -> Option<Arc<Track>> {
        self.lock_queue().current.clone()
    }

    fn set_sample_rate(&self, sample_rate: u32) {
        self.update_layout(|layout| layout.sample_rate = sample_rate);
    }

    /// Apply `f` and publish a new partition if the result differs.
    fn update_layout(&self, f: impl FnOnce(&mut Layout)) {
        let mut layout = self.lock_layout();
        f(&mut layout);
        let partition = layout.partition(&self.analysis, self.fft_size);
        if *self.partition.load() != partition {
            self.partition.store(Arc::new(partition));
        }
    }

    fn notify(&self, message: String) {
        match self.notices.lock() {
            Ok(mut n) => n.push(message),
            Err(poisoned) => poisoned.into_inner().push(message),
        }
    }

    fn lock_queue(&self) -> MutexGuard<'_, QueueState> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_layout(&self) -> MutexGuard<'_, Layout> {
        self.layout.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn remember(history: &mut Vec<PathBuf>, path: &Path) {
    if history.len() == HISTORY_LIMIT {
        history.remove(0);
    }
    history.push(path.to_path_buf());
}
