//! One playable file and its playback state machine.
//!
//! `Idle -> Playing <-> Paused -> Finished`. `Finished` is terminal: the
//! decoded audio is released and a new `Track` is needed to play the file
//! again.
//!
//! Two kinds of access meet here. The audio callback calls [`Track::render`]
//! at device cadence and must never wait, so it reads the state atomically and
//! only `try_lock`s the playhead. Seeks and termination come from the UI side
//! and may wait briefly for the playhead.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::Duration;

use super::error::AudioError;
use super::source::PcmSource;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrackState {
    /// Loaded, not started yet.
    Idle,
    Playing,
    /// Output continues with silence.
    Paused,
    /// Ended or terminated; the source is gone.
    Finished,
}

impl TrackState {
    fn as_u8(self) -> u8 {
        match self {
            TrackState::Idle => 0,
            TrackState::Playing => 1,
            TrackState::Paused => 2,
            TrackState::Finished => 3,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => TrackState::Idle,
            1 => TrackState::Playing,
            2 => TrackState::Paused,
            _ => TrackState::Finished,
        }
    }
}

/// Outcome of one [`Track::render`] call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Render {
    /// `frames` frames of audio were written; the rest of the buffer is silence.
    Audio { frames: usize },
    /// Not playing (idle or paused); the buffer is silence.
    Silent,
    /// A seek held the playhead; the buffer is silence.
    Contended,
    /// The stream ended or was terminated; the buffer is silence.
    Finished,
}

/// Read cursor state guarded by the seek lock.
pub(super) struct Playhead {
    /// `None` once the track is finished.
    source: Option<PcmSource>,
    /// Frames handed to the device since the start (or the last seek).
    pub(super) samples_passed: u64,
}

pub struct Track {
    path: PathBuf,
    sample_rate: u32,
    channels: u16,
    duration: Duration,
    state: AtomicU8,
    /// Bumped on every seek so readers of the audio can drop stale context.
    seeks: AtomicU64,
    playhead: Mutex<Playhead>,
}

impl Track {
    /// Decode `path` into a new idle track.
    pub fn load(path: &Path) -> Result<Self, AudioError> {
        let source = PcmSource::open(path)?;
        Ok(Self::from_source(path.to_path_buf(), source))
    }

    pub fn from_source(path: PathBuf, source: PcmSource) -> Self {
        Self {
            path,
            sample_rate: source.sample_rate(),
            channels: source.channels(),
            duration: source.duration(),
            state: AtomicU8::new(TrackState::Idle.as_u8()),
            seeks: AtomicU64::new(0),
            playhead: Mutex::new(Playhead {
                source: Some(source),
                samples_passed: 0,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn state(&self) -> TrackState {
        TrackState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_finished(&self) -> bool {
        self.state() == TrackState::Finished
    }

    /// Idle -> Playing. Returns `false` if the track was not idle.
    pub fn start(&self) -> bool {
        self.transition(TrackState::Idle, TrackState::Playing)
    }

    /// Playing <-> Paused. Idle and finished tracks are left alone.
    ///
    /// Returns the state after the call.
    pub fn toggle_pause(&self) -> TrackState {
        if self.transition(TrackState::Playing, TrackState::Paused) {
            return TrackState::Paused;
        }
        if self.transition(TrackState::Paused, TrackState::Playing) {
            return TrackState::Playing;
        }
        self.state()
    }

    /// Pause if playing. Returns `true` if the state changed.
    pub fn pause(&self) -> bool {
        self.transition(TrackState::Playing, TrackState::Paused)
    }

    /// Move the playhead to `seconds`, clamped to `[0, duration]`.
    ///
    /// Returns `false` for finished tracks.
    pub fn seek_to(&self, seconds: f64) -> bool {
        if self.is_finished() {
            return false;
        }
        let mut playhead = self.lock_playhead();
        let Some(source) = playhead.source.as_mut() else {
            return false;
        };
        source.seek(seconds);
        playhead.samples_passed = source.position_frames() as u64;
        self.seeks.fetch_add(1, Ordering::AcqRel);
        true
    }

    /// Number of seeks so far.
    pub fn seek_count(&self) -> u64 {
        self.seeks.load(Ordering::Acquire)
    }

    /// Current playback position.
    pub fn position(&self) -> Duration {
        Duration::from_secs_f64(self.samples_passed() as f64 / self.sample_rate as f64)
    }

    pub fn samples_passed(&self) -> u64 {
        self.lock_playhead().samples_passed
    }

    /// Force `Finished` and release the decoded audio.
    ///
    /// The state flips first so a callback that has not yet taken the
    /// playhead backs off; taking the lock afterwards waits out one that has.
    pub fn terminate(&self) {
        self.state
            .store(TrackState::Finished.as_u8(), Ordering::Release);
        let mut playhead = self.lock_playhead();
        playhead.source = None;
    }

    /// Fill `out` (interleaved, `channels` samples per frame) from the playhead.
    ///
    /// Never blocks. Anything not filled with audio is zeroed.
    pub fn render(&self, out: &mut [f32]) -> Render {
        match self.state() {
            TrackState::Playing => {}
            TrackState::Finished => {
                out.fill(0.0);
                return Render::Finished;
            }
            TrackState::Idle | TrackState::Paused => {
                out.fill(0.0);
                return Render::Silent;
            }
        }

        let mut playhead = match self.playhead.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                out.fill(0.0);
                return Render::Contended;
            }
        };
        self.render_locked(&mut playhead, out)
    }

    /// The part of [`Track::render`] that runs under the playhead.
    pub(super) fn render_locked(&self, playhead: &mut Playhead, out: &mut [f32]) -> Render {
        // A terminate between the first state check and the lock wins.
        if self.is_finished() {
            out.fill(0.0);
            return Render::Finished;
        }

        let ch = self.channels as usize;
        let wanted = out.len() / ch;
        let read = match playhead.source.as_mut() {
            Some(source) => {
                let frames = source.read(wanted);
                out[..frames.len()].copy_from_slice(frames);
                frames.len() / ch
            }
            None => 0,
        };
        out[read * ch..].fill(0.0);

        if read == 0 && wanted > 0 {
            // A pause that raced this read keeps the track alive.
            if self.transition(TrackState::Playing, TrackState::Finished) {
                playhead.source = None;
                log::debug!("end of stream: {}", self.path.display());
                return Render::Finished;
            }
            return if self.is_finished() {
                Render::Finished
            } else {
                Render::Silent
            };
        }

        playhead.samples_passed += read as u64;
        Render::Audio { frames: read }
    }

    fn transition(&self, from: TrackState, to: TrackState) -> bool {
        self.state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn lock_playhead(&self) -> MutexGuard<'_, Playhead> {
        self.playhead.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[cfg(test)]
    pub(super) fn playhead_for_tests(&self) -> MutexGuard<'_, Playhead> {
        self.lock_playhead()
    }

    /// Flip the state without touching the playhead.
    #[cfg(test)]
    pub(super) fn force_state_for_tests(&self, state: TrackState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }
}
