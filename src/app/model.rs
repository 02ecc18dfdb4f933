use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::analysis::{BarPartition, BarStyle, Bars};
use crate::audio::{Manager, TrackState};
use crate::config::{BarMode, Settings};

/// Longest frame step fed to the bar animation. Longer gaps (a suspended
/// terminal, a slow draw) would otherwise snap every bar to its target.
const MAX_FRAME_STEP: Duration = Duration::from_millis(250);

/// Notices kept on screen at once.
const MAX_NOTICES: usize = 8;

/// Playback status copied from the manager once per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub state: Option<TrackState>,
    pub path: Option<PathBuf>,
    pub position: Duration,
    pub duration: Duration,
    pub pending: usize,
    pub loading: usize,
    pub bar_mode: BarMode,
}

impl Default for Status {
    fn default() -> Self {
        Self {
            state: None,
            path: None,
            position: Duration::ZERO,
            duration: Duration::ZERO,
            pending: 0,
            loading: 0,
            bar_mode: BarMode::Logarithmic,
        }
    }
}

/// Everything one frame needs from the audio side.
pub struct FrameInput {
    pub amplitudes: Arc<[f32]>,
    pub partition: Arc<BarPartition>,
    pub status: Status,
    pub notices: Vec<String>,
}

impl FrameInput {
    pub fn from_manager(manager: &Manager) -> Self {
        Self {
            amplitudes: manager.amplitudes(),
            partition: manager.bar_partition(),
            status: Status {
                state: manager.audio_state(),
                path: manager.current_path(),
                position: manager.current_position(),
                duration: manager.duration(),
                pending: manager.pending_len(),
                loading: manager.loading_count(),
                bar_mode: manager.bar_mode(),
            },
            notices: manager.take_notices(),
        }
    }
}

#[derive(Debug, Clone)]
struct Notice {
    text: String,
    shown_at: Instant,
}

/// The main application model.
pub struct App {
    bars: Bars,
    partition: Arc<BarPartition>,
    status: Status,
    notices: VecDeque<Notice>,
    notice_ttl: Duration,
    last_frame: Option<Instant>,
}

impl App {
    pub fn new(settings: &Settings, partition: Arc<BarPartition>) -> Self {
        Self {
            bars: Bars::new(&partition, BarStyle::from(&settings.bars)),
            partition,
            status: Status {
                bar_mode: settings.bars.mode,
                ..Status::default()
            },
            notices: VecDeque::new(),
            notice_ttl: Duration::from_millis(settings.ui.notice_ms),
            last_frame: None,
        }
    }

    /// Pull the latest state from `manager` and step the animation to `now`.
    pub fn sync(&mut self, manager: &Manager, now: Instant) {
        self.tick(FrameInput::from_manager(manager), now);
    }

    /// Step the animation to `now` using `input`.
    pub fn tick(&mut self, input: FrameInput, now: Instant) {
        let dt = self
            .last_frame
            .map(|prev| now.saturating_duration_since(prev).min(MAX_FRAME_STEP))
            .unwrap_or(Duration::ZERO);
        self.last_frame = Some(now);

        if !Arc::ptr_eq(&self.partition, &input.partition) {
            self.bars.repartition(&input.partition);
            self.partition = input.partition;
        }
        self.bars.update(&input.amplitudes, dt.as_secs_f32());
        self.status = input.status;

        for text in input.notices {
            self.push_notice(text, now);
        }
        let ttl = self.notice_ttl;
        self.notices
            .retain(|n| now.saturating_duration_since(n.shown_at) < ttl);
    }

    pub fn push_notice(&mut self, text: impl Into<String>, now: Instant) {
        if self.notices.len() == MAX_NOTICES {
            self.notices.pop_front();
        }
        self.notices.push_back(Notice {
            text: text.into(),
            shown_at: now,
        });
    }

    /// The newest notice still on screen.
    pub fn notice(&self) -> Option<&str> {
        self.notices.back().map(|n| n.text.as_str())
    }

    pub fn bars(&self) -> &Bars {
        &self.bars
    }

    pub fn status(&self) -> &Status {
        &self.status
    }
}
