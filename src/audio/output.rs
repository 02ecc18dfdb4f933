//! Audio output: the device thread, its rodio sink and device-change recovery.
//!
//! rodio's mixer pulls samples from a [`TrackSource`], which refills itself
//! one block at a time through a [`Pump`]. That block refill is the audio
//! callback. The stream and sink live on a dedicated thread that also polls
//! the default output device and reopens the stream when it changes.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rodio::cpal::traits::{DeviceTrait, HostTrait};
use rodio::{OutputStream, OutputStreamBuilder, Sink, Source};

use crate::config::{AnalysisSettings, AudioSettings};

use super::error::AudioError;
use super::pump::Pump;
use super::snapshot::SpectrumHandle;
use super::track::{Render, Track};

/// Where the manager sends the current track to be heard.
pub trait Output: Send + Sync {
    /// Start pulling audio from `track`, replacing whatever was attached.
    fn attach(&self, track: Arc<Track>, spectrum: SpectrumHandle);
    /// Stop pulling audio.
    fn detach(&self);
    /// Release the device. Later calls are no-ops.
    fn shutdown(&self);
}

/// Discards everything. Nothing pulls audio, so tracks only end when skipped.
#[derive(Debug, Default)]
pub struct NullOutput;

impl Output for NullOutput {
    fn attach(&self, _track: Arc<Track>, _spectrum: SpectrumHandle) {}

    fn detach(&self) {}

    fn shutdown(&self) {}
}

/// A `rodio::Source` over one track.
pub struct TrackSource {
    pump: Pump,
    block: Vec<f32>,
    pos: usize,
    channels: u16,
    sample_rate: u32,
    done: bool,
}

impl TrackSource {
    pub fn new(pump: Pump, block_frames: usize) -> Self {
        let track = pump.track();
        let channels = track.channels();
        let sample_rate = track.sample_rate();
        let len = block_frames.max(1) * channels as usize;
        Self {
            pump,
            block: vec![0.0; len],
            // Start exhausted so the first `next` pulls a block.
            pos: len,
            channels,
            sample_rate,
            done: false,
        }
    }
}

impl Iterator for TrackSource {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.block.len() {
            if self.done {
                return None;
            }
            if self.pump.fill(&mut self.block) == Render::Finished {
                self.done = true;
                return None;
            }
            self.pos = 0;
        }
        let sample = self.block[self.pos];
        self.pos += 1;
        Some(sample)
    }
}

impl Source for TrackSource {
    fn current_span_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> rodio::ChannelCount {
        self.channels
    }

    fn sample_rate(&self) -> rodio::SampleRate {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Unchanged,
    /// A different (or newly available) default device.
    Changed,
    /// There is no default device anymore.
    Lost,
}

/// Tracks the default output device between polls.
#[derive(Debug, Default)]
pub struct DeviceWatch {
    current: Option<String>,
}

impl DeviceWatch {
    pub fn new(current: Option<String>) -> Self {
        Self { current }
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Compare the latest default device name against the last one seen.
    pub fn observe(&mut self, name: Option<String>) -> DeviceEvent {
        match (self.current.as_deref(), name) {
            (Some(old), Some(new)) if old == new => DeviceEvent::Unchanged,
            (_, Some(new)) => {
                self.current = Some(new);
                DeviceEvent::Changed
            }
            (Some(_), None) => {
                self.current = None;
                DeviceEvent::Lost
            }
            (None, None) => DeviceEvent::Unchanged,
        }
    }
}

enum OutputCmd {
    Attach {
        track: Arc<Track>,
        spectrum: SpectrumHandle,
    },
    Detach,
    Quit,
}

/// The default output device, driven from its own thread.
pub struct DeviceOutput {
    tx: Sender<OutputCmd>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl DeviceOutput {
    pub fn spawn(audio: &AudioSettings, analysis: &AnalysisSettings) -> Self {
        let (tx, rx) = mpsc::channel::<OutputCmd>();
        let poll = Duration::from_millis(audio.device_poll_ms.max(50));
        let block_frames = audio.block_frames;
        let analysis = analysis.clone();

        let join = thread::Builder::new()
            .name("audio-output".into())
            .spawn(move || run_device_thread(rx, poll, block_frames, analysis))
            .map_err(|e| log::error!("cannot spawn audio output thread: {e}"))
            .ok();

        Self {
            tx,
            join: Mutex::new(join),
        }
    }
}

impl Output for DeviceOutput {
    fn attach(&self, track: Arc<Track>, spectrum: SpectrumHandle) {
        let _ = self.tx.send(OutputCmd::Attach { track, spectrum });
    }

    fn detach(&self) {
        let _ = self.tx.send(OutputCmd::Detach);
    }

    fn shutdown(&self) {
        let _ = self.tx.send(OutputCmd::Quit);
        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}

/// An open stream and the sink feeding it.
struct Connection {
    sink: Sink,
    // Dropped after `sink`; closing the stream ends the device callback.
    _stream: OutputStream,
}

impl Connection {
    fn open() -> Result<Self, AudioError> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| AudioError::DeviceOpen(e.to_string()))?;
        // rodio logs to stderr when the stream is dropped, which would land on the TUI.
        stream.log_on_drop(false);
        let sink = Sink::connect_new(stream.mixer());
        Ok(Self {
            sink,
            _stream: stream,
        })
    }

    fn play(&self, source: TrackSource) {
        self.sink.clear();
        self.sink.append(source);
        self.sink.play();
    }

    fn stop(&self) {
        self.sink.stop();
        self.sink.clear();
    }
}

fn default_device_name() -> Option<String> {
    rodio::cpal::default_host()
        .default_output_device()
        .and_then(|d| d.name().ok())
}

fn run_device_thread(
    rx: Receiver<OutputCmd>,
    poll: Duration,
    block_frames: usize,
    analysis: AnalysisSettings,
) {
    let mut watch = DeviceWatch::new(default_device_name());
    let mut connection = open_connection(&watch);
    let mut attached: Option<(Arc<Track>, SpectrumHandle)> = None;
    let mut last_poll = Instant::now();

    let source_for = |track: &Arc<Track>, spectrum: &SpectrumHandle| {
        let pump = Pump::new(Arc::clone(track), &analysis, Arc::clone(spectrum));
        TrackSource::new(pump, block_frames)
    };

    loop {
        match rx.recv_timeout(poll.min(Duration::from_millis(200))) {
            Ok(OutputCmd::Attach { track, spectrum }) => {
                if let Some(conn) = &connection {
                    conn.play(source_for(&track, &spectrum));
                } else {
                    // Nothing can be heard until a device comes back.
                    track.pause();
                }
                attached = Some((track, spectrum));
            }
            Ok(OutputCmd::Detach) => {
                if let Some(conn) = &connection {
                    conn.stop();
                }
                attached = None;
            }
            Ok(OutputCmd::Quit) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        if last_poll.elapsed() < poll {
            continue;
        }
        last_poll = Instant::now();

        let event = watch.observe(default_device_name());
        let reopen = match event {
            DeviceEvent::Changed => {
                log::info!(
                    "default output device changed to {}",
                    watch.current().unwrap_or("<unknown>")
                );
                true
            }
            DeviceEvent::Lost => {
                log::warn!("default output device disappeared");
                if let Some(conn) = connection.take() {
                    conn.stop();
                }
                if let Some((track, _)) = &attached {
                    track.pause();
                }
                false
            }
            // Keep retrying after a failed open.
            DeviceEvent::Unchanged => connection.is_none() && watch.current().is_some(),
        };

        if reopen {
            if let Some(conn) = connection.take() {
                conn.stop();
            }
            connection = open_connection(&watch);
            match (&connection, &attached) {
                (Some(conn), Some((track, spectrum))) => {
                    conn.play(source_for(track, spectrum));
                }
                (None, Some((track, _))) => {
                    track.pause();
                }
                _ => {}
            }
        }
    }

    if let Some(conn) = connection.take() {
        conn.stop();
    }
}

fn open_connection(watch: &DeviceWatch) -> Option<Connection> {
    match Connection::open() {
        Ok(conn) => {
            log::info!(
                "audio output opened on {}",
                watch.current().unwrap_or("<default>")
            );
            Some(conn)
        }
        Err(e) => {
            log::warn!("{e}");
            None
        }
    }
}
