use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/bandstand/config.toml` or `~/.config/bandstand/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `BANDSTAND__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub audio: AudioSettings,
    pub analysis: AnalysisSettings,
    pub bars: BarSettings,
    pub ui: UiSettings,
    pub controls: ControlsSettings,
    pub library: LibrarySettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Frames pulled from the current track per audio callback.
    pub block_frames: usize,
    /// How often the default output device is polled for changes (milliseconds).
    pub device_poll_ms: u64,
    /// Upper bound on concurrent decoder threads.
    pub loader_threads: usize,
    /// `previous` restarts the current track instead of going back once
    /// playback is past this point (milliseconds).
    pub restart_threshold_ms: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            block_frames: 1024,
            device_poll_ms: 1000,
            loader_threads: 2,
            restart_threshold_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// FFT window length in samples (power of two).
    pub fft_size: usize,
    /// Number of normalized frames averaged together. 1 disables smoothing.
    pub smoothing_frames: usize,
    /// Bins below this frequency (Hz) are ignored.
    pub min_frequency: f32,
    /// Bins above this frequency (Hz) are ignored.
    pub max_frequency: f32,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            fft_size: 4096,
            smoothing_frames: 2,
            min_frequency: 20.0,
            max_frequency: 20_000.0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BarMode {
    #[serde(alias = "log")]
    Logarithmic,
    Linear,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BarSettings {
    /// How FFT bins are grouped into bars.
    pub mode: BarMode,
    /// Target bar count (linear mode only).
    pub count: usize,
    /// Minimum width of one bar in terminal columns (linear mode only).
    pub min_bar_width: u16,
    /// Height of a bar at full amplitude.
    pub scale: f32,
    /// Rate at which bar heights chase their target, per second.
    pub smoothing: f32,
    pub min_height: f32,
    pub max_height: f32,
    /// Color of a silent bar.
    pub base_color: [u8; 3],
    /// Color of a bar at full amplitude.
    pub peak_color: [u8; 3],
    /// Exponent shaping the color ramp; 1.0 is linear.
    pub color_curve: f32,
}

impl Default for BarSettings {
    fn default() -> Self {
        Self {
            mode: BarMode::Logarithmic,
            count: 64,
            min_bar_width: 1,
            scale: 100.0,
            smoothing: 12.0,
            min_height: 0.0,
            max_height: 100.0,
            base_color: [64, 79, 89],
            peak_color: [255, 255, 255],
            color_curve: 0.85,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UiSettings {
    /// Redraw rate of the visualizer.
    pub fps: u32,

    /// The text rendered inside the top header box.
    pub header_text: String,

    /// How long skip notices stay on screen (milliseconds).
    pub notice_ms: u64,

    /// Which time fields to show for the status line, and in what order.
    ///
    /// Example: ["elapsed", "total", "remaining"]
    pub now_playing_time_fields: Vec<TimeField>,

    /// Separator used to join `now_playing_time_fields`.
    pub now_playing_time_separator: String,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            fps: 60,
            header_text: " ~ bandstand ~ ".to_string(),
            notice_ms: 3000,
            now_playing_time_fields: vec![TimeField::Elapsed, TimeField::Total, TimeField::Remaining],
            now_playing_time_separator: " / ".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlsSettings {
    /// Number of seconds to scrub when pressing `H` / `L`.
    pub scrub_seconds: u64,
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self { scrub_seconds: 5 }
    }
}

#[derive(Debug, Copy, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeField {
    Elapsed,
    Total,
    Remaining,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            extensions: vec!["mp3".into(), "flac".into(), "wav".into(), "ogg".into()],
            follow_links: true,
            include_hidden: false,
            recursive: true,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default level filter; `RUST_LOG` takes precedence.
    pub level: String,
    /// Log file. Falls back to the XDG state directory when unset.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}
