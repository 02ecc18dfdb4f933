use std::fmt;
use std::io;
use std::path::PathBuf;

/// Failures surfaced by the audio subsystem.
///
/// None of these are fatal: load errors turn into "skipped" notices and
/// device errors pause playback until the device comes back.
#[derive(Debug)]
pub enum AudioError {
    /// The file could not be opened.
    Open { path: PathBuf, source: io::Error },
    /// The file opened but could not be decoded to PCM.
    UnsupportedFormat { path: PathBuf, reason: String },
    /// No output stream could be opened on the current default device.
    DeviceOpen(String),
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioError::Open { path, source } => {
                write!(f, "cannot open {}: {}", path.display(), source)
            }
            AudioError::UnsupportedFormat { path, reason } => {
                write!(f, "unsupported audio file {}: {}", path.display(), reason)
            }
            AudioError::DeviceOpen(reason) => write!(f, "cannot open audio output: {reason}"),
        }
    }
}

impl std::error::Error for AudioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AudioError::Open { source, .. } => Some(source),
            _ => None,
        }
    }
}
