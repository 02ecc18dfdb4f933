//! Decoding, playback, the audio callback and the play queue.

mod error;
mod loader;
mod manager;
mod output;
mod pump;
mod snapshot;
mod source;
mod track;

pub use manager::Manager;
pub use output::{DeviceOutput, NullOutput, Output};
pub use track::TrackState;
