//! Application module: the render-side model drawn by the TUI.
//!
//! `App` lives in `app::model`. It owns the animated bars and a copy of the
//! playback status taken once per frame, so drawing never touches the audio
//! side.

mod model;

pub use model::*;
