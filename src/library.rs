//! Turning user input (CLI arguments, pasted text) into a list of audio files.

mod display;
mod scan;

pub use display::display_name;
pub use scan::{expand, parse_pasted};
