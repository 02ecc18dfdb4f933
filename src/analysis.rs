//! Spectrum analysis and bar layout.
//!
//! `spectrum` turns PCM chunks into normalized amplitude vectors, `buckets`
//! maps FFT bins onto bars and `bars` animates them frame by frame.

mod bars;
mod buckets;
mod spectrum;

pub use bars::{BarStyle, Bars};
pub use buckets::BarPartition;
pub use spectrum::{SpectrumAnalyzer, analyzed_bins, downmix_into};

#[cfg(test)]
mod tests;
