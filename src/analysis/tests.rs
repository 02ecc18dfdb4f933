use std::f32::consts::PI;

use super::bars::{Bar, lerp_color};
use super::buckets::bucket_max;
use super::spectrum::hann_window;
use super::*;
use crate::config::{AnalysisSettings, BarMode, BarSettings};

fn settings(fft_size: usize, smoothing_frames: usize) -> AnalysisSettings {
    AnalysisSettings {
        fft_size,
        smoothing_frames,
        ..AnalysisSettings::default()
    }
}

fn sine(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin() * 0.8)
        .collect()
}

fn argmax(v: &[f32]) -> usize {
    v.iter()
        .enumerate()
        .fold((0, f32::MIN), |(bi, bv), (i, &x)| if x > bv { (i, x) } else { (bi, bv) })
        .0
}

#[test]
fn hann_window_is_zero_at_edges_and_one_in_the_middle() {
    let size = 1025;
    assert!(hann_window(0, size).abs() < 1e-6);
    assert!(hann_window(size - 1, size).abs() < 1e-6);
    assert!((hann_window(size / 2, size) - 1.0).abs() < 1e-6);
}

#[test]
fn downmix_averages_channels() {
    let mut mono = Vec::new();
    downmix_into(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2, &mut mono);
    assert_eq!(mono, vec![0.5, 0.5, 0.0]);

    let mut mono = Vec::new();
    downmix_into(&[0.25, 0.5], 1, &mut mono);
    assert_eq!(mono, vec![0.25, 0.5]);
}

#[test]
fn silence_yields_all_zero_amplitudes() {
    let mut analyzer = SpectrumAnalyzer::new(&settings(1024, 1), 44_100);
    let out = analyzer.analyze(&vec![0.0; 1024]);
    assert_eq!(out.len(), 512);
    assert!(out.iter().all(|&v| v == 0.0));

    // Short and empty chunks are zero-padded.
    assert!(analyzer.analyze(&[]).iter().all(|&v| v == 0.0));
    assert!(analyzer.analyze(&[0.0; 17]).iter().all(|&v| v == 0.0));
}

#[test]
fn silence_stays_finite_with_smoothing() {
    let mut analyzer = SpectrumAnalyzer::new(&settings(2048, 4), 48_000);
    for _ in 0..6 {
        let out = analyzer.analyze(&vec![0.0; 2048]);
        assert!(out.iter().all(|v| v.is_finite() && *v == 0.0));
    }
}

#[test]
fn sinusoid_peak_bin_normalizes_to_one() {
    let fft_size = 1024;
    let sample_rate = 44_100;
    let bin = 40;
    let freq = bin as f32 * sample_rate as f32 / fft_size as f32;

    let mut analyzer = SpectrumAnalyzer::new(&settings(fft_size, 1), sample_rate);
    let out = analyzer.analyze(&sine(freq, sample_rate, fft_size));

    assert_eq!(argmax(&out), bin);
    assert_eq!(out[bin], 1.0);
    assert!(out.iter().all(|&v| (0.0..=1.0).contains(&v)));
}

#[test]
fn bins_outside_the_frequency_range_are_ignored() {
    let fft_size = 1024;
    let sample_rate = 44_100;
    let cfg = AnalysisSettings {
        fft_size,
        smoothing_frames: 1,
        min_frequency: 1000.0,
        max_frequency: 5000.0,
    };
    let bin_hz = sample_rate as f32 / fft_size as f32;

    let mut analyzer = SpectrumAnalyzer::new(&cfg, sample_rate);
    let out = analyzer.analyze(&sine(2000.0, sample_rate, fft_size));

    for (bin, &v) in out.iter().enumerate() {
        let hz = bin as f32 * bin_hz;
        if !(1000.0..=5000.0).contains(&hz) {
            assert_eq!(v, 0.0, "bin {bin} ({hz} Hz) should be masked");
        }
    }
    assert_eq!(out.iter().copied().fold(0.0, f32::max), 1.0);
}

#[test]
fn smoothing_averages_recent_frames() {
    let fft_size = 1024;
    let sample_rate = 44_100;
    let freq = 40.0 * sample_rate as f32 / fft_size as f32;
    let tone = sine(freq, sample_rate, fft_size);

    let mut analyzer = SpectrumAnalyzer::new(&settings(fft_size, 2), sample_rate);
    let first = analyzer.analyze(&tone);
    assert_eq!(first[40], 1.0);

    let second = analyzer.analyze(&vec![0.0; fft_size]);
    assert!((second[40] - 0.5).abs() < 1e-6);

    // The tone has left the two-frame window.
    let third = analyzer.analyze(&vec![0.0; fft_size]);
    assert_eq!(third[40], 0.0);
}

#[test]
fn reset_clears_smoothing_history() {
    let fft_size = 1024;
    let sample_rate = 44_100;
    let freq = 40.0 * sample_rate as f32 / fft_size as f32;

    let mut analyzer = SpectrumAnalyzer::new(&settings(fft_size, 4), sample_rate);
    analyzer.analyze(&sine(freq, sample_rate, fft_size));
    analyzer.reset();
    let out = analyzer.analyze(&vec![0.0; fft_size]);
    assert!(out.iter().all(|&v| v == 0.0));
}

fn boundaries(p: &BarPartition) -> Vec<usize> {
    let mut b: Vec<usize> = p.ranges().iter().map(|r| r.start).collect();
    b.push(p.bins());
    b
}

fn assert_partition_invariants(p: &BarPartition, bins: usize) {
    let ranges = p.ranges();
    assert!(!ranges.is_empty());
    assert_eq!(ranges[0].start, 0);
    assert_eq!(ranges[ranges.len() - 1].end, bins);
    for r in ranges {
        assert!(r.start < r.end, "empty range {r:?}");
    }
    for w in ranges.windows(2) {
        assert_eq!(w[0].end, w[1].start, "gap or overlap between {:?} and {:?}", w[0], w[1]);
    }
}

#[test]
fn logarithmic_partition_for_4096_at_44100() {
    let p = BarPartition::logarithmic(4096, 44_100);
    assert_eq!(p.len(), 99);
    assert_eq!(p.bins(), 2048);

    let b = boundaries(&p);
    assert_eq!(
        &b[..26],
        &[
            0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 22, 23, 24,
            26, 28
        ]
    );
    assert_eq!(&b[b.len() - 6..], &[1563, 1656, 1756, 1861, 1973, 2048]);
    assert_partition_invariants(&p, 2048);
}

#[test]
fn logarithmic_partition_is_deterministic() {
    assert_eq!(
        BarPartition::logarithmic(4096, 44_100),
        BarPartition::logarithmic(4096, 44_100)
    );
}

#[test]
fn logarithmic_partition_invariants_hold_across_sizes_and_rates() {
    let rates = [8_000, 11_025, 22_050, 32_000, 44_100, 48_000, 88_200, 96_000, 192_000];
    for shift in 6..=15 {
        let fft_size = 1usize << shift;
        for &rate in &rates {
            let p = BarPartition::logarithmic(fft_size, rate);
            assert_partition_invariants(&p, fft_size / 2);
        }
    }
}

#[test]
fn logarithmic_bucket_count_ignores_display_width() {
    let cfg = BarSettings::default();
    assert_eq!(cfg.mode, BarMode::Logarithmic);
    let narrow = BarPartition::build(&cfg, 4096, 48_000, 20);
    let wide = BarPartition::build(&cfg, 4096, 48_000, 300);
    assert_eq!(narrow, wide);
}

#[test]
fn linear_partition_splits_evenly() {
    let p = BarPartition::linear(4096, 64);
    assert_eq!(p.len(), 64);
    assert!(p.ranges().iter().all(|r| r.len() == 32));
    assert_partition_invariants(&p, 2048);

    // More bars than bins collapses to one bin per bar.
    let p = BarPartition::linear(16, 20);
    assert_eq!(p.len(), 8);
    assert_partition_invariants(&p, 8);

    // Uneven splits still cover everything.
    let p = BarPartition::linear(1024, 7);
    assert_eq!(p.len(), 7);
    assert_partition_invariants(&p, 512);

    assert_eq!(BarPartition::linear(1024, 0).len(), 1);
}

#[test]
fn linear_partition_fits_display_width() {
    let cfg = BarSettings {
        mode: BarMode::Linear,
        count: 64,
        min_bar_width: 2,
        ..BarSettings::default()
    };
    assert_eq!(BarPartition::build(&cfg, 4096, 44_100, 40).len(), 20);
    assert_eq!(BarPartition::build(&cfg, 4096, 44_100, 400).len(), 64);
    assert_eq!(BarPartition::build(&cfg, 4096, 44_100, 0).len(), 1);
}

#[test]
fn analyzed_band_matches_the_analyzer_mask() {
    let cfg = AnalysisSettings::default();
    assert_eq!(analyzed_bins(&cfg, 4096, 44_100), 2..1858);

    let inverted = AnalysisSettings {
        min_frequency: 5000.0,
        max_frequency: 1000.0,
        ..AnalysisSettings::default()
    };
    assert!(analyzed_bins(&inverted, 4096, 44_100).is_empty());
}

#[test]
fn bars_outside_the_analyzed_band_are_muted() {
    let partition = BarPartition::logarithmic(4096, 44_100)
        .with_analyzed(analyzed_bins(&AnalysisSettings::default(), 4096, 44_100));
    assert_eq!(&partition.ranges()[..3], &[0..1, 1..2, 2..3]);

    let bars = Bars::new(&partition, style());
    let muted: Vec<bool> = bars.bars().iter().map(|b| b.muted).collect();
    assert_eq!(&muted[..3], &[true, true, false]);
    // 1756..1861 straddles 20 kHz; 1861..1973 and 1973..2048 are above it.
    assert_eq!(partition.ranges()[muted.len() - 3], 1756..1861);
    assert_eq!(&muted[muted.len() - 3..], &[false, true, true]);

    // A plain partition analyzes everything.
    let plain = BarPartition::logarithmic(4096, 44_100);
    assert!(plain.ranges().iter().all(|r| !plain.is_muted(r)));
}

#[test]
fn buckets_take_their_maximum() {
    let amps = [0.1, 0.4, 0.3, 0.2];
    assert_eq!(bucket_max(&amps, 0..2), 0.4);
    assert_eq!(bucket_max(&amps, 2..4), 0.3);
    // Short vectors read as silence rather than out of bounds.
    assert_eq!(bucket_max(&[0.9], 0..2), 0.9);
    assert_eq!(bucket_max(&[0.9], 2..4), 0.0);
    assert_eq!(bucket_max(&[1.5, -1.0], 0..2), 1.0);
}

fn style() -> BarStyle {
    BarStyle::from(&BarSettings::default())
}

#[test]
fn bar_height_eases_toward_target() {
    let style = style();
    let mut bar = Bar::new(0..2, &style);
    bar.update(&[1.0, 0.2], 0.05, &style);
    // step = 0.05 * 12 = 0.6 of the way to 100
    assert!((bar.height - 60.0).abs() < 1e-3);
    assert_eq!(bar.amplitude, 1.0);
    assert_eq!(bar.color, style.peak_color);

    bar.update(&[1.0, 0.2], 10.0, &style);
    assert!((bar.height - 100.0).abs() < 1e-3);
    assert!((bar.fill_ratio(&style) - 1.0).abs() < 1e-6);
}

#[test]
fn bar_height_is_clamped_and_silence_keeps_base_color() {
    let style = BarStyle {
        min_height: 5.0,
        max_height: 50.0,
        ..style()
    };
    let mut bar = Bar::new(0..1, &style);
    bar.update(&[1.0], 10.0, &style);
    assert_eq!(bar.height, 50.0);

    bar.update(&[0.0], 10.0, &style);
    assert_eq!(bar.height, 5.0);
    assert_eq!(bar.color, style.base_color);
}

#[test]
fn bars_with_separate_styles_do_not_interfere() {
    let partition = BarPartition::linear(8, 2);
    let slow = BarStyle {
        smoothing: 1.0,
        ..style()
    };
    let mut a = Bars::new(&partition, slow);
    let mut b = Bars::new(&partition, style());
    a.update(&[1.0; 4], 0.05);
    b.update(&[1.0; 4], 0.05);
    assert!(a.bars()[0].height < b.bars()[0].height);
}

#[test]
fn repartition_keeps_heights_of_surviving_bars() {
    let style = style();
    let mut bars = Bars::new(&BarPartition::linear(8, 2), style);
    bars.update(&[1.0; 4], 10.0);
    bars.repartition(&BarPartition::linear(8, 4));
    assert_eq!(bars.len(), 4);
    assert_eq!(bars.bars()[0].height, 100.0);
    assert_eq!(bars.bars()[1].height, 100.0);
    assert_eq!(bars.bars()[2].height, 0.0);
}

#[test]
fn lerp_color_interpolates_and_clamps() {
    assert_eq!(lerp_color([0, 0, 0], [255, 255, 255], 0.5), [128, 128, 128]);
    assert_eq!(lerp_color([10, 20, 30], [40, 50, 60], 2.0), [40, 50, 60]);
    assert_eq!(lerp_color([10, 20, 30], [40, 50, 60], f32::NAN), [10, 20, 30]);
}
