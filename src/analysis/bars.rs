//! Per-bar animation state driven by the amplitude vector.

use std::ops::Range;

use crate::config::BarSettings;

use super::buckets::{BarPartition, bucket_max};

/// Smoothing and color parameters shared by every bar of one display.
#[derive(Debug, Clone, PartialEq)]
pub struct BarStyle {
    pub scale: f32,
    pub smoothing: f32,
    pub min_height: f32,
    pub max_height: f32,
    pub base_color: [u8; 3],
    pub peak_color: [u8; 3],
    pub color_curve: f32,
}

impl From<&BarSettings> for BarStyle {
    fn from(s: &BarSettings) -> Self {
        Self {
            scale: s.scale,
            smoothing: s.smoothing,
            min_height: s.min_height,
            max_height: s.max_height,
            base_color: s.base_color,
            peak_color: s.peak_color,
            color_curve: s.color_curve,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Bar {
    range: Range<usize>,
    /// Outside the analyzed band; drawn dimmed.
    pub muted: bool,
    pub amplitude: f32,
    pub height: f32,
    pub color: [u8; 3],
}

impl Bar {
    pub fn new(range: Range<usize>, style: &BarStyle) -> Self {
        Self {
            range,
            muted: false,
            amplitude: 0.0,
            height: style.min_height,
            color: style.base_color,
        }
    }

    /// Advance by `dt` seconds toward the loudest bin in this bar's range.
    pub fn update(&mut self, amplitudes: &[f32], dt: f32, style: &BarStyle) {
        self.amplitude = bucket_max(amplitudes, self.range.clone());

        let t = 1.0 - (1.0 - self.amplitude).powf(style.color_curve);
        self.color = lerp_color(style.base_color, style.peak_color, t);

        let target = self.amplitude * style.scale;
        let step = (dt * style.smoothing).clamp(0.0, 1.0);
        self.height = (self.height + (target - self.height) * step)
            .clamp(style.min_height, style.max_height);
    }

    /// Height as a fraction of `max_height`.
    pub fn fill_ratio(&self, style: &BarStyle) -> f32 {
        if style.max_height <= 0.0 {
            return 0.0;
        }
        (self.height / style.max_height).clamp(0.0, 1.0)
    }
}

/// All bars of one display, rebuilt whenever the partition changes.
pub struct Bars {
    style: BarStyle,
    bars: Vec<Bar>,
}

impl Bars {
    pub fn new(partition: &BarPartition, style: BarStyle) -> Self {
        let bars = layout(partition, &style);
        Self { style, bars }
    }

    /// Swap in a new partition, carrying heights over where bar positions survive.
    pub fn repartition(&mut self, partition: &BarPartition) {
        let mut bars = layout(partition, &self.style);
        for (new, old) in bars.iter_mut().zip(&self.bars) {
            new.height = old.height;
            new.color = old.color;
        }
        self.bars = bars;
    }

    pub fn update(&mut self, amplitudes: &[f32], dt: f32) {
        for bar in &mut self.bars {
            bar.update(amplitudes, dt, &self.style);
        }
    }

    pub fn style(&self) -> &BarStyle {
        &self.style
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

fn layout(partition: &BarPartition, style: &BarStyle) -> Vec<Bar> {
    partition
        .ranges()
        .iter()
        .map(|r| Bar {
            muted: partition.is_muted(r),
            ..Bar::new(r.clone(), style)
        })
        .collect()
}

/// Linear interpolation between two RGB colors, `t` clamped to `[0, 1]`.
pub fn lerp_color(from: [u8; 3], to: [u8; 3], t: f32) -> [u8; 3] {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    std::array::from_fn(|i| {
        let a = from[i] as f32;
        let b = to[i] as f32;
        (a + (b - a) * t).round().clamp(0.0, 255.0) as u8
    })
}
