//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`.

use ratatui::{
    Frame,
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Stylize},
    widgets::{Block, Borders, Padding, Paragraph, Widget, Wrap},
};
use std::{collections::BTreeMap, sync::LazyLock, time::Duration};

use crate::analysis::Bars;
use crate::app::{App, Status};
use crate::audio::TrackState;
use crate::config::{BarMode, ControlsSettings, TimeField, UiSettings};
use crate::library::display_name;

static CONTROLS_MAP: LazyLock<BTreeMap<String, String>> = LazyLock::new(|| {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    map.insert("space/p".to_string(), "play/pause".to_string());
    map.insert("h/l".to_string(), "prev/next".to_string());
    // H/L is filled dynamically from config.
    map.insert("m".to_string(), "bar mode".to_string());
    map.insert("paste".to_string(), "queue path".to_string());
    map.insert("q".to_string(), "quit".to_string());
    map
});

/// Marker drawn for bars that never carry signal.
const MUTED_BAR: &str = "▁";
const MUTED_COLOR: Color = Color::DarkGray;

/// Partial block glyphs, indexed by eighths of a cell.
const BLOCKS: [&str; 9] = [" ", "▁", "▂", "▃", "▄", "▅", "▆", "▇", "█"];

/// Render the controls help text, incorporating scrub seconds.
fn controls_text(scrub_seconds: u64) -> String {
    let order = ["space/p", "h/l", "H/L", "m", "paste", "q"];
    order
        .iter()
        .filter_map(|k| {
            if *k == "H/L" {
                Some(format!("[H/L] scrub -/+{}s", scrub_seconds))
            } else {
                CONTROLS_MAP.get(*k).map(|v| format!("[{}] {}", k, v))
            }
        })
        .collect::<Vec<String>>()
        .join(" | ")
}

/// Format a `Duration` as `MM:SS`.
fn format_mmss(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Build the now-playing time text (elapsed/total/remaining) per `UiSettings`.
fn now_playing_time_text(elapsed: Duration, total: Duration, ui: &UiSettings) -> Option<String> {
    let parts: Vec<String> = ui
        .now_playing_time_fields
        .iter()
        .map(|f| match f {
            TimeField::Elapsed => format_mmss(elapsed),
            TimeField::Total => format_mmss(total),
            TimeField::Remaining => format!("-{}", format_mmss(total.saturating_sub(elapsed))),
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(&ui.now_playing_time_separator))
    }
}

fn state_label(status: &Status) -> &'static str {
    match status.state {
        Some(TrackState::Idle) => "Ready",
        Some(TrackState::Playing) => "Playing",
        Some(TrackState::Paused) => "Paused",
        Some(TrackState::Finished) => "Finished",
        None if status.loading > 0 => "Loading",
        None => "Stopped",
    }
}

fn status_text(app: &App, ui: &UiSettings) -> String {
    let status = app.status();
    let mut parts: Vec<String> = vec![state_label(status).to_string()];

    if let Some(path) = &status.path {
        let song = display_name(path);
        match now_playing_time_text(status.position, status.duration, ui) {
            Some(time) => parts.push(format!("{} [{}]", song, time)),
            None => parts.push(song),
        }
    }

    if status.pending > 0 {
        parts.push(format!("Queued: {}", status.pending));
    }
    if status.loading > 0 {
        parts.push(format!("Loading: {}", status.loading));
    }

    parts.push(
        match status.bar_mode {
            BarMode::Logarithmic => "Bars: log",
            BarMode::Linear => "Bars: linear",
        }
        .to_string(),
    );

    if let Some(notice) = app.notice() {
        parts.push(notice.to_string());
    }

    parts.join(" • ")
}

fn chunks(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(area)
}

fn visualizer_block() -> Block<'static> {
    Block::default().borders(Borders::ALL).title(" spectrum ")
}

/// Columns available to the bars in a terminal of size `area`.
pub fn visualizer_width(area: Rect) -> u16 {
    visualizer_block().inner(chunks(area)[2]).width
}

/// Columns of bars, bottom-aligned, with eighth-cell vertical resolution.
struct BarsView<'a> {
    bars: &'a Bars,
}

impl Widget for BarsView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let n = self.bars.len();
        let width = area.width as usize;
        if self.bars.is_empty() || width == 0 || area.height == 0 {
            return;
        }
        let style = self.bars.style();
        // Leave a gap between bars once they are wide enough to spare it.
        let gaps = width / n >= 3;

        for col in 0..width {
            let idx = col * n / width;
            if gaps && (col + 1) * n / width != idx {
                continue;
            }
            let bar = &self.bars.bars()[idx];
            if bar.muted {
                buf[(area.x + col as u16, area.bottom() - 1)]
                    .set_symbol(MUTED_BAR)
                    .set_fg(MUTED_COLOR);
                continue;
            }
            let eighths = (bar.fill_ratio(style) * area.height as f32 * 8.0).round() as u32;
            let color = Color::Rgb(bar.color[0], bar.color[1], bar.color[2]);

            for row in 0..area.height {
                let level = eighths.saturating_sub(row as u32 * 8).min(8);
                if level == 0 {
                    break;
                }
                let x = area.x + col as u16;
                let y = area.bottom() - 1 - row;
                buf[(x, y)]
                    .set_symbol(BLOCKS[level as usize])
                    .set_fg(color);
            }
        }
    }
}

/// Render the entire UI into the provided `frame` using `app` state and settings.
pub fn draw(
    frame: &mut Frame,
    app: &App,
    ui_settings: &UiSettings,
    controls_settings: &ControlsSettings,
) {
    let chunks = chunks(frame.area());

    // Header
    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" bandstand ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    let status_par = Paragraph::new(status_text(app, ui_settings))
        .bold()
        .block(
            Block::bordered()
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                })
                .title(" status "),
        );
    frame.render_widget(status_par, chunks[1]);

    let block = visualizer_block();
    let inner = block.inner(chunks[2]);
    frame.render_widget(block, chunks[2]);
    frame.render_widget(BarsView { bars: app.bars() }, inner);

    let footer = Paragraph::new(controls_text(controls_settings.scrub_seconds))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                }),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[3]);
}
