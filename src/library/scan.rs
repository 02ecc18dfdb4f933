use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::LibrarySettings;

fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Audio files under `dir`, sorted case-insensitively by path.
fn scan_dir(dir: &Path, settings: &LibrarySettings) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && is_audio_file(p, settings))
        .collect();

    files.sort_by_key(|p| p.to_string_lossy().to_lowercase());
    files
}

/// Expand user-supplied paths into the files to queue, in order.
///
/// Directories are replaced by the audio files inside them. Anything else is
/// passed through untouched so that a bad path still surfaces as a skipped
/// load instead of vanishing silently.
pub fn expand(paths: &[PathBuf], settings: &LibrarySettings) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for path in paths {
        if path.is_dir() {
            let found = scan_dir(path, settings);
            if found.is_empty() {
                log::warn!("no audio files under {}", path.display());
            }
            out.extend(found);
        } else {
            out.push(path.clone());
        }
    }
    out
}

/// Paths in text pasted into the terminal.
///
/// File managers paste dropped files one per line, sometimes quoted, as
/// `file://` URIs, or with shell-escaped spaces.
pub fn parse_pasted(text: &str) -> Vec<PathBuf> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|line| {
            let line = strip_quotes(line);
            let line = line.strip_prefix("file://").unwrap_or(line);
            PathBuf::from(unescape(line))
        })
        .collect()
}

fn strip_quotes(s: &str) -> &str {
    for q in ['\'', '"'] {
        if let Some(inner) = s.strip_prefix(q).and_then(|s| s.strip_suffix(q)) {
            return inner;
        }
    }
    s
}

/// Undo shell backslash escapes and `%XX` escapes.
///
/// Percent escapes are decoded as bytes, so multi-byte UTF-8 names survive.
/// Text that does not decode to valid UTF-8 is kept as pasted.
fn unescape(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                if let Some(&next) = bytes.get(i + 1) {
                    out.push(next);
                }
                i += 2;
            }
            b'%' => match hex_byte(&bytes[i + 1..]) {
                Some(b) => {
                    out.push(b);
                    i += 3;
                }
                None => {
                    out.push(b'%');
                    i += 1;
                }
            },
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).unwrap_or_else(|_| s.to_string())
}

fn hex_byte(digits: &[u8]) -> Option<u8> {
    let pair = digits.get(..2)?;
    if !pair.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    let hex = std::str::from_utf8(pair).ok()?;
    u8::from_str_radix(hex, 16).ok()
}
