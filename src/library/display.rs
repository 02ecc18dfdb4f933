use std::path::Path;

/// Short human-readable name for a queued file: its stem, or the whole path
/// when it has none.
pub fn display_name(path: &Path) -> String {
    match path.file_stem().and_then(|s| s.to_str()) {
        Some(stem) if !stem.trim().is_empty() => stem.to_string(),
        _ => path.display().to_string(),
    }
}
