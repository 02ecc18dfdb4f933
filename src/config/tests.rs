use super::load::{default_config_path, default_log_path, resolve_config_path};
use super::schema::*;
use std::sync::{Mutex, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

struct EnvGuard {
    key: &'static str,
    old: Option<std::ffi::OsString>,
}

impl EnvGuard {
    fn set(key: &'static str, val: &str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::set_var(key, val);
        }
        Self { key, old }
    }

    fn remove(key: &'static str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::remove_var(key);
        }
        Self { key, old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match self.old.take() {
            Some(v) => unsafe {
                std::env::set_var(self.key, v);
            },
            None => unsafe {
                std::env::remove_var(self.key);
            },
        }
    }
}

#[test]
fn resolve_config_path_prefers_bandstand_config_path() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("BANDSTAND_CONFIG_PATH", "/tmp/bandstand-test-config.toml");
    assert_eq!(
        resolve_config_path().unwrap(),
        std::path::PathBuf::from("/tmp/bandstand-test-config.toml")
    );
}

#[test]
fn default_config_path_prefers_xdg_config_home() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_CONFIG_HOME", "/tmp/xdg-config-home");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-should-not-win");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/xdg-config-home")
            .join("bandstand")
            .join("config.toml")
    );
}

#[test]
fn default_config_path_falls_back_to_home_dot_config() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_CONFIG_HOME");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-dir");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/home-dir")
            .join(".config")
            .join("bandstand")
            .join("config.toml")
    );
}

#[test]
fn default_log_path_uses_state_dir() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_STATE_HOME");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-dir");

    assert_eq!(
        default_log_path().unwrap(),
        std::path::PathBuf::from("/tmp/home-dir/.local/state/bandstand/bandstand.log")
    );

    let _g3 = EnvGuard::set("XDG_STATE_HOME", "/tmp/xdg-state");
    assert_eq!(
        default_log_path().unwrap(),
        std::path::PathBuf::from("/tmp/xdg-state/bandstand/bandstand.log")
    );
}

#[test]
fn settings_load_from_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[audio]
block_frames = 512
device_poll_ms = 250
loader_threads = 4

[analysis]
fft_size = 2048
smoothing_frames = 1
min_frequency = 30.0

[bars]
mode = "linear"
count = 32
smoothing = 8.0

[controls]
scrub_seconds = 9

[ui]
fps = 30
header_text = "hello"
now_playing_time_fields = ["elapsed", "remaining"]
now_playing_time_separator = " | "

[library]
extensions = ["mp3"]
recursive = false
include_hidden = true
follow_links = false

[logging]
level = "debug"
file = "/tmp/bandstand-test.log"
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("BANDSTAND_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::remove("BANDSTAND__AUDIO__BLOCK_FRAMES");

    let s = Settings::load().unwrap();
    assert_eq!(s.audio.block_frames, 512);
    assert_eq!(s.audio.device_poll_ms, 250);
    assert_eq!(s.audio.loader_threads, 4);
    assert_eq!(s.audio.restart_threshold_ms, 3000);
    assert_eq!(s.analysis.fft_size, 2048);
    assert_eq!(s.analysis.smoothing_frames, 1);
    assert_eq!(s.analysis.min_frequency, 30.0);
    assert_eq!(s.analysis.max_frequency, 20_000.0);
    assert_eq!(s.bars.mode, BarMode::Linear);
    assert_eq!(s.bars.count, 32);
    assert_eq!(s.bars.smoothing, 8.0);
    assert_eq!(s.controls.scrub_seconds, 9);
    assert_eq!(s.ui.fps, 30);
    assert_eq!(s.ui.header_text, "hello");
    assert_eq!(s.ui.now_playing_time_fields.len(), 2);
    assert!(matches!(s.ui.now_playing_time_fields[0], TimeField::Elapsed));
    assert!(matches!(s.ui.now_playing_time_fields[1], TimeField::Remaining));
    assert_eq!(s.ui.now_playing_time_separator, " | ");
    assert_eq!(s.library.extensions, vec!["mp3".to_string()]);
    assert!(!s.library.recursive);
    assert!(s.library.include_hidden);
    assert!(!s.library.follow_links);
    assert_eq!(s.logging.level, "debug");
    assert_eq!(
        s.logging.file,
        Some(std::path::PathBuf::from("/tmp/bandstand-test.log"))
    );
    assert!(s.validate().is_ok());
}

#[test]
fn settings_env_overrides_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[analysis]
fft_size = 4096
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("BANDSTAND_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::set("BANDSTAND__ANALYSIS__FFT_SIZE", "1024");

    let s = Settings::load().unwrap();
    assert_eq!(s.analysis.fft_size, 1024);
}

#[test]
fn bar_mode_accepts_log_alias() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(&cfg_path, "[bars]\nmode = \"log\"\n").unwrap();

    let _g1 = EnvGuard::set("BANDSTAND_CONFIG_PATH", cfg_path.to_str().unwrap());
    let s = Settings::load().unwrap();
    assert_eq!(s.bars.mode, BarMode::Logarithmic);
}

#[test]
fn defaults_are_valid() {
    assert!(Settings::default().validate().is_ok());
}

#[test]
fn validate_rejects_bad_values() {
    let mut s = Settings::default();
    s.analysis.fft_size = 1000;
    assert!(s.validate().unwrap_err().contains("fft_size"));

    let mut s = Settings::default();
    s.analysis.fft_size = 32;
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.analysis.smoothing_frames = 0;
    assert!(s.validate().unwrap_err().contains("smoothing_frames"));

    let mut s = Settings::default();
    s.analysis.min_frequency = 20_000.0;
    s.analysis.max_frequency = 20.0;
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.audio.loader_threads = 0;
    assert!(s.validate().unwrap_err().contains("loader_threads"));

    let mut s = Settings::default();
    s.audio.block_frames = 0;
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.bars.min_height = 10.0;
    s.bars.max_height = 5.0;
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.ui.fps = 0;
    assert!(s.validate().is_err());
}

#[test]
fn default_settings_render_as_toml() {
    let text = Settings::default().to_toml().unwrap();
    assert!(text.contains("[analysis]"));
    assert!(text.contains("fft_size = 4096"));
    assert!(text.contains("mode = \"logarithmic\""));
}
