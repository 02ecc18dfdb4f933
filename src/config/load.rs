use std::{env, path::PathBuf};

use super::schema::Settings;

/// Configuration loading helpers.
///
/// `Settings::load` layers environment variables (prefix `BANDSTAND__`) over an
/// optional config file and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("BANDSTAND")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        let fft_size = self.analysis.fft_size;
        if !fft_size.is_power_of_two() || fft_size < 64 {
            return Err(format!(
                "analysis.fft_size must be a power of two >= 64, got {fft_size}"
            ));
        }
        if self.analysis.smoothing_frames == 0 {
            return Err("analysis.smoothing_frames must be >= 1".to_string());
        }
        if self.analysis.min_frequency >= self.analysis.max_frequency {
            return Err("analysis.min_frequency must be below analysis.max_frequency".to_string());
        }
        if self.audio.block_frames == 0 {
            return Err("audio.block_frames must be >= 1".to_string());
        }
        if self.audio.loader_threads == 0 {
            return Err("audio.loader_threads must be >= 1".to_string());
        }
        if self.bars.max_height < self.bars.min_height {
            return Err("bars.max_height must be >= bars.min_height".to_string());
        }
        if self.ui.fps == 0 {
            return Err("ui.fps must be >= 1".to_string());
        }
        Ok(())
    }

    /// Render the settings as TOML, suitable as a starting `config.toml`.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Resolve the config path from `BANDSTAND_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("BANDSTAND_CONFIG_PATH") {
        let p = PathBuf::from(p);
        return Some(p);
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/bandstand/config.toml`
/// or `~/.config/bandstand/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    };

    config_home.map(|d| d.join("bandstand").join("config.toml"))
}

/// Default log file under `$XDG_STATE_HOME/bandstand/bandstand.log` or
/// `~/.local/state/bandstand/bandstand.log`.
pub fn default_log_path() -> Option<PathBuf> {
    let state_home = if let Some(xdg) = env::var_os("XDG_STATE_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".local").join("state"))
    };

    state_home.map(|d| d.join("bandstand").join("bandstand.log"))
}
