use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::spectrum::SpectrumSettings;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub spectrum: SpectrumSettings,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Points dropped from the low end of every frame.
    #[serde(default = "default_low_cut")]
    pub low_cut: usize,
    /// Points dropped from the high end of every frame.
    #[serde(default = "default_high_cut")]
    pub high_cut: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            fft_size: default_fft_size(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            low_cut: default_low_cut(),
            high_cut: default_high_cut(),
        }
    }
}

pub fn default_fft_size() -> usize { 4096 }
pub fn default_fps() -> u32 { 60 }
pub fn default_low_cut() -> usize { 15 }
pub fn default_high_cut() -> usize { 3 }

/// Explicit path, else `specviz.toml` in the working directory, else the
/// per-user config file.
pub fn find_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("specviz.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("specviz").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("specviz").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Option<Config> {
    match toml::from_str(content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::warn!("Invalid config: {}", err);
            None
        }
    }
}
