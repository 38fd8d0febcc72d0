use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analyser: AnalyserConfig,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub tempo: TempoConfig,
    #[serde(default)]
    pub clipping: ClippingConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Analysis node settings, with the browser analyser's defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalyserConfig {
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_min_decibels")]
    pub min_decibels: f32,
    #[serde(default = "default_max_decibels")]
    pub max_decibels: f32,
    #[serde(default = "default_smoothing_time_constant")]
    pub smoothing_time_constant: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeatureConfig {
    /// One-pole coefficient for low/mid/high/energy.
    #[serde(default = "default_band_smoothing")]
    pub band_smoothing: f32,
    #[serde(default = "default_spectrum_bands")]
    pub spectrum_bands: usize,
    #[serde(default = "default_waveform_len")]
    pub waveform_len: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TempoConfig {
    #[serde(default = "default_initial_threshold")]
    pub initial_threshold: f32,
    /// Weight of the current energy in the trailing threshold average.
    #[serde(default = "default_threshold_adaptation")]
    pub threshold_adaptation: f32,
    #[serde(default = "default_tempo_smoothing")]
    pub tempo_smoothing: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClippingConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_consecutive_polls")]
    pub consecutive_polls: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AudioConfig {
    /// When false the host behaves as if it had no analysis capability.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Start the audio context running instead of waiting for a play gesture.
    #[serde(default)]
    pub autoplay: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: default_fft_size(),
            min_decibels: default_min_decibels(),
            max_decibels: default_max_decibels(),
            smoothing_time_constant: default_smoothing_time_constant(),
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            band_smoothing: default_band_smoothing(),
            spectrum_bands: default_spectrum_bands(),
            waveform_len: default_waveform_len(),
        }
    }
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            initial_threshold: default_initial_threshold(),
            threshold_adaptation: default_threshold_adaptation(),
            tempo_smoothing: default_tempo_smoothing(),
        }
    }
}

impl Default for ClippingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            consecutive_polls: default_consecutive_polls(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            autoplay: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { fps: default_fps() }
    }
}

fn default_fft_size() -> usize { 2048 }
fn default_min_decibels() -> f32 { -90.0 }
fn default_max_decibels() -> f32 { -10.0 }
fn default_smoothing_time_constant() -> f32 { 0.8 }
fn default_band_smoothing() -> f32 { 0.35 }
fn default_spectrum_bands() -> usize { 96 }
fn default_waveform_len() -> usize { 256 }
fn default_initial_threshold() -> f32 { 0.12 }
fn default_threshold_adaptation() -> f32 { 0.005 }
fn default_tempo_smoothing() -> f32 { 0.18 }
fn default_consecutive_polls() -> u32 { 3 }
fn default_fps() -> u32 { 60 }
fn default_true() -> bool { true }

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// `./wao.toml`, then `~/.config/wao/config.toml`, then the platform config dir.
pub fn discover_config() -> Option<PathBuf> {
    let local = PathBuf::from("wao.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("wao").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("wao").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
