use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Converts a decibel value to a linear multiplier.
pub fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// How spectrum bins are rescaled for display and feature extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpectrumScale {
    Linear,
    Log,
    Sqrt,
}

/// When the scheduler should auto-advance to a new preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RandomPresetMode {
    Off,
    OnBeat,
    Interval,
    Stanza,
}

/// Process-wide visualizer settings, persisted as a flat JSON document.
///
/// All dB fields map to linear multipliers via `10^(db/20)`. Out-of-range
/// values are clamped on load rather than rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizerSettings {
    #[serde(default = "default_gain_db")]
    pub gain_db: f32,
    #[serde(default)]
    pub agc_enabled: bool,
    #[serde(default = "default_agc_target_rms")]
    pub agc_target_rms: f32,
    #[serde(default = "default_smoothing_ms")]
    pub smoothing_ms: f32,
    #[serde(default = "default_frame_blend")]
    pub frame_blend: f32,
    #[serde(default = "default_noise_gate_db")]
    pub noise_gate_db: f32,
    #[serde(default = "default_floor_db")]
    pub floor_db: f32,
    #[serde(default = "default_ceiling_db")]
    pub ceiling_db: f32,
    #[serde(default = "default_spectrum_scale")]
    pub spectrum_scale: SpectrumScale,
    #[serde(default = "default_peak_falloff")]
    pub peak_falloff: f32,
    #[serde(default = "default_beat_sensitivity")]
    pub beat_sensitivity: f32,
    #[serde(default = "default_beat_cooldown_ms")]
    pub beat_cooldown_ms: f32,
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_random_preset_mode")]
    pub random_preset_mode: RandomPresetMode,
    #[serde(default = "default_preset_interval_seconds")]
    pub preset_interval_seconds: f32,
    #[serde(default = "default_stanza_beats")]
    pub stanza_beats: u32,
    /// Pre-enum flag from older settings files. Remapped to
    /// `random_preset_mode = OnBeat` on load; never written back.
    #[serde(
        default,
        rename = "random_preset_on_beat",
        skip_serializing
    )]
    pub legacy_random_preset_on_beat: Option<bool>,
}

fn default_gain_db() -> f32 { 0.0 }
fn default_agc_target_rms() -> f32 { 0.25 }
fn default_smoothing_ms() -> f32 { 120.0 }
fn default_frame_blend() -> f32 { 0.35 }
fn default_noise_gate_db() -> f32 { -72.0 }
fn default_floor_db() -> f32 { -96.0 }
fn default_ceiling_db() -> f32 { 12.0 }
fn default_spectrum_scale() -> SpectrumScale { SpectrumScale::Linear }
fn default_peak_falloff() -> f32 { 0.92 }
fn default_beat_sensitivity() -> f32 { 1.3 }
fn default_beat_cooldown_ms() -> f32 { 250.0 }
fn default_fft_size() -> usize { 2048 }
fn default_random_preset_mode() -> RandomPresetMode { RandomPresetMode::Off }
fn default_preset_interval_seconds() -> f32 { 30.0 }
fn default_stanza_beats() -> u32 { 16 }

impl Default for VisualizerSettings {
    fn default() -> Self {
        Self {
            gain_db: default_gain_db(),
            agc_enabled: false,
            agc_target_rms: default_agc_target_rms(),
            smoothing_ms: default_smoothing_ms(),
            frame_blend: default_frame_blend(),
            noise_gate_db: default_noise_gate_db(),
            floor_db: default_floor_db(),
            ceiling_db: default_ceiling_db(),
            spectrum_scale: default_spectrum_scale(),
            peak_falloff: default_peak_falloff(),
            beat_sensitivity: default_beat_sensitivity(),
            beat_cooldown_ms: default_beat_cooldown_ms(),
            fft_size: default_fft_size(),
            random_preset_mode: default_random_preset_mode(),
            preset_interval_seconds: default_preset_interval_seconds(),
            stanza_beats: default_stanza_beats(),
            legacy_random_preset_on_beat: None,
        }
    }
}

impl VisualizerSettings {
    /// Applies the legacy-flag remap and clamps every field into its
    /// documented range. Idempotent, so reloading each frame is safe.
    pub fn normalize(&mut self) {
        if self.legacy_random_preset_on_beat.take() == Some(true) {
            self.random_preset_mode = RandomPresetMode::OnBeat;
        }

        self.gain_db = self.gain_db.clamp(-60.0, 60.0);
        self.agc_target_rms = self.agc_target_rms.clamp(0.0, 1.0);
        self.smoothing_ms = self.smoothing_ms.clamp(0.0, 5000.0);
        self.frame_blend = self.frame_blend.clamp(0.0, 1.0);
        self.noise_gate_db = self.noise_gate_db.clamp(-120.0, 0.0);
        self.floor_db = self.floor_db.clamp(-120.0, 24.0);
        self.ceiling_db = self.ceiling_db.clamp(self.floor_db, 24.0);
        self.peak_falloff = self.peak_falloff.clamp(0.0, 1.0);
        self.beat_sensitivity = self.beat_sensitivity.clamp(0.0, 10.0);
        self.beat_cooldown_ms = self.beat_cooldown_ms.clamp(0.0, 10_000.0);
        self.fft_size = clamp_fft_size(self.fft_size);
        self.preset_interval_seconds = self.preset_interval_seconds.clamp(1.0, 3600.0);
        self.stanza_beats = self.stanza_beats.max(1);
    }

    /// Loads settings from `path`, falling back to defaults when the file is
    /// missing or malformed. Never raises to the render loop.
    pub fn load_or_default(path: &Path) -> Self {
        let mut settings = load_settings(path).unwrap_or_default();
        settings.normalize();
        settings
    }
}

fn clamp_fft_size(size: usize) -> usize {
    let clamped = size.clamp(256, 8192);
    clamped.next_power_of_two().min(8192)
}

/// Reads a settings document, returning `None` on any failure.
pub fn load_settings(path: &Path) -> Option<VisualizerSettings> {
    let content = std::fs::read_to_string(path).ok()?;
    let mut settings: VisualizerSettings = serde_json::from_str(&content).ok()?;
    settings.normalize();
    Some(settings)
}

/// Writes a settings document as pretty-printed JSON.
pub fn save_settings(path: &Path, settings: &VisualizerSettings) -> anyhow::Result<()> {
    use anyhow::Context;
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write settings: {}", path.display()))?;
    Ok(())
}

/// Live-reload cache around a settings file. Re-reads only when the backing
/// file's modification time changes, so per-frame refresh stays cheap.
#[derive(Debug)]
pub struct SettingsWatcher {
    path: PathBuf,
    last_modified: Option<SystemTime>,
    cached: VisualizerSettings,
}

impl SettingsWatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cached = VisualizerSettings::load_or_default(&path);
        let last_modified = modified_time(&path);
        Self {
            path,
            last_modified,
            cached,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns current settings, re-reading the file only when it changed.
    pub fn refresh(&mut self) -> &VisualizerSettings {
        let modified = modified_time(&self.path);
        if modified != self.last_modified {
            log::debug!("Settings changed on disk: {}", self.path.display());
            self.cached = VisualizerSettings::load_or_default(&self.path);
            self.last_modified = modified;
        }
        &self.cached
    }

    pub fn current(&self) -> &VisualizerSettings {
        &self.cached
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).ok().and_then(|m| m.modified().ok())
}
