use crate::audio::{AudioFeatures, SignalConditioningPipeline, SpectrumAnalyzer};
use crate::preset::PresetScheduler;
use crate::render::{Canvas, PluginHost, VisualizerPlugin};
use crate::settings::SettingsWatcher;
use std::path::PathBuf;

/// Outcome of one engine tick.
#[derive(Debug)]
pub struct TickResult {
    /// The feature snapshot this frame rendered with.
    pub features: AudioFeatures,
    /// True when the scheduler wants the caller to switch presets.
    pub advance_preset: bool,
}

/// Per-frame orchestration: live-reloaded settings, FFT, conditioning,
/// scheduling, and the hosted plugin, driven by an external timer at its
/// own cadence. Single-threaded; one engine per visualizer surface.
pub struct VisualizerEngine {
    settings: SettingsWatcher,
    analyzer: SpectrumAnalyzer,
    pipeline: SignalConditioningPipeline,
    scheduler: PresetScheduler,
    host: PluginHost,
    time_seconds: f64,
    width: u32,
    height: u32,
}

impl VisualizerEngine {
    pub fn new(
        settings_path: impl Into<PathBuf>,
        plugin: Box<dyn VisualizerPlugin>,
        width: u32,
        height: u32,
    ) -> Self {
        let settings = SettingsWatcher::new(settings_path);
        let analyzer = SpectrumAnalyzer::new(settings.current().fft_size);
        let mut host = PluginHost::new(plugin);
        host.initialize(width, height);
        log::info!(
            "engine up: plugin '{}', {}x{}, fft {}",
            host.plugin_name(),
            width,
            height,
            analyzer.fft_size()
        );
        Self {
            settings,
            analyzer,
            pipeline: SignalConditioningPipeline::new(),
            scheduler: PresetScheduler::new(),
            host,
            time_seconds: 0.0,
            width,
            height,
        }
    }

    pub fn host(&self) -> &PluginHost {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut PluginHost {
        &mut self.host
    }

    pub fn time_seconds(&self) -> f64 {
        self.time_seconds
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.host.resize(width, height);
    }

    /// Swaps the hosted plugin; the old one is disposed.
    pub fn set_plugin(&mut self, plugin: Box<dyn VisualizerPlugin>) {
        self.host.dispose();
        self.host = PluginHost::new(plugin);
        self.host.initialize(self.width, self.height);
        self.pipeline.reset();
        self.scheduler.reset();
    }

    /// Runs one frame: condition `samples`, render, and report whether the
    /// scheduler wants a preset change.
    pub fn tick(&mut self, samples: &[f32], dt: f32, canvas: &mut dyn Canvas) -> TickResult {
        let settings = self.settings.refresh().clone();
        self.analyzer.set_fft_size(settings.fft_size);

        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 1.0 / 60.0 };
        self.time_seconds += dt as f64;

        let spectrum = self.analyzer.magnitudes(samples);
        let features = self.pipeline.process(
            &spectrum,
            samples,
            self.time_seconds,
            dt,
            &settings,
        );

        let advance_preset = self.scheduler.update(&features, &settings, dt);
        self.host.render_frame(&features, canvas);

        TickResult {
            features,
            advance_preset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{DrawCall, RecordingCanvas, SpectrumBarsPlugin};
    use crate::settings::{save_settings, RandomPresetMode, VisualizerSettings};

    fn sine(len: usize, cycles: f32) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * cycles * i as f32 / len as f32).sin())
            .collect()
    }

    #[test]
    fn tick_renders_and_reports_features() {
        let path = std::env::temp_dir().join("sonoscope_engine_basic.json");
        save_settings(&path, &VisualizerSettings::default()).unwrap();

        let mut engine = VisualizerEngine::new(
            &path,
            Box::new(SpectrumBarsPlugin::new()),
            640,
            360,
        );
        let mut canvas = RecordingCanvas::new(640.0, 360.0);
        let result = engine.tick(&sine(2048, 64.0), 1.0 / 60.0, &mut canvas);
        std::fs::remove_file(&path).ok();

        assert!(result.features.peak > 0.0);
        assert!(result.features.rms > 0.0);
        assert_eq!(result.features.spectrum.len(), 1024);
        assert!(!result.advance_preset);
        assert!(matches!(canvas.calls[0], DrawCall::Clear(_)));
        assert!(canvas.calls.len() > 1);
        assert_eq!(engine.host().frames_rendered(), 1);
    }

    #[test]
    fn missing_settings_file_still_ticks() {
        let mut engine = VisualizerEngine::new(
            "/nonexistent/sonoscope.json",
            Box::new(SpectrumBarsPlugin::new()),
            100,
            100,
        );
        let mut canvas = RecordingCanvas::new(100.0, 100.0);
        let result = engine.tick(&[], 1.0 / 60.0, &mut canvas);
        assert_eq!(result.features.volume, 0.0);
    }

    #[test]
    fn on_beat_mode_requests_preset_advance() {
        let path = std::env::temp_dir().join("sonoscope_engine_onbeat.json");
        let mut settings = VisualizerSettings::default();
        settings.random_preset_mode = RandomPresetMode::OnBeat;
        settings.beat_cooldown_ms = 0.0;
        save_settings(&path, &settings).unwrap();

        let mut engine = VisualizerEngine::new(
            &path,
            Box::new(SpectrumBarsPlugin::new()),
            100,
            100,
        );
        let mut canvas = RecordingCanvas::new(100.0, 100.0);

        // Silence, then a loud transient: the jump should fire a beat and
        // the scheduler should request an advance on the same frame.
        engine.tick(&vec![0.0; 2048], 1.0 / 60.0, &mut canvas);
        let result = engine.tick(&sine(2048, 8.0), 1.0 / 60.0, &mut canvas);
        std::fs::remove_file(&path).ok();

        assert!(result.features.beat);
        assert!(result.advance_preset);
    }

    #[test]
    fn set_plugin_disposes_and_reinitializes() {
        let mut engine = VisualizerEngine::new(
            "/nonexistent/sonoscope.json",
            Box::new(SpectrumBarsPlugin::new()),
            100,
            100,
        );
        let mut canvas = RecordingCanvas::new(100.0, 100.0);
        engine.tick(&[], 1.0 / 60.0, &mut canvas);

        engine.set_plugin(Box::new(SpectrumBarsPlugin::new()));
        assert_eq!(engine.host().frames_rendered(), 0);
        engine.tick(&[], 1.0 / 60.0, &mut canvas);
        assert_eq!(engine.host().frames_rendered(), 1);
    }
}
