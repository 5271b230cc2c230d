use super::canvas::{Canvas, Color};
use crate::audio::AudioFeatures;
use crate::params::ParamValue;
use std::collections::HashMap;

/// Contract every visualizer implements.
///
/// Lifecycle: `initialize` exactly once before the first render, `resize`
/// any number of times afterwards (size-dependent geometry must be rebuilt
/// before it returns), `render_frame` at the driver's cadence, `dispose`
/// idempotently at the end. `render_frame` must not touch external state
/// beyond canvas calls and its own fields, and should pre-size allocations
/// in `initialize`/`resize` rather than allocating per frame.
pub trait VisualizerPlugin {
    fn name(&self) -> &str;
    fn initialize(&mut self, width: u32, height: u32);
    fn resize(&mut self, width: u32, height: u32);
    fn render_frame(&mut self, features: &AudioFeatures, canvas: &mut dyn Canvas);
    fn dispose(&mut self);

    /// Optional typed configuration; unknown names are ignored.
    fn set_parameter(&mut self, _name: &str, _value: &ParamValue) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    Uninitialized,
    Initialized,
    Disposed,
}

/// Wraps a plugin and enforces the lifecycle state machine. Out-of-order
/// calls are logged and dropped instead of reaching the plugin.
pub struct PluginHost {
    plugin: Box<dyn VisualizerPlugin>,
    state: PluginState,
    frames_rendered: u64,
}

impl PluginHost {
    pub fn new(plugin: Box<dyn VisualizerPlugin>) -> Self {
        Self {
            plugin,
            state: PluginState::Uninitialized,
            frames_rendered: 0,
        }
    }

    pub fn state(&self) -> PluginState {
        self.state
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn plugin_name(&self) -> &str {
        self.plugin.name()
    }

    pub fn set_parameter(&mut self, name: &str, value: &ParamValue) {
        self.plugin.set_parameter(name, value);
    }

    pub fn initialize(&mut self, width: u32, height: u32) {
        match self.state {
            PluginState::Uninitialized => {
                self.plugin.initialize(width, height);
                self.state = PluginState::Initialized;
            }
            _ => log::warn!(
                "initialize() ignored for '{}' in state {:?}",
                self.plugin.name(),
                self.state
            ),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        match self.state {
            PluginState::Initialized => self.plugin.resize(width, height),
            _ => log::warn!(
                "resize() ignored for '{}' in state {:?}",
                self.plugin.name(),
                self.state
            ),
        }
    }

    pub fn render_frame(&mut self, features: &AudioFeatures, canvas: &mut dyn Canvas) {
        match self.state {
            PluginState::Initialized => {
                self.plugin.render_frame(features, canvas);
                self.frames_rendered += 1;
            }
            _ => log::warn!(
                "render_frame() ignored for '{}' in state {:?}",
                self.plugin.name(),
                self.state
            ),
        }
    }

    pub fn dispose(&mut self) {
        if self.state != PluginState::Disposed {
            self.plugin.dispose();
            self.state = PluginState::Disposed;
        }
    }
}

impl Drop for PluginHost {
    fn drop(&mut self) {
        self.dispose();
    }
}

pub type PluginFactory = Box<dyn Fn() -> Box<dyn VisualizerPlugin>>;

/// Explicit plugin discovery: string key to factory, populated at startup.
pub struct PluginRegistry {
    factories: HashMap<String, PluginFactory>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry pre-populated with the built-in plugins.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("bars", || {
            Box::new(SpectrumBarsPlugin::new()) as Box<dyn VisualizerPlugin>
        });
        registry.register("superscope", || {
            Box::new(super::superscope::SuperscopePlugin::new(
                crate::preset::Preset::default_scope(),
            )) as Box<dyn VisualizerPlugin>
        });
        registry
    }

    pub fn register<F>(&mut self, key: &str, factory: F)
    where
        F: Fn() -> Box<dyn VisualizerPlugin> + 'static,
    {
        self.factories.insert(key.to_string(), Box::new(factory));
    }

    pub fn create(&self, key: &str) -> Option<Box<dyn VisualizerPlugin>> {
        self.factories.get(key).map(|f| f())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.factories.contains_key(key)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Native spectrum bar renderer. Bar geometry is derived at
/// initialize/resize time so the render path allocates nothing.
pub struct SpectrumBarsPlugin {
    width: f32,
    height: f32,
    bar_count: usize,
    bar_width: f32,
    color: Color,
}

impl Default for SpectrumBarsPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectrumBarsPlugin {
    pub fn new() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            bar_count: 64,
            bar_width: 0.0,
            color: Color::from_unit_rgb(0.2, 0.9, 0.5),
        }
    }

    fn rebuild_geometry(&mut self) {
        self.bar_width = if self.bar_count > 0 {
            self.width / self.bar_count as f32
        } else {
            0.0
        };
    }
}

impl VisualizerPlugin for SpectrumBarsPlugin {
    fn name(&self) -> &str {
        "bars"
    }

    fn initialize(&mut self, width: u32, height: u32) {
        self.width = width as f32;
        self.height = height as f32;
        self.rebuild_geometry();
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width as f32;
        self.height = height as f32;
        self.rebuild_geometry();
    }

    fn render_frame(&mut self, features: &AudioFeatures, canvas: &mut dyn Canvas) {
        canvas.clear(Color::BLACK);
        if features.spectrum.is_empty() || self.bar_count == 0 {
            return;
        }

        let bins_per_bar = (features.spectrum.len() / self.bar_count).max(1);
        for bar in 0..self.bar_count {
            let start = bar * bins_per_bar;
            if start >= features.spectrum.len() {
                break;
            }
            let end = (start + bins_per_bar).min(features.spectrum.len());
            let level = features.spectrum[start..end]
                .iter()
                .fold(0.0f32, |acc, b| acc.max(b.abs()));
            let bar_height = (level.min(1.0)) * self.height;
            canvas.fill_rect(
                bar as f32 * self.bar_width,
                self.height - bar_height,
                self.bar_width.max(1.0),
                bar_height,
                self.color,
            );
        }
    }

    fn dispose(&mut self) {}

    fn set_parameter(&mut self, name: &str, value: &ParamValue) {
        match name {
            "bar_count" => {
                if let Some(n) = value.as_number() {
                    self.bar_count = (n.max(1.0) as usize).min(4096);
                    self.rebuild_geometry();
                }
            }
            "color" => {
                if let Some(argb) = value.as_color() {
                    self.color = Color(argb);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::canvas::{DrawCall, RecordingCanvas};

    #[test]
    fn host_enforces_lifecycle_order() {
        let mut host = PluginHost::new(Box::new(SpectrumBarsPlugin::new()));
        assert_eq!(host.state(), PluginState::Uninitialized);

        // Render before initialize is dropped.
        let features = AudioFeatures::silent(8, 0);
        let mut canvas = RecordingCanvas::new(100.0, 100.0);
        host.render_frame(&features, &mut canvas);
        assert!(canvas.calls.is_empty());
        assert_eq!(host.frames_rendered(), 0);

        host.initialize(100, 100);
        assert_eq!(host.state(), PluginState::Initialized);
        host.render_frame(&features, &mut canvas);
        assert_eq!(host.frames_rendered(), 1);
    }

    #[test]
    fn initialize_runs_exactly_once() {
        let mut host = PluginHost::new(Box::new(SpectrumBarsPlugin::new()));
        host.initialize(100, 100);
        host.initialize(999, 999);
        assert_eq!(host.state(), PluginState::Initialized);
    }

    #[test]
    fn dispose_is_idempotent_and_final() {
        let mut host = PluginHost::new(Box::new(SpectrumBarsPlugin::new()));
        host.initialize(100, 100);
        host.dispose();
        host.dispose();
        assert_eq!(host.state(), PluginState::Disposed);

        let features = AudioFeatures::silent(8, 0);
        let mut canvas = RecordingCanvas::new(100.0, 100.0);
        host.render_frame(&features, &mut canvas);
        assert!(canvas.calls.is_empty());
    }

    #[test]
    fn registry_creates_by_key() {
        let registry = PluginRegistry::with_builtins();
        assert!(registry.contains("bars"));
        assert!(registry.contains("superscope"));
        assert!(registry.create("bars").is_some());
        assert!(registry.create("nope").is_none());
        assert_eq!(registry.names(), vec!["bars", "superscope"]);
    }

    #[test]
    fn bars_draw_scaled_rects() {
        let mut plugin = SpectrumBarsPlugin::new();
        plugin.set_parameter("bar_count", &ParamValue::Number(4.0));
        plugin.initialize(400, 100);

        let mut features = AudioFeatures::silent(4, 0);
        features.spectrum = vec![1.0, 0.5, 0.0, 0.25];
        let mut canvas = RecordingCanvas::new(400.0, 100.0);
        plugin.render_frame(&features, &mut canvas);

        // Clear plus one rect per non-empty bar.
        assert!(matches!(canvas.calls[0], DrawCall::Clear(_)));
        let rects: Vec<_> = canvas
            .calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::FillRect(x, y, w, h, _) => Some((*x, *y, *w, *h)),
                _ => None,
            })
            .collect();
        assert_eq!(rects.len(), 4);
        assert_eq!(rects[0].3, 100.0); // full-scale bin -> full height
        assert_eq!(rects[2].3, 0.0);
    }

    #[test]
    fn resize_rebuilds_bar_geometry() {
        let mut plugin = SpectrumBarsPlugin::new();
        plugin.set_parameter("bar_count", &ParamValue::Number(10.0));
        plugin.initialize(100, 100);
        plugin.resize(1000, 500);

        let mut features = AudioFeatures::silent(10, 0);
        features.spectrum = vec![1.0; 10];
        let mut canvas = RecordingCanvas::new(1000.0, 500.0);
        plugin.render_frame(&features, &mut canvas);
        if let DrawCall::FillRect(_, _, w, h, _) = canvas.calls[1] {
            assert_eq!(w, 100.0);
            assert_eq!(h, 500.0);
        } else {
            panic!("expected FillRect");
        }
    }
}
