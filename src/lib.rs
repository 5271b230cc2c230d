//! sonoscope - expression-driven audio visualization core.
//!
//! The embedding application owns the window, the audio device, and the
//! frame timer; this crate owns everything between raw samples and canvas
//! draw calls: the signal conditioning pipeline, the per-frame feature
//! snapshot, the NS-EEL style expression evaluator behind script presets,
//! the plugin render contract, and preset scheduling.

pub mod audio;
pub mod engine;
pub mod eval;
pub mod params;
pub mod preset;
pub mod render;
pub mod settings;

pub use audio::{AudioFeatures, SignalConditioningPipeline, SpectrumAnalyzer};
pub use engine::{TickResult, VisualizerEngine};
pub use eval::{CompiledExpression, EvaluationStats, Evaluator};
pub use params::{ParamBag, ParamValue};
pub use preset::{load_preset, Preset, PresetError, PresetScheduler};
pub use render::{
    Canvas, Color, PluginHost, PluginRegistry, PluginState, SpectrumBarsPlugin,
    SuperscopePlugin, VisualizerPlugin,
};
pub use settings::{
    db_to_linear, load_settings, save_settings, RandomPresetMode, SettingsWatcher,
    SpectrumScale, VisualizerSettings,
};
