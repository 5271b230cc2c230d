pub mod canvas;
pub mod plugin;
pub mod superscope;

pub use canvas::{Canvas, Color, DrawCall, RecordingCanvas};
pub use plugin::{PluginHost, PluginRegistry, PluginState, SpectrumBarsPlugin, VisualizerPlugin};
pub use superscope::SuperscopePlugin;
