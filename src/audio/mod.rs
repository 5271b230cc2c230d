pub mod conditioning;
pub mod features;
pub mod spectrum;

pub use conditioning::SignalConditioningPipeline;
pub use features::AudioFeatures;
pub use spectrum::SpectrumAnalyzer;
