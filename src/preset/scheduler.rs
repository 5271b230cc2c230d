use crate::audio::AudioFeatures;
use crate::settings::{RandomPresetMode, VisualizerSettings};

/// Decides when to auto-advance to another preset. Preset storage and the
/// actual switch belong to the caller; this only answers "now?".
#[derive(Debug, Default)]
pub struct PresetScheduler {
    // f64: accumulating thousands of small f32 dt steps drifts enough to
    // slip interval boundaries.
    elapsed_seconds: f64,
    beats_since_advance: u32,
}

impl PresetScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.elapsed_seconds = 0.0;
        self.beats_since_advance = 0;
    }

    /// Called once per frame. Returns true when the caller should switch
    /// presets; internal counters restart at that point.
    pub fn update(
        &mut self,
        features: &AudioFeatures,
        settings: &VisualizerSettings,
        dt: f32,
    ) -> bool {
        self.elapsed_seconds += f64::from(dt.max(0.0));
        if features.beat {
            self.beats_since_advance += 1;
        }

        let advance = match settings.random_preset_mode {
            RandomPresetMode::Off => false,
            RandomPresetMode::OnBeat => features.beat,
            RandomPresetMode::Interval => {
                self.elapsed_seconds >= f64::from(settings.preset_interval_seconds)
            }
            RandomPresetMode::Stanza => {
                self.beats_since_advance >= settings.stanza_beats.max(1)
            }
        };

        if advance {
            log::debug!(
                "preset advance ({:?}) after {:.1}s / {} beats",
                settings.random_preset_mode,
                self.elapsed_seconds,
                self.beats_since_advance
            );
            self.reset();
        }
        advance
    }
}
