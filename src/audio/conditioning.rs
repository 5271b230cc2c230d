use super::features::AudioFeatures;
use crate::settings::{db_to_linear, SpectrumScale, VisualizerSettings};

const LOG_EPSILON: f32 = 1e-12;

/// Stateful per-frame signal conditioning.
///
/// Stage order is part of the contract; each stage assumes the previous
/// stage's output domain:
///
/// 1. input gain  2. noise gate  3. spectral scale  4. floor/ceiling clamp
/// 5. feature pass  6. AGC  7. beat detection  8. frame blend
///
/// Beat state (`prev_energy`, `last_beat_time`) mutates exactly once per
/// `process` call, no matter how often the returned snapshot is read.
#[derive(Debug)]
pub struct SignalConditioningPipeline {
    prev_energy: f32,
    last_beat_time: Option<f64>,
    bpm: f32,
    peak_hold: f32,
}

impl Default for SignalConditioningPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalConditioningPipeline {
    pub fn new() -> Self {
        Self {
            prev_energy: 0.0,
            last_beat_time: None,
            bpm: 0.0,
            peak_hold: 0.0,
        }
    }

    /// Clears beat/AGC history, e.g. when playback seeks.
    pub fn reset(&mut self) {
        self.prev_energy = 0.0;
        self.last_beat_time = None;
        self.bpm = 0.0;
        self.peak_hold = 0.0;
    }

    /// Display peak with the configured falloff applied across frames.
    pub fn held_peak(&self) -> f32 {
        self.peak_hold
    }

    /// Runs the full stage chain over one frame of raw spectrum/waveform
    /// data and returns the immutable feature snapshot.
    pub fn process(
        &mut self,
        spectrum: &[f32],
        waveform: &[f32],
        time_seconds: f64,
        dt: f32,
        settings: &VisualizerSettings,
    ) -> AudioFeatures {
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 1.0 / 60.0 };

        let mut spectrum: Vec<f32> = spectrum
            .iter()
            .map(|s| if s.is_finite() { *s } else { 0.0 })
            .collect();
        let mut waveform: Vec<f32> = waveform
            .iter()
            .map(|s| if s.is_finite() { *s } else { 0.0 })
            .collect();

        // 1. Input gain. Waveform is clamped to [-1, 1]; spectrum is not.
        let gain = db_to_linear(settings.gain_db);
        for bin in spectrum.iter_mut() {
            *bin *= gain;
        }
        for sample in waveform.iter_mut() {
            *sample = (*sample * gain).clamp(-1.0, 1.0);
        }

        // 2. Noise gate.
        let gate = db_to_linear(settings.noise_gate_db);
        for bin in spectrum.iter_mut() {
            if bin.abs() < gate {
                *bin = 0.0;
            }
        }

        // 3. Spectral scale.
        match settings.spectrum_scale {
            SpectrumScale::Linear => {}
            SpectrumScale::Sqrt => {
                for bin in spectrum.iter_mut() {
                    *bin = bin.max(0.0).sqrt();
                }
            }
            SpectrumScale::Log => {
                for bin in spectrum.iter_mut() {
                    *bin = (*bin + LOG_EPSILON).log10() * 0.5 + 1.0;
                }
            }
        }

        // 4. Floor/ceiling clamp. Gated (zero) bins stay silent; raising
        // them to the floor would report volume on dead air.
        let floor = db_to_linear(settings.floor_db);
        let ceiling = db_to_linear(settings.ceiling_db);
        for bin in spectrum.iter_mut() {
            if *bin != 0.0 {
                *bin = bin.clamp(floor, ceiling);
            }
        }

        // 5. Feature pass.
        let n = spectrum.len();
        let (mut volume, mut energy, peak) = if n == 0 {
            (0.0, 0.0, 0.0)
        } else {
            let volume = spectrum.iter().map(|b| b.abs()).sum::<f32>() / n as f32;
            let energy = spectrum.iter().map(|b| b * b).sum::<f32>() / n as f32;
            let peak = spectrum.iter().fold(0.0f32, |acc, b| acc.max(b.abs()));
            (volume, energy, peak)
        };
        let mut rms = if waveform.is_empty() {
            0.0
        } else {
            (waveform.iter().map(|s| s * s).sum::<f32>() / waveform.len() as f32).sqrt()
        };

        let third = n / 3;
        let (mut bass, mut mid, mut treble) = (0.0f32, 0.0f32, 0.0f32);
        if third > 0 {
            bass = spectrum[..third].iter().sum();
            mid = spectrum[third..2 * third].iter().sum();
            treble = spectrum[2 * third..].iter().sum();
        }

        // 6. AGC: bounded correction toward the target RMS, never a full
        // renormalization, so it cannot oscillate.
        if settings.agc_enabled {
            let err = settings.agc_target_rms - rms;
            let agc = (1.0 + err * 0.5).clamp(0.85, 1.15);
            for bin in spectrum.iter_mut() {
                *bin *= agc;
            }
            for sample in waveform.iter_mut() {
                *sample = (*sample * agc).clamp(-1.0, 1.0);
            }
            volume *= agc;
            rms *= agc;
            energy *= agc * agc;
            bass *= agc;
            mid *= agc;
            treble *= agc;
        }

        // 7. Beat detection.
        let beat = self.detect_beat(energy, time_seconds, dt, settings);

        self.peak_hold = peak.max(self.peak_hold * settings.peak_falloff);

        AudioFeatures {
            time_seconds,
            bpm: self.bpm,
            beat,
            volume,
            rms,
            peak,
            energy,
            spectrum,
            waveform,
            bass,
            mid,
            treble,
            // 8. Frame blend factor is computed here and forwarded; pixel
            // blending belongs to the drawing surface.
            frame_blend: settings.frame_blend.clamp(0.0, 1.0),
        }
    }

    fn detect_beat(
        &mut self,
        energy: f32,
        time_seconds: f64,
        dt: f32,
        settings: &VisualizerSettings,
    ) -> bool {
        let threshold = settings.beat_sensitivity.max(1.05);
        let cooldown = settings.beat_cooldown_ms as f64 / 1000.0;

        let cooled_down = self
            .last_beat_time
            .map(|last| time_seconds - last >= cooldown)
            .unwrap_or(true);

        let fired = energy > self.prev_energy * threshold && energy > 0.0 && cooled_down;

        if fired {
            if let Some(last) = self.last_beat_time {
                let interval = time_seconds - last;
                if interval > 0.0 {
                    self.bpm = (60.0 / interval) as f32;
                }
            }
            self.last_beat_time = Some(time_seconds);
        }

        // Smoothed energy history updates every frame, beat or not.
        let tau = settings.smoothing_ms / 1000.0;
        let alpha = (dt / (tau + dt)).clamp(0.01, 1.0);
        self.prev_energy += alpha * (energy - self.prev_energy);

        fired
    }
}
