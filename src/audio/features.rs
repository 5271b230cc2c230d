/// Per-frame audio feature snapshot handed to every renderer.
///
/// Built once per render tick by the conditioning pipeline, read-only
/// afterwards, and discarded when the frame ends.
#[derive(Clone, Debug, Default)]
pub struct AudioFeatures {
    /// Playback time in seconds.
    pub time_seconds: f64,
    /// Latest instantaneous tempo estimate (0 until two beats have fired).
    pub bpm: f32,
    /// True only on the tick where a beat was detected.
    pub beat: bool,
    /// Mean absolute spectrum bin value.
    pub volume: f32,
    /// RMS of the conditioned waveform.
    pub rms: f32,
    /// Max absolute spectrum bin value.
    pub peak: f32,
    /// Mean squared spectrum bin value.
    pub energy: f32,
    /// Conditioned FFT magnitude bins.
    pub spectrum: Vec<f32>,
    /// Conditioned time-domain samples, clamped to [-1, 1].
    pub waveform: Vec<f32>,
    /// Banded sums over equal contiguous thirds of the spectrum.
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    /// Cross-frame blend factor in [0, 1], forwarded from settings for the
    /// drawing surface to lerp with. The pipeline never blends pixels itself.
    pub frame_blend: f32,
}

impl AudioFeatures {
    /// A silent snapshot with the given bin/sample counts, used when input
    /// arrays are missing or mismatched.
    pub fn silent(spectrum_len: usize, waveform_len: usize) -> Self {
        Self {
            spectrum: vec![0.0; spectrum_len],
            waveform: vec![0.0; waveform_len],
            ..Default::default()
        }
    }
}
