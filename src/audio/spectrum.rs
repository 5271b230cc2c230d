use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// FFT front-end: turns raw mono samples into magnitude bins.
///
/// The plan, window, and scratch buffer are built once and reused every
/// frame; changing the FFT size rebuilds them. Input shorter than the FFT
/// size is zero-padded.
pub struct SpectrumAnalyzer {
    fft_size: usize,
    planner: FftPlanner<f32>,
    fft: Arc<dyn Fft<f32>>,
    hann: Vec<f32>,
    buffer: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    pub fn new(fft_size: usize) -> Self {
        let fft_size = fft_size.max(2);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        Self {
            fft_size,
            planner,
            fft,
            hann: hann_window(fft_size),
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Rebuilds the plan when the configured size changed.
    pub fn set_fft_size(&mut self, fft_size: usize) {
        let fft_size = fft_size.max(2);
        if fft_size == self.fft_size {
            return;
        }
        log::debug!("FFT size {} -> {}", self.fft_size, fft_size);
        self.fft_size = fft_size;
        self.fft = self.planner.plan_fft_forward(fft_size);
        self.hann = hann_window(fft_size);
        self.buffer = vec![Complex::new(0.0, 0.0); fft_size];
    }

    /// Computes `fft_size / 2` magnitude bins from the most recent samples.
    /// Magnitudes are normalized by the FFT size.
    pub fn magnitudes(&mut self, samples: &[f32]) -> Vec<f32> {
        let n = self.fft_size;
        let take = samples.len().min(n);
        // Use the tail of the input so the newest audio dominates the frame.
        let start = samples.len() - take;

        for i in 0..take {
            self.buffer[i] = Complex::new(samples[start + i] * self.hann[i], 0.0);
        }
        for slot in self.buffer[take..n].iter_mut() {
            *slot = Complex::new(0.0, 0.0);
        }

        self.fft.process(&mut self.buffer);

        let norm = 1.0 / n as f32;
        self.buffer[..n / 2].iter().map(|c| c.norm() * norm).collect()
    }
}

fn hann_window(size: usize) -> Vec<f32> {
    if size <= 1 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_yields_zero_bins() {
        let mut analyzer = SpectrumAnalyzer::new(512);
        let bins = analyzer.magnitudes(&vec![0.0; 512]);
        assert_eq!(bins.len(), 256);
        assert!(bins.iter().all(|&b| b == 0.0));
    }

    #[test]
    fn sine_peaks_in_the_matching_bin() {
        let size = 1024;
        let mut analyzer = SpectrumAnalyzer::new(size);
        // Bin 64: exactly 64 cycles across the window.
        let samples: Vec<f32> = (0..size)
            .map(|i| (2.0 * std::f32::consts::PI * 64.0 * i as f32 / size as f32).sin())
            .collect();
        let bins = analyzer.magnitudes(&samples);

        let peak_bin = bins
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak_bin, 64);
    }

    #[test]
    fn short_input_is_zero_padded() {
        let mut analyzer = SpectrumAnalyzer::new(256);
        let bins = analyzer.magnitudes(&[0.5f32; 16]);
        assert_eq!(bins.len(), 128);
    }

    #[test]
    fn resize_rebuilds_plan() {
        let mut analyzer = SpectrumAnalyzer::new(256);
        analyzer.set_fft_size(1024);
        assert_eq!(analyzer.fft_size(), 1024);
        assert_eq!(analyzer.magnitudes(&vec![0.0; 1024]).len(), 512);
    }
}
