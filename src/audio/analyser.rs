//! Browser-style analyser node: Blackman-windowed FFT over the latest window,
//! temporal smoothing of magnitudes, and byte/float read-outs scaled between
//! `min_decibels` and `max_decibels`.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use super::graph::MediaElement;
use crate::config::AnalyserConfig;
use crate::error::{AudioGraphError, GraphResult};

const MIN_FFT_SIZE: usize = 32;
const MAX_FFT_SIZE: usize = 32768;
const BLACKMAN_ALPHA: f32 = 0.16;

pub struct AnalyserNode {
    fft_size: usize,
    min_decibels: f32,
    max_decibels: f32,
    smoothing_time_constant: f32,
    sample_rate: u32,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    input: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
}

impl AnalyserNode {
    pub fn validate(config: &AnalyserConfig) -> GraphResult<()> {
        let size = config.fft_size;
        if !size.is_power_of_two() || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&size) {
            return Err(AudioGraphError::InvalidFftSize(size));
        }
        if !(config.min_decibels < config.max_decibels) {
            return Err(AudioGraphError::InvalidDecibelRange {
                min: config.min_decibels,
                max: config.max_decibels,
            });
        }
        if !(0.0..=1.0).contains(&config.smoothing_time_constant) {
            return Err(AudioGraphError::InvalidSmoothing(config.smoothing_time_constant));
        }
        Ok(())
    }

    pub fn new(config: &AnalyserConfig) -> GraphResult<Self> {
        Self::validate(config)?;
        let n = config.fft_size;
        let fft = FftPlanner::<f32>::new().plan_fft_forward(n);

        Ok(Self {
            fft_size: n,
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
            smoothing_time_constant: config.smoothing_time_constant,
            sample_rate: 44_100,
            fft,
            window: blackman_window(n),
            input: vec![0.0; n],
            scratch: vec![Complex::new(0.0, 0.0); n],
            magnitudes: vec![0.0; n / 2],
        })
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn min_decibels(&self) -> f32 {
        self.min_decibels
    }

    pub fn max_decibels(&self) -> f32 {
        self.max_decibels
    }

    pub fn smoothing_time_constant(&self) -> f32 {
        self.smoothing_time_constant
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub(crate) fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
    }

    /// Centre frequency of `bin` in Hz.
    pub fn bin_frequency(&self, bin: usize) -> f32 {
        bin as f32 * self.sample_rate as f32 / self.fft_size as f32
    }

    /// Pulls the window ending at the element's playhead (silence when
    /// `element` is `None` or paused) and runs one analysis step.
    pub(crate) fn render(&mut self, element: Option<&MediaElement>) {
        match element {
            Some(element) => {
                element.read_window(&mut self.input);
            }
            None => self.input.fill(0.0),
        }
        self.analyse();
    }

    /// Runs one analysis step over `samples`, right-aligned in the window.
    pub fn process(&mut self, samples: &[f32]) {
        let n = self.fft_size;
        let take = samples.len().min(n);
        let pad = n - take;
        self.input[..pad].fill(0.0);
        self.input[pad..].copy_from_slice(&samples[samples.len() - take..]);
        self.analyse();
    }

    fn analyse(&mut self) {
        for ((slot, &sample), &w) in self.scratch.iter_mut().zip(&self.input).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.scratch);

        let scale = 1.0 / self.fft_size as f32;
        let tau = self.smoothing_time_constant;
        for (mag, bin) in self.magnitudes.iter_mut().zip(&self.scratch) {
            let next = tau * *mag + (1.0 - tau) * bin.norm() * scale;
            *mag = if next.is_finite() { next } else { 0.0 };
        }
    }

    /// Smoothed magnitudes scaled into bytes. Writes at most `bin_count` values.
    pub fn byte_frequency_data(&self, out: &mut [u8]) {
        let range = self.max_decibels - self.min_decibels;
        for (dst, &mag) in out.iter_mut().zip(&self.magnitudes) {
            let scaled = (255.0 / range) * (to_decibels(mag) - self.min_decibels);
            *dst = scaled.floor().clamp(0.0, 255.0) as u8;
        }
    }

    /// Smoothed magnitudes in dB (negative infinity for silent bins).
    pub fn float_frequency_data(&self, out: &mut [f32]) {
        for (dst, &mag) in out.iter_mut().zip(&self.magnitudes) {
            *dst = to_decibels(mag);
        }
    }

    pub fn byte_time_domain_data(&self, out: &mut [u8]) {
        for (dst, &sample) in out.iter_mut().zip(&self.input) {
            *dst = (128.0 * (1.0 + sample)).floor().clamp(0.0, 255.0) as u8;
        }
    }

    pub fn float_time_domain_data(&self, out: &mut [f32]) {
        let n = out.len().min(self.input.len());
        out[..n].copy_from_slice(&self.input[..n]);
    }
}

fn to_decibels(magnitude: f32) -> f32 {
    20.0 * magnitude.log10()
}

fn blackman_window(size: usize) -> Vec<f32> {
    let a0 = (1.0 - BLACKMAN_ALPHA) / 2.0;
    let a1 = 0.5;
    let a2 = BLACKMAN_ALPHA / 2.0;
    (0..size)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / size as f32;
            a0 - a1 * phase.cos() + a2 * (2.0 * phase).cos()
        })
        .collect()
}
