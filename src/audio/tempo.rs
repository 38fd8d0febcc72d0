//! Best-effort tempo from rising edges of smoothed energy.
//!
//! An onset fires when energy crosses above a slowly adapting threshold.
//! The gap between consecutive onsets is a tempo candidate if it lies in
//! (200, 1200) ms and the resulting tempo in (60, 180) BPM; accepted
//! candidates feed a one-pole average. Timing comes from caller timestamps,
//! so irregular poll intervals are fine.

use std::collections::VecDeque;

use super::features::clamp01;
use super::smoothing::one_pole;
use crate::config::TempoConfig;

const MIN_INTERVAL_MS: f64 = 200.0;
const MAX_INTERVAL_MS: f64 = 1200.0;
const MIN_BPM: f32 = 60.0;
const MAX_BPM: f32 = 180.0;

/// Accepted tempos kept for the confidence estimate.
const HISTORY: usize = 8;
/// Coefficient of variation at which confidence reaches zero.
const CV_SPAN: f32 = 0.25;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TempoPhase {
    NoOnsetYet,
    TrackingTempo,
}

/// What a single poll did to the estimator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OnsetEvent {
    /// No rising edge this poll.
    None,
    /// Rising edge with no usable interval (first onset, or gap out of range).
    Onset,
    /// Rising edge whose interval produced this instantaneous tempo.
    Accepted(f32),
}

#[derive(Clone, Debug)]
pub struct TempoEstimator {
    initial_threshold: f32,
    adaptation: f32,
    smoothing: f32,

    last_energy: f32,
    last_onset_ms: Option<f64>,
    threshold: f32,
    tempo: Option<f32>,
    recent: VecDeque<f32>,
}

impl TempoEstimator {
    pub fn new(config: &TempoConfig) -> Self {
        Self {
            initial_threshold: config.initial_threshold,
            adaptation: config.threshold_adaptation.clamp(0.0, 1.0),
            smoothing: config.tempo_smoothing.clamp(0.0, 1.0),
            last_energy: 0.0,
            last_onset_ms: None,
            threshold: config.initial_threshold,
            tempo: None,
            recent: VecDeque::with_capacity(HISTORY),
        }
    }

    /// Back to `NoOnsetYet`, as for a freshly connected source.
    pub fn reset(&mut self) {
        self.last_energy = 0.0;
        self.last_onset_ms = None;
        self.threshold = self.initial_threshold;
        self.tempo = None;
        self.recent.clear();
    }

    /// Advances one poll with the smoothed energy observed at `now_ms`.
    pub fn update(&mut self, energy: f32, now_ms: f64) -> OnsetEvent {
        let mut event = OnsetEvent::None;

        if energy > self.threshold && self.last_energy <= self.threshold {
            event = OnsetEvent::Onset;
            if let Some(last) = self.last_onset_ms {
                if let Some(instant) = instant_bpm(now_ms - last) {
                    self.accept(instant);
                    event = OnsetEvent::Accepted(instant);
                } else {
                    log::trace!("Rejected onset interval {:.1}ms", now_ms - last);
                }
            }
            self.last_onset_ms = Some(now_ms);
        }

        self.threshold = self.threshold * (1.0 - self.adaptation) + energy * self.adaptation;
        self.last_energy = energy;
        event
    }

    fn accept(&mut self, instant: f32) {
        let next = match self.tempo {
            None => instant,
            Some(current) => one_pole(current, instant, self.smoothing),
        };
        log::debug!("Beat interval -> {:.1} BPM (smoothed {:.1})", instant, next);
        self.tempo = Some(next);

        if self.recent.len() == HISTORY {
            self.recent.pop_front();
        }
        self.recent.push_back(instant);
    }

    pub fn bpm(&self) -> Option<f32> {
        self.tempo
    }

    /// Stability of recent accepted tempos: 0 with fewer than two, else
    /// `1 - cv / 0.25` clamped, where cv is their coefficient of variation.
    pub fn confidence(&self) -> f32 {
        let n = self.recent.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.recent.iter().sum::<f32>() / n as f32;
        if mean <= 0.0 {
            return 0.0;
        }
        let variance = self.recent.iter().map(|&b| (b - mean).powi(2)).sum::<f32>() / n as f32;
        clamp01(1.0 - (variance.sqrt() / mean) / CV_SPAN)
    }

    pub fn phase(&self) -> TempoPhase {
        if self.tempo.is_some() {
            TempoPhase::TrackingTempo
        } else {
            TempoPhase::NoOnsetYet
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

/// Tempo for an onset gap, if the gap and the tempo are both plausible.
fn instant_bpm(interval_ms: f64) -> Option<f32> {
    if !(interval_ms > MIN_INTERVAL_MS && interval_ms < MAX_INTERVAL_MS) {
        return None;
    }
    let bpm = (60_000.0 / interval_ms) as f32;
    (bpm > MIN_BPM && bpm < MAX_BPM).then_some(bpm)
}
