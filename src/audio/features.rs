use serde::Serialize;

/// Perceptual band intensities, each normalized to [0, 1].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct BandIntensities {
    pub low: f32,
    pub mid: f32,
    pub high: f32,
    /// Mean over the whole spectrum.
    pub energy: f32,
}

impl BandIntensities {
    pub const ZERO: Self = Self {
        low: 0.0,
        mid: 0.0,
        high: 0.0,
        energy: 0.0,
    };

    pub fn clamped(self) -> Self {
        Self {
            low: clamp01(self.low),
            mid: clamp01(self.mid),
            high: clamp01(self.high),
            energy: clamp01(self.energy),
        }
    }
}

/// One poll's worth of features.
///
/// `spectrum` and `waveform` borrow the session's reused buffers, so a
/// snapshot has to be dropped (or copied) before the next poll.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSnapshot<'a> {
    pub low: f32,
    pub mid: f32,
    pub high: f32,
    pub energy: f32,
    /// Unset until the first accepted beat interval.
    pub bpm: Option<f32>,
    pub bpm_confidence: f32,
    pub clipping: bool,
    pub spectrum: Option<&'a [f32]>,
    pub waveform: Option<&'a [f32]>,
}

impl Default for FeatureSnapshot<'_> {
    /// What renderers get when there is nothing to analyse.
    fn default() -> Self {
        Self {
            low: 0.0,
            mid: 0.0,
            high: 0.0,
            energy: 0.0,
            bpm: None,
            bpm_confidence: 0.0,
            clipping: false,
            spectrum: None,
            waveform: None,
        }
    }
}

impl FeatureSnapshot<'_> {
    pub fn bands(&self) -> BandIntensities {
        BandIntensities {
            low: self.low,
            mid: self.mid,
            high: self.high,
            energy: self.energy,
        }
    }

    /// True for the fallback returned without a connected source.
    pub fn has_data(&self) -> bool {
        self.spectrum.is_some()
    }
}

pub fn clamp01(x: f32) -> f32 {
    if x.is_nan() {
        return 0.0;
    }
    x.clamp(0.0, 1.0)
}
