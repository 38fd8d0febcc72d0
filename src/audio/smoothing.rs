//! One-pole smoothing: `state += (input - state) * alpha`.

use super::features::BandIntensities;

#[inline]
pub fn one_pole(state: f32, input: f32, alpha: f32) -> f32 {
    state + (input - state) * alpha
}

/// Per-channel exponential moving average over band intensities.
///
/// State starts at zero and lives as long as the session; there is no reset.
#[derive(Clone, Debug)]
pub struct BandSmoother {
    alpha: f32,
    state: BandIntensities,
}

impl BandSmoother {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            state: BandIntensities::ZERO,
        }
    }

    pub fn update(&mut self, raw: BandIntensities) -> BandIntensities {
        let a = self.alpha;
        let s = &mut self.state;
        s.low = one_pole(s.low, raw.low, a);
        s.mid = one_pole(s.mid, raw.mid, a);
        s.high = one_pole(s.high, raw.high, a);
        s.energy = one_pole(s.energy, raw.energy, a);
        self.current()
    }

    pub fn current(&self) -> BandIntensities {
        self.state.clamped()
    }
}
