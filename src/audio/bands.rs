//! Low/mid/high split of the byte spectrum.

use super::features::{clamp01, BandIntensities};

/// Fraction of bins below which a bin counts as low.
pub const LOW_SPLIT: f64 = 0.15;
/// Fraction of bins below which a bin counts as mid.
pub const MID_SPLIT: f64 = 0.55;

/// Bin index ranges `(low_end, mid_end)`; low is `[0, low_end)`, mid is
/// `[low_end, mid_end)`, high is `[mid_end, n)`.
pub fn band_edges(n: usize) -> (usize, usize) {
    let low_end = (n as f64 * LOW_SPLIT).floor() as usize;
    let mid_end = (n as f64 * MID_SPLIT).floor() as usize;
    (low_end.min(n), mid_end.min(n))
}

/// Mean of `v / 255` over each band and over all bins. Empty ranges give 0.
pub fn extract_bands(frequency: &[u8]) -> BandIntensities {
    let n = frequency.len();
    if n == 0 {
        return BandIntensities::ZERO;
    }
    let (low_end, mid_end) = band_edges(n);

    let mean = |bins: &[u8]| -> f32 {
        if bins.is_empty() {
            return 0.0;
        }
        bins.iter().map(|&v| v as f32 / 255.0).sum::<f32>() / bins.len() as f32
    };

    BandIntensities {
        low: clamp01(mean(&frequency[..low_end])),
        mid: clamp01(mean(&frequency[low_end..mid_end])),
        high: clamp01(mean(&frequency[mid_end..])),
        energy: clamp01(mean(frequency)),
    }
}
