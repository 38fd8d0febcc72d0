//! Max-pooled display spectrum.

use super::features::clamp01;

/// Fills `out` with the peak of `v / 255` over each band's bins.
///
/// Band `b` covers `[floor(b * w), floor((b + 1) * w))` with `w = n / out.len()`,
/// so widths differ by at most one bin. Bands with no bins (only when the
/// input is shorter than `out`) are 0.
pub fn reduce_spectrum(frequency: &[u8], out: &mut [f32]) {
    let n = frequency.len();
    let bands = out.len();
    if bands == 0 {
        return;
    }
    let bins_per_band = n as f64 / bands as f64;

    for (b, slot) in out.iter_mut().enumerate() {
        let start = ((b as f64 * bins_per_band).floor() as usize).min(n);
        let end = (((b + 1) as f64 * bins_per_band).floor() as usize).min(n);
        let peak = frequency[start..end.max(start)].iter().copied().max().unwrap_or(0);
        *slot = clamp01(peak as f32 / 255.0);
    }
}
